// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use hyperdat_store_core::{ArchivePath, Encoding, Replica, ReplicaStore};
use tracing::debug;

/// Free-form archive metadata from the archive's metadata document.
pub type ArchiveInfo = BTreeMap<String, serde_json::Value>;

/// Best-effort read of the metadata document at the archive root.
///
/// Returns `None` when the document is absent, unreadable or not a JSON
/// object. Never fails.
pub async fn probe_archive_info<R: Replica>(
    store: &ReplicaStore<R>,
    metadata_file: &str,
) -> Option<ArchiveInfo> {
    let path = ArchivePath::new(metadata_file);
    let content = match store.read_file(&path, Encoding::Binary).await {
        Ok(content) => content.into_bytes(),
        Err(e) => {
            debug!(path = %path, error = %e, "archive metadata unavailable");
            return None;
        }
    };
    match serde_json::from_slice::<ArchiveInfo>(&content) {
        Ok(info) => Some(info),
        Err(e) => {
            debug!(path = %path, error = %e, "archive metadata is not a JSON object");
            None
        }
    }
}
