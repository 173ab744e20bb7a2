// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Recursive directory tree enumeration.

use std::collections::BTreeMap;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use hyperdat_store_core::{ArchivePath, EntryKind, Replica, ReplicaStore, Stat, StoreError};
use tracing::trace;

use crate::fanout;

/// Entries of one directory, keyed by name.
pub type FileTree = BTreeMap<String, FileTreeNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeNode {
    pub path: ArchivePath,
    pub kind: EntryKind,
    pub stat: Stat,
    /// Fully resolved children; `Some` exactly for directories.
    pub children: Option<FileTree>,
}

impl FileTreeNode {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Number of files at or below this node.
    pub fn file_count(&self) -> usize {
        match &self.children {
            Some(children) => children.values().map(FileTreeNode::file_count).sum(),
            None => usize::from(self.kind == EntryKind::File),
        }
    }
}

/// Whether a directory listing entry names the directory itself or its
/// parent.
pub(crate) fn is_self_or_parent(name: &str) -> bool {
    name == "." || name == ".."
}

/// Enumerate everything below `root`.
///
/// Siblings are stat'ed and descended into concurrently. The result is
/// returned only once every level is complete; any failure fails the whole
/// enumeration.
pub fn enumerate<'a, R: Replica>(
    store: &'a ReplicaStore<R>,
    root: &'a ArchivePath,
) -> BoxFuture<'a, Result<FileTree, StoreError>> {
    async move {
        let names = store.readdir(root).await?;
        trace!(path = %root, entries = names.len(), "enumerating directory");
        let entries = fanout::join_all(
            names
                .into_iter()
                .filter(|name| !is_self_or_parent(name))
                .map(|name| resolve_entry(store, root.join(&name), name)),
        )
        .await?;
        Ok(entries.into_iter().collect())
    }
    .boxed()
}

async fn resolve_entry<R: Replica>(
    store: &ReplicaStore<R>,
    path: ArchivePath,
    name: String,
) -> Result<(String, FileTreeNode), StoreError> {
    let stat = store.stat(&path).await?;
    let children = match stat.kind {
        EntryKind::Directory => Some(enumerate(store, &path).await?),
        EntryKind::File | EntryKind::Unknown => None,
    };
    let node = FileTreeNode {
        kind: stat.kind,
        path,
        stat,
        children,
    };
    Ok((name, node))
}
