// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Storage configuration handed to the engine when a replica is opened.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::key::DiscoveryKey;

/// Name of the metadata directory kept next to on-disk replicas.
pub const METADATA_DIR_NAME: &str = ".dat";

/// Where the replica lives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StorageMode {
    /// Ephemeral; nothing touches the disk.
    #[default]
    Memory,
    /// Engine-managed layout under `dir`, with separate metadata and secret
    /// directories.
    Managed { dir: PathBuf },
    /// Raw file-backed storage. Metadata goes to `metadata_dir`, or to
    /// `<dir>/.dat` when unset.
    Raw {
        dir: PathBuf,
        #[serde(default)]
        metadata_dir: Option<PathBuf>,
    },
}

/// Where cryptographic secrets for writable archives are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretDir {
    /// Under the per-user application data directory.
    #[default]
    Conventional,
    /// Inside the replica's own metadata directory.
    Alongside,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Fetch content blocks on demand instead of eagerly.
    pub sparse: bool,
    /// Fetch metadata blocks on demand instead of eagerly.
    pub sparse_metadata: bool,
    /// Entry limit for the metadata block cache (`None` = engine default).
    pub metadata_cache_size: Option<usize>,
    /// Entry limit for the content block cache (`None` = engine default).
    pub content_cache_size: Option<usize>,
    /// Entry limit for the directory tree cache (`None` = engine default).
    pub tree_cache_size: Option<usize>,
    /// Track the latest known version instead of a pinned checkout.
    pub latest: bool,
    pub secret_dir: SecretDir,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Memory,
            sparse: false,
            sparse_metadata: false,
            metadata_cache_size: None,
            content_cache_size: None,
            tree_cache_size: None,
            latest: true,
            secret_dir: SecretDir::Conventional,
        }
    }
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn managed(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Managed { dir: dir.into() },
            ..Self::default()
        }
    }

    pub fn raw(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Raw {
                dir: dir.into(),
                metadata_dir: None,
            },
            ..Self::default()
        }
    }

    /// Whether the replica survives the process (anything but memory mode).
    pub fn is_persistent(&self) -> bool {
        !matches!(self.mode, StorageMode::Memory)
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.mode, StorageMode::Managed { .. })
    }

    /// Directory the archive's files are materialised into, if any.
    pub fn dir(&self) -> Option<PathBuf> {
        match &self.mode {
            StorageMode::Memory => None,
            StorageMode::Managed { dir } | StorageMode::Raw { dir, .. } => Some(normalise(dir)),
        }
    }

    /// Directory holding the replica's metadata, if it is on disk.
    pub fn metadata_dir(&self) -> Option<PathBuf> {
        match &self.mode {
            StorageMode::Memory => None,
            StorageMode::Managed { dir } => Some(normalise(dir).join(METADATA_DIR_NAME)),
            StorageMode::Raw {
                metadata_dir: Some(metadata_dir),
                ..
            } => Some(normalise(metadata_dir)),
            StorageMode::Raw { dir, .. } => Some(normalise(dir).join(METADATA_DIR_NAME)),
        }
    }

    /// Directory holding secret keys for the archive with `discovery_key`.
    ///
    /// `None` for memory mode, or when no per-user data directory exists.
    pub fn secret_keys_dir(&self, discovery_key: &DiscoveryKey) -> Option<PathBuf> {
        if !self.is_persistent() {
            return None;
        }
        match self.secret_dir {
            SecretDir::Conventional => dirs::data_dir().map(|data| {
                data.join("hyperdat")
                    .join("secret_keys")
                    .join(discovery_key.to_string())
            }),
            SecretDir::Alongside => self.metadata_dir().map(|m| m.join("secret_keys")),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        match &self.mode {
            StorageMode::Memory => {}
            StorageMode::Managed { dir } | StorageMode::Raw { dir, .. }
                if dir.as_os_str().is_empty() =>
            {
                return Err(StoreError::Config(
                    "storage directory must not be empty".to_string(),
                ));
            }
            StorageMode::Raw {
                metadata_dir: Some(metadata_dir),
                ..
            } if metadata_dir.as_os_str().is_empty() => {
                return Err(StoreError::Config(
                    "metadata directory must not be empty".to_string(),
                ));
            }
            StorageMode::Managed { .. } | StorageMode::Raw { .. } => {}
        }
        for (name, limit) in [
            ("metadata_cache_size", self.metadata_cache_size),
            ("content_cache_size", self.content_cache_size),
            ("tree_cache_size", self.tree_cache_size),
        ] {
            if limit == Some(0) {
                return Err(StoreError::Config(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Drop trailing separators and `.` segments so joins behave the same for
/// `dir` and `dir/`.
fn normalise(path: &Path) -> PathBuf {
    path.components().collect()
}
