// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Facade over an engine-provided [`Replica`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt as _;
use tracing::{debug, trace};

use crate::config::StorageConfig;
use crate::engine::{
    ByteStream, Encoding, FileContent, HistoryStream, ReadStreamOptions, Replica, StorageEngine,
};
use crate::error::{IoContext as _, StoreError};
use crate::key::{ArchiveKey, DiscoveryKey};
use crate::path::ArchivePath;
use crate::stat::Stat;

/// The local replica of one archive.
///
/// Owns the engine handle and refuses further use once closed.
pub struct ReplicaStore<R> {
    replica: R,
    config: StorageConfig,
    closed: AtomicBool,
}

impl<R: Replica> ReplicaStore<R> {
    /// Create the on-disk layout if needed, then open the replica through
    /// `engine` and wait for it to become ready.
    pub async fn open<E>(
        engine: &E,
        key: &ArchiveKey,
        config: &StorageConfig,
    ) -> Result<Self, StoreError>
    where
        E: StorageEngine<Replica = R>,
    {
        config.validate()?;
        prepare_layout(key, config).await?;
        let replica = engine.open(key, config).await?;
        debug!(
            key = %key,
            version = replica.version(),
            persistent = config.is_persistent(),
            "replica ready"
        );
        Ok(Self::from_replica(replica, config.clone()))
    }

    pub fn from_replica(replica: R, config: StorageConfig) -> Self {
        Self {
            replica,
            config,
            closed: AtomicBool::new(false),
        }
    }

    pub fn replica(&self) -> &R {
        &self.replica
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn key(&self) -> ArchiveKey {
        self.replica.key()
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.replica.discovery_key()
    }

    pub fn version(&self) -> u64 {
        self.replica.version()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    pub async fn stat(&self, path: &ArchivePath) -> Result<Stat, StoreError> {
        self.ensure_open()?;
        self.replica.stat(path).await
    }

    pub async fn readdir(&self, path: &ArchivePath) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        self.replica.readdir(path).await
    }

    pub async fn read_stream(
        &self,
        path: &ArchivePath,
        options: ReadStreamOptions,
    ) -> Result<ByteStream, StoreError> {
        self.ensure_open()?;
        trace!(path = %path, start = options.start, length = ?options.length, "opening read stream");
        self.replica.read_stream(path, options).await
    }

    /// Read a whole file, decoding it as UTF-8 when asked to.
    pub async fn read_file(
        &self,
        path: &ArchivePath,
        encoding: Encoding,
    ) -> Result<FileContent, StoreError> {
        let mut stream = self.read_stream(path, ReadStreamOptions::default()).await?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        let bytes = buf.freeze();
        match encoding {
            Encoding::Binary => Ok(FileContent::Bytes(bytes)),
            Encoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map(FileContent::Text)
                .map_err(|_| StoreError::InvalidUtf8(path.clone())),
        }
    }

    pub fn history(&self) -> Result<HistoryStream, StoreError> {
        self.ensure_open()?;
        Ok(self.replica.history())
    }

    pub async fn write_file(&self, path: &ArchivePath, content: Bytes) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.replica.write_file(path, content).await
    }

    pub async fn mkdir(&self, path: &ArchivePath) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.replica.mkdir(path).await
    }

    pub async fn remove(&self, path: &ArchivePath) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.replica.remove(path).await
    }

    /// Close the replica. A second call fails with
    /// [`StoreError::AlreadyClosed`].
    pub async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::AlreadyClosed);
        }
        self.replica.close().await?;
        debug!(key = %self.key(), "replica closed");
        Ok(())
    }
}

async fn prepare_layout(key: &ArchiveKey, config: &StorageConfig) -> Result<(), StoreError> {
    let dirs = [
        config.dir(),
        config.metadata_dir(),
        config.secret_keys_dir(&key.discovery_key()),
    ];
    for dir in dirs.iter().flatten() {
        create_dir(dir).await?;
    }
    Ok(())
}

async fn create_dir(dir: &Path) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .io_context(|| format!("Failed to create directory {}", dir.display()))
}
