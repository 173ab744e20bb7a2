// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! The contract between hyperdat and the external storage engine.
//!
//! hyperdat never looks at blocks, trees or signatures itself. An engine
//! hands back a [`Replica`] for a key; everything the client does to an
//! archive goes through that handle. Data can arrive out of band while the
//! swarm replicates, so every read is asynchronous and may suspend until the
//! engine has the bytes.

use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::key::{ArchiveKey, DiscoveryKey};
use crate::path::ArchivePath;
use crate::stat::{HistoryRecord, Stat};

/// Lazy sequence of content chunks. Not restartable.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Lazy sequence of version changes, live for as long as the replica is.
pub type HistoryStream = BoxStream<'static, HistoryRecord>;

/// Byte range of a streaming read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStreamOptions {
    /// Offset of the first byte to return.
    pub start: u64,
    /// Maximum number of bytes to return (`None` = to the end).
    pub length: Option<u64>,
}

impl ReadStreamOptions {
    pub fn range(start: u64, length: u64) -> Self {
        Self {
            start,
            length: Some(length),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Binary,
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Bytes(Bytes),
    Text(String),
}

impl FileContent {
    pub fn into_bytes(self) -> Bytes {
        match self {
            FileContent::Bytes(bytes) => bytes,
            FileContent::Text(text) => Bytes::from(text),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(text) => Some(text),
            FileContent::Bytes(_) => None,
        }
    }
}

/// Opens replicas. One engine may serve many archives.
pub trait StorageEngine: Send + Sync + 'static {
    type Replica: Replica;

    /// Open (creating if absent) the replica for `key`. Resolves once the
    /// engine reports the replica ready.
    fn open(
        &self,
        key: &ArchiveKey,
        config: &StorageConfig,
    ) -> impl Future<Output = Result<Self::Replica, StoreError>> + Send;
}

/// A ready replica handle.
///
/// Mutating operations have default implementations returning
/// [`StoreError::Unsupported`], so read-only engines only implement the
/// query side.
pub trait Replica: Send + Sync + 'static {
    fn key(&self) -> ArchiveKey;

    fn discovery_key(&self) -> DiscoveryKey {
        self.key().discovery_key()
    }

    /// Current revision counter.
    fn version(&self) -> u64;

    /// Whether this replica holds the secret key and can be written to.
    fn writable(&self) -> bool {
        false
    }

    /// Metadata for `path`, from the currently known metadata.
    fn stat(&self, path: &ArchivePath) -> impl Future<Output = Result<Stat, StoreError>> + Send;

    /// Names of the direct children of `path`, in engine order.
    fn readdir(
        &self,
        path: &ArchivePath,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Stream the content of a file. The stream may suspend until peers
    /// supply missing blocks; there is no internal timeout.
    fn read_stream(
        &self,
        path: &ArchivePath,
        options: ReadStreamOptions,
    ) -> impl Future<Output = Result<ByteStream, StoreError>> + Send;

    /// Replay the change log, then follow it live.
    fn history(&self) -> HistoryStream;

    /// Release file handles. Calling it twice is the caller's bug.
    fn close(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn write_file(
        &self,
        _path: &ArchivePath,
        _content: Bytes,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Err(StoreError::Unsupported("write_file")) }
    }

    fn mkdir(&self, _path: &ArchivePath) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Err(StoreError::Unsupported("mkdir")) }
    }

    fn remove(&self, _path: &ArchivePath) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Err(StoreError::Unsupported("remove")) }
    }
}
