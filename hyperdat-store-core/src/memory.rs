// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! In-process reference storage engine.
//!
//! Backs memory-mode replicas and stands in for the real engine in tests.
//! Archives are shared per key across every handle the engine opens, so a
//! test can seed content through [`MemoryEngine::archive`] and observe it
//! from a client. Content can be withheld to imitate blocks that no peer
//! has supplied yet, and streams can be made to fail mid-transfer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Notify, broadcast, watch};
use tracing::{trace, warn};

use crate::config::StorageConfig;
use crate::engine::{ByteStream, HistoryStream, ReadStreamOptions, Replica, StorageEngine};
use crate::error::StoreError;
use crate::key::ArchiveKey;
use crate::path::ArchivePath;
use crate::stat::{EntryKind, HistoryKind, HistoryRecord, Stat};

/// Size of the chunks read streams are split into.
pub const CHUNK_SIZE: usize = 64 * 1024;

const HISTORY_CAPACITY: usize = 1024;

#[derive(Clone, Default)]
pub struct MemoryEngine {
    archives: Arc<Mutex<HashMap<ArchiveKey, Arc<ArchiveData>>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self, key: ArchiveKey) -> Arc<ArchiveData> {
        let mut archives = self
            .archives
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            archives
                .entry(key)
                .or_insert_with(|| Arc::new(ArchiveData::new(key))),
        )
    }

    /// A handle on the archive for `key`, creating it if needed. Used to
    /// seed content before a client opens it.
    pub fn archive(&self, key: ArchiveKey) -> MemoryReplica {
        MemoryReplica::new(self.data(key))
    }
}

impl StorageEngine for MemoryEngine {
    type Replica = MemoryReplica;

    async fn open(
        &self,
        key: &ArchiveKey,
        config: &StorageConfig,
    ) -> Result<MemoryReplica, StoreError> {
        trace!(key = %key, sparse = config.sparse, "opening memory replica");
        Ok(self.archive(*key))
    }
}

enum Node {
    File(Bytes),
    Directory,
}

struct Entry {
    node: Node,
    mtime: SystemTime,
    version: u64,
}

#[derive(Default)]
struct ArchiveState {
    entries: BTreeMap<ArchivePath, Entry>,
    version: u64,
    log: Vec<HistoryRecord>,
    withheld: HashSet<ArchivePath>,
    failing: HashSet<ArchivePath>,
}

impl ArchiveState {
    fn kind_of(&self, path: &ArchivePath) -> Option<EntryKind> {
        if path.is_root() {
            return Some(EntryKind::Directory);
        }
        self.entries.get(path).map(|entry| match entry.node {
            Node::File(_) => EntryKind::File,
            Node::Directory => EntryKind::Directory,
        })
    }

    /// Create missing ancestors of `path`, failing if one of them is a file.
    fn ensure_parents(&mut self, path: &ArchivePath, now: SystemTime) -> Result<(), StoreError> {
        let mut ancestors = Vec::new();
        let mut current = path.parent();
        while let Some(parent) = current {
            if parent.is_root() {
                break;
            }
            current = parent.parent();
            ancestors.push(parent);
        }
        for ancestor in ancestors.into_iter().rev() {
            match self.kind_of(&ancestor) {
                Some(EntryKind::File) => return Err(StoreError::NotADirectory(ancestor)),
                Some(_) => {}
                None => {
                    let version = self.version;
                    self.entries.insert(
                        ancestor,
                        Entry {
                            node: Node::Directory,
                            mtime: now,
                            version,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, kind: HistoryKind, path: ArchivePath) -> HistoryRecord {
        self.version += 1;
        let record = HistoryRecord {
            version: self.version,
            kind,
            path,
        };
        self.log.push(record.clone());
        record
    }
}

struct ArchiveData {
    key: ArchiveKey,
    state: Mutex<ArchiveState>,
    released: Notify,
    history: broadcast::Sender<HistoryRecord>,
}

impl ArchiveData {
    fn new(key: ArchiveKey) -> Self {
        let (history, _) = broadcast::channel(HISTORY_CAPACITY);
        Self {
            key,
            state: Mutex::new(ArchiveState::default()),
            released: Notify::new(),
            history,
        }
    }

    fn state(&self) -> MutexGuard<'_, ArchiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, record: HistoryRecord) -> u64 {
        let version = record.version;
        // No subscribers is fine; the log keeps the record for replay.
        let _ = self.history.send(record);
        version
    }
}

/// Handle on one archive of a [`MemoryEngine`].
///
/// Handles for the same key share content; closing one handle only ends
/// that handle's reads and history streams.
pub struct MemoryReplica {
    data: Arc<ArchiveData>,
    closed: watch::Sender<bool>,
}

impl MemoryReplica {
    fn new(data: Arc<ArchiveData>) -> Self {
        let (closed, _) = watch::channel(false);
        Self { data, closed }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if *self.closed.borrow() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Write a file, creating missing parent directories. Returns the new
    /// archive version.
    pub fn put(
        &self,
        path: impl Into<ArchivePath>,
        content: impl Into<Bytes>,
    ) -> Result<u64, StoreError> {
        let path = path.into();
        let now = SystemTime::now();
        let record = {
            let mut state = self.data.state();
            if state.kind_of(&path) == Some(EntryKind::Directory) {
                return Err(StoreError::IsADirectory(path));
            }
            state.ensure_parents(&path, now)?;
            let record = state.record(HistoryKind::Put, path.clone());
            state.entries.insert(
                path,
                Entry {
                    node: Node::File(content.into()),
                    mtime: now,
                    version: record.version,
                },
            );
            record
        };
        Ok(self.data.publish(record))
    }

    /// Create a directory and any missing parents. Existing directories are
    /// left alone.
    pub fn make_dir(&self, path: impl Into<ArchivePath>) -> Result<u64, StoreError> {
        let path = path.into();
        let now = SystemTime::now();
        let record = {
            let mut state = self.data.state();
            match state.kind_of(&path) {
                Some(EntryKind::Directory) => return Ok(state.version),
                Some(_) => return Err(StoreError::NotADirectory(path)),
                None => {}
            }
            state.ensure_parents(&path, now)?;
            let record = state.record(HistoryKind::Mkdir, path.clone());
            state.entries.insert(
                path,
                Entry {
                    node: Node::Directory,
                    mtime: now,
                    version: record.version,
                },
            );
            record
        };
        Ok(self.data.publish(record))
    }

    /// Delete a file or an empty directory.
    pub fn delete(&self, path: impl Into<ArchivePath>) -> Result<u64, StoreError> {
        let path = path.into();
        if path.is_root() {
            return Err(StoreError::RootNotRemovable);
        }
        let record = {
            let mut state = self.data.state();
            match state.kind_of(&path) {
                None => return Err(StoreError::NotFound(path)),
                Some(EntryKind::Directory) => {
                    let has_children = state
                        .entries
                        .keys()
                        .any(|p| p.parent().as_ref() == Some(&path));
                    if has_children {
                        return Err(StoreError::io(
                            format!("Failed to delete {path}"),
                            io::Error::new(io::ErrorKind::DirectoryNotEmpty, "directory not empty"),
                        ));
                    }
                }
                Some(_) => {}
            }
            state.entries.remove(&path);
            state.record(HistoryKind::Del, path)
        };
        Ok(self.data.publish(record))
    }

    /// Make reads of `path` suspend until [`release`](Self::release) is
    /// called, as if no peer had supplied its content yet.
    pub fn withhold(&self, path: impl Into<ArchivePath>) {
        self.data.state().withheld.insert(path.into());
    }

    pub fn release(&self, path: impl Into<ArchivePath>) {
        self.data.state().withheld.remove(&path.into());
        self.data.released.notify_waiters();
    }

    /// Make every read stream of `path` fail with [`StoreError::Stream`].
    pub fn fail_stream(&self, path: impl Into<ArchivePath>) {
        self.data.state().failing.insert(path.into());
    }

    /// Wait until `path` is not withheld, then return its content and
    /// whether its stream is set up to fail.
    async fn replicated_content(&self, path: &ArchivePath) -> Result<(Bytes, bool), StoreError> {
        loop {
            let released = self.data.released.notified();
            {
                let state = self.data.state();
                match state.entries.get(path).map(|e| &e.node) {
                    Some(Node::File(content)) => {
                        if !state.withheld.contains(path) {
                            return Ok((content.clone(), state.failing.contains(path)));
                        }
                    }
                    Some(Node::Directory) => return Err(StoreError::IsADirectory(path.clone())),
                    None if path.is_root() => return Err(StoreError::IsADirectory(path.clone())),
                    None => return Err(StoreError::NotFound(path.clone())),
                }
            }
            trace!(path = %path, "content withheld, waiting for replication");
            released.await;
            self.ensure_open()?;
        }
    }
}

impl Replica for MemoryReplica {
    fn key(&self) -> ArchiveKey {
        self.data.key
    }

    fn version(&self) -> u64 {
        self.data.state().version
    }

    fn writable(&self) -> bool {
        true
    }

    async fn stat(&self, path: &ArchivePath) -> Result<Stat, StoreError> {
        self.ensure_open()?;
        if path.is_root() {
            return Ok(Stat {
                kind: EntryKind::Directory,
                size: 0,
                mtime: None,
                version: 0,
            });
        }
        let state = self.data.state();
        let entry = state
            .entries
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let (kind, size) = match &entry.node {
            Node::File(content) => (EntryKind::File, content.len() as u64),
            Node::Directory => (EntryKind::Directory, 0),
        };
        Ok(Stat {
            kind,
            size,
            mtime: Some(entry.mtime),
            version: entry.version,
        })
    }

    async fn readdir(&self, path: &ArchivePath) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let state = self.data.state();
        match state.kind_of(path) {
            Some(EntryKind::Directory) => {}
            Some(_) => return Err(StoreError::NotADirectory(path.clone())),
            None => return Err(StoreError::NotFound(path.clone())),
        }
        Ok(state
            .entries
            .keys()
            .filter(|p| p.parent().as_ref() == Some(path))
            .filter_map(|p| p.file_name().map(str::to_string))
            .collect())
    }

    async fn read_stream(
        &self,
        path: &ArchivePath,
        options: ReadStreamOptions,
    ) -> Result<ByteStream, StoreError> {
        self.ensure_open()?;
        let (content, failing) = self.replicated_content(path).await?;
        if failing {
            let err = StoreError::stream(
                path.clone(),
                io::Error::new(io::ErrorKind::ConnectionReset, "peer connection lost"),
            );
            return Ok(stream::iter([Err(err)]).boxed());
        }

        let len = content.len();
        let start = usize::try_from(options.start).unwrap_or(usize::MAX).min(len);
        let end = match options.length {
            Some(length) => start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX)),
            None => len,
        }
        .min(len);

        let mut chunks = Vec::with_capacity((end - start) / CHUNK_SIZE + 1);
        let mut offset = start;
        while offset < end {
            let next = (offset + CHUNK_SIZE).min(end);
            chunks.push(Ok(content.slice(offset..next)));
            offset = next;
        }
        Ok(stream::iter(chunks).boxed())
    }

    fn history(&self) -> HistoryStream {
        if *self.closed.borrow() {
            return stream::empty().boxed();
        }
        let (snapshot, mut live) = {
            // Subscribe under the lock so no record falls between the
            // snapshot and the live feed.
            let state = self.data.state();
            (state.log.clone(), self.data.history.subscribe())
        };
        let mut closed = self.closed.subscribe();
        async_stream::stream! {
            let mut last = 0;
            for record in snapshot {
                last = record.version;
                yield record;
            }
            loop {
                let next = tokio::select! {
                    next = live.recv() => next,
                    // The flag only ever flips to true.
                    _ = closed.changed() => break,
                };
                match next {
                    Ok(record) if record.version > last => {
                        last = record.version;
                        yield record;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "history subscriber lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.send_replace(true);
        // Wake reads parked on withheld content so they observe the close.
        self.data.released.notify_waiters();
        Ok(())
    }

    async fn write_file(&self, path: &ArchivePath, content: Bytes) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.put(path.clone(), content).map(|_| ())
    }

    async fn mkdir(&self, path: &ArchivePath) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.make_dir(path.clone()).map(|_| ())
    }

    async fn remove(&self, path: &ArchivePath) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.delete(path.clone()).map(|_| ())
    }
}
