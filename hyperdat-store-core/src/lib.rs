// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Replica storage layer for hyperdat.
//!
//! This crate defines the contract hyperdat expects from the external
//! append-only storage engine, together with the pure value types that flow
//! across it: archive keys, normalised archive paths, stat records and
//! history records.
//!
//! **Architecture**: this is the Core Layer. `hyperdat-swarm` and
//! `hyperdat-client` build on it; the storage engine itself is an external
//! collaborator plugged in through [`StorageEngine`].
//!
//! # Key Modules
//!
//! - `key` - archive and discovery keys
//! - `path` - [`ArchivePath`], the logical path type used everywhere
//! - `engine` - the [`StorageEngine`] / [`Replica`] contract
//! - `replica` - [`ReplicaStore`], the facade the client drives
//! - `memory` - an in-process reference engine
//!
//! # Example
//!
//! ```ignore
//! use hyperdat_store_core::{ArchiveKey, ReplicaStore, StorageConfig};
//! use hyperdat_store_core::memory::MemoryEngine;
//!
//! let engine = MemoryEngine::new();
//! let store = ReplicaStore::open(&engine, &key, &StorageConfig::default()).await?;
//! let names = store.readdir(&"/".into()).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod memory;
pub mod path;
pub mod replica;
pub mod stat;

pub use config::{SecretDir, StorageConfig, StorageMode};
pub use engine::{
    ByteStream, Encoding, FileContent, HistoryStream, ReadStreamOptions, Replica, StorageEngine,
};
pub use error::{IoContext, StoreError};
pub use key::{ArchiveKey, DiscoveryKey, KeyParseError};
pub use path::ArchivePath;
pub use replica::ReplicaStore;
pub use stat::{EntryKind, HistoryKind, HistoryRecord, Stat};
