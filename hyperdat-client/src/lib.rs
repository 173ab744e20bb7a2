// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Client facade over a replicated, append-only archive.
//!
//! An [`ArchiveClient`] resolves an archive address, opens the local replica,
//! joins the discovery swarm for it and then exposes reads, tree
//! enumeration and recursive downloads.
//!
//! **Architecture**: this is the top layer. It drives
//! `hyperdat-address`, `hyperdat-store-core` and `hyperdat-swarm`; the
//! storage engine, network transport and name resolver are injected through
//! [`Services`].
//!
//! # Example
//!
//! ```ignore
//! use hyperdat_address::StaticNameResolver;
//! use hyperdat_client::{ArchiveClient, ClientConfig, Services};
//! use hyperdat_store_core::memory::MemoryEngine;
//! use hyperdat_swarm::LoopbackTransport;
//!
//! let client = ArchiveClient::new(
//!     "dat://<64 hex digits>/docs",
//!     ClientConfig::default(),
//!     Services {
//!         engine: MemoryEngine::new(),
//!         transport: LoopbackTransport::new(),
//!         names: StaticNameResolver::new(),
//!     },
//! )?;
//! client.initialize().await?;
//! let tree = client.archive_file_tree().await?;
//! client.download("/docs", Some(Path::new("./docs"))).await?;
//! client.close().await?;
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod fanout;
pub mod info;
pub mod metrics;
pub mod state;
pub mod tree;

pub use client::{ArchiveClient, Services};
pub use config::{ClientConfig, DEFAULT_METADATA_FILE};
pub use download::DownloadTarget;
pub use error::{ClientError, ConfigError};
pub use events::ClientEvent;
pub use info::ArchiveInfo;
pub use metrics::ClientMetrics;
pub use state::ClientState;
pub use tree::{FileTree, FileTreeNode};
