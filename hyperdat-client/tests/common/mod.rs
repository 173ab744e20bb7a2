// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use std::path::Path;

use hyperdat_address::StaticNameResolver;
use hyperdat_client::{ArchiveClient, ClientConfig, ClientEvent, Services};
use hyperdat_store_core::memory::{MemoryEngine, MemoryReplica};
use hyperdat_store_core::{ArchiveKey, DiscoveryKey, SecretDir, StorageConfig};
use hyperdat_swarm::LoopbackTransport;
use tokio::sync::broadcast;

pub type TestClient = ArchiveClient<MemoryEngine, LoopbackTransport, StaticNameResolver>;

/// One archive served from memory, plus the loopback swarm and a name
/// table that knows it as `example.org`.
pub struct Fixture {
    pub key: ArchiveKey,
    pub engine: MemoryEngine,
    pub transport: LoopbackTransport,
    pub names: StaticNameResolver,
    pub archive: MemoryReplica,
}

impl Fixture {
    pub fn new() -> Self {
        let key = ArchiveKey::from_bytes([0x42; 32]);
        let engine = MemoryEngine::new();
        let archive = engine.archive(key);
        Self {
            key,
            engine,
            transport: LoopbackTransport::new(),
            names: StaticNameResolver::new().with_name("example.org", key),
            archive,
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fixture = Self::new();
        for (path, content) in files {
            fixture.archive.put(*path, content.to_string()).unwrap();
        }
        fixture
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.key.discovery_key()
    }

    /// `dat://<key><path>`
    pub fn address(&self, path: &str) -> String {
        format!("dat://{}{}", self.key, path)
    }

    pub fn client_for(&self, address: &str, config: ClientConfig) -> TestClient {
        ArchiveClient::new(
            address,
            config,
            Services {
                engine: self.engine.clone(),
                transport: self.transport.clone(),
                names: self.names.clone(),
            },
        )
        .unwrap()
    }

    pub fn client(&self, config: ClientConfig) -> TestClient {
        self.client_for(&self.address("/"), config)
    }

    pub async fn ready_client(&self, config: ClientConfig) -> TestClient {
        let client = self.client(config);
        client.initialize().await.unwrap();
        client
    }
}

/// Raw on-disk storage under `dir`, keeping secrets inside the metadata
/// directory so nothing is written to the user's data directory.
pub fn raw_config(dir: &Path) -> ClientConfig {
    ClientConfig {
        storage: StorageConfig {
            secret_dir: SecretDir::Alongside,
            ..StorageConfig::raw(dir)
        },
        ..ClientConfig::default()
    }
}

pub fn managed_config(dir: &Path) -> ClientConfig {
    ClientConfig {
        storage: StorageConfig {
            secret_dir: SecretDir::Alongside,
            ..StorageConfig::managed(dir)
        },
        ..ClientConfig::default()
    }
}

/// Events received so far, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
