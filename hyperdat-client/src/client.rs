// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! The archive client.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use hyperdat_address::{AddressResolver, NameResolver, ResolvedAddress};
use hyperdat_store_core::{
    ArchiveKey, ArchivePath, ByteStream, Encoding, FileContent, HistoryStream, ReadStreamOptions,
    Replica, ReplicaStore, StorageEngine,
};
use hyperdat_swarm::{DiscoveryTransport, SwarmSession, TransportSession};
use tokio::sync::{OnceCell, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::download::{DownloadTarget, Downloader};
use crate::error::ClientError;
use crate::events::{ClientEvent, EventBus};
use crate::info::{ArchiveInfo, probe_archive_info};
use crate::metrics::ClientMetrics;
use crate::state::{ClientState, StateMachine};
use crate::tree::{self, FileTree};

/// External collaborators of an [`ArchiveClient`].
pub struct Services<E, T, N> {
    /// Opens local replicas.
    pub engine: E,
    /// Joins the discovery swarm.
    pub transport: T,
    /// Resolves human-readable archive names.
    pub names: N,
}

/// Parts acquired during bring-up. Set once, when bring-up succeeds.
struct Connected<R, S> {
    address: ResolvedAddress,
    store: ReplicaStore<R>,
    swarm: SwarmSession<S>,
    info: ArchiveInfo,
}

/// Client for a single archive.
///
/// Owns the archive's replica and swarm session. The lifecycle is one-way:
/// [`initialize`](Self::initialize) once, use, [`close`](Self::close) once.
/// Calling an operation in the wrong state fails with
/// [`ClientError::StateViolation`].
pub struct ArchiveClient<E, T, N>
where
    E: StorageEngine,
    T: DiscoveryTransport,
{
    address: String,
    config: ClientConfig,
    engine: E,
    transport: T,
    resolver: AddressResolver<N>,
    state: StateMachine,
    events: EventBus,
    connected: OnceLock<Connected<E::Replica, T::Session>>,
    tree: OnceCell<Arc<FileTree>>,
    peer_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl<E, T, N> ArchiveClient<E, T, N>
where
    E: StorageEngine,
    T: DiscoveryTransport,
    N: NameResolver,
{
    /// Create a client for `address`. The configuration is validated here;
    /// nothing is resolved or opened until [`initialize`](Self::initialize).
    pub fn new(
        address: impl Into<String>,
        config: ClientConfig,
        services: Services<E, T, N>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            address: address.into(),
            config,
            engine: services.engine,
            transport: services.transport,
            resolver: AddressResolver::new(services.names),
            state: StateMachine::new(),
            events: EventBus::new(),
            connected: OnceLock::new(),
            tree: OnceCell::new(),
            peer_watcher: Mutex::new(None),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ClientState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    /// Lifecycle notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn metrics(&self) -> Option<&ClientMetrics> {
        self.config.metrics.as_deref()
    }

    fn transition(
        &self,
        operation: &'static str,
        from: ClientState,
        to: ClientState,
    ) -> Result<(), ClientError> {
        self.state.transition(operation, from, to)?;
        self.events.emit(ClientEvent::StateChanged { from, to });
        Ok(())
    }

    fn connected(
        &self,
        operation: &'static str,
    ) -> Result<&Connected<E::Replica, T::Session>, ClientError> {
        self.state.require(operation, ClientState::Ready)?;
        self.connected.get().ok_or_else(|| ClientError::StateViolation {
            operation,
            state: self.state(),
        })
    }

    /// Bring the client up: resolve the address, open the replica, join the
    /// swarm, probe the archive metadata and, for persistent storage,
    /// synchronise the addressed path.
    ///
    /// May be called once. If it fails before the client is ready, the
    /// partially acquired resources are released and the instance stays
    /// unusable; create a new client to retry.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        self.transition(
            "initialize",
            ClientState::Uninitialized,
            ClientState::Initializing,
        )?;
        let started = Instant::now();
        info!(address = %self.address, "initializing archive client");

        let result = self.bring_up().await;
        if let Some(metrics) = self.metrics() {
            metrics.observe("initialize", started);
        }
        if let Err(e) = &result {
            warn!(address = %self.address, error = %e, "bring-up failed");
        }
        result
    }

    async fn bring_up(&self) -> Result<(), ClientError> {
        let address = self.resolver.resolve(&self.address).await?;
        debug!(key = %address.key, path = %address.path, "address resolved");
        if let Some(version) = address.version {
            warn!(
                key = %address.key,
                version,
                "address pins a version; reads follow the latest replica version"
            );
        }

        let store = ReplicaStore::open(&self.engine, &address.key, &self.config.storage).await?;

        let swarm = match SwarmSession::join(
            &self.transport,
            store.discovery_key(),
            &self.config.swarm,
        )
        .await
        {
            Ok(swarm) => swarm,
            Err(e) => {
                release_store(&store).await;
                return Err(e.into());
            }
        };

        if self.config.wait_for_peer {
            info!(discovery_key = %swarm.discovery_key(), "waiting for first peer");
            if let Err(e) = swarm.wait_for_first_peer().await {
                release_swarm(&swarm).await;
                release_store(&store).await;
                return Err(e.into());
            }
        }

        let info = probe_archive_info(&store, &self.config.metadata_file)
            .await
            .unwrap_or_default();

        let peers = swarm.watch_peers();
        let connected = Connected {
            address,
            store,
            swarm,
            info,
        };
        if self.connected.set(connected).is_err() {
            return Err(ClientError::StateViolation {
                operation: "initialize",
                state: self.state(),
            });
        }
        self.watch_peers(peers);
        self.transition("initialize", ClientState::Initializing, ClientState::Ready)?;

        let connected = self.connected("initialize")?;
        info!(
            key = %connected.address.key,
            version = connected.store.version(),
            peers = connected.swarm.peer_count(),
            info_entries = connected.info.len(),
            "archive ready"
        );

        if self.config.sync_on_init && self.config.storage.is_persistent() {
            let path = connected.address.path.clone();
            let target = match self.config.storage.dir() {
                Some(dir) if !path.is_root() => DownloadTarget::Materialize(path.to_local(&dir)),
                _ => DownloadTarget::Discard,
            };
            debug!(path = %path, ?target, "synchronising addressed path");
            self.downloader(connected).download(path, target).await?;
        }
        Ok(())
    }

    /// Mirror swarm peer counts into events and metrics.
    fn watch_peers(&self, mut peers: tokio::sync::watch::Receiver<usize>) {
        let events = self.events.clone();
        let metrics = self.config.metrics.clone();
        let handle = tokio::spawn(async move {
            loop {
                let count = *peers.borrow_and_update();
                if let Some(metrics) = &metrics {
                    metrics.peers.set(i64::try_from(count).unwrap_or(i64::MAX));
                }
                events.emit(ClientEvent::PeersChanged(count));
                if peers.changed().await.is_err() {
                    break;
                }
            }
        });
        let previous = self
            .peer_watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Tear the client down: leave the swarm, close the replica, destroy the
    /// swarm. Only valid once, on a ready client.
    ///
    /// The client ends up closed even if a teardown step fails; the first
    /// failure is returned.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.transition("close", ClientState::Ready, ClientState::Closing)?;
        let mut first_error: Option<ClientError> = None;

        if let Some(connected) = self.connected.get() {
            if let Err(e) = connected.swarm.leave().await {
                warn!(error = %e, "failed to leave swarm");
                first_error.get_or_insert(e.into());
            }
            if let Err(e) = connected.store.close().await {
                warn!(error = %e, "failed to close replica");
                first_error.get_or_insert(e.into());
            }
            if let Err(e) = connected.swarm.destroy().await {
                warn!(error = %e, "failed to destroy swarm session");
                first_error.get_or_insert(e.into());
            }
        }
        let watcher = self
            .peer_watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        if let Some(metrics) = self.metrics() {
            metrics.peers.set(0);
        }

        self.transition("close", ClientState::Closing, ClientState::Closed)?;
        info!(address = %self.address, "archive client closed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Archive key, once the address is resolved and the replica open.
    pub fn archive_key(&self) -> Option<ArchiveKey> {
        self.connected.get().map(|c| c.address.key)
    }

    pub fn resolved_address(&self) -> Option<&ResolvedAddress> {
        self.connected.get().map(|c| &c.address)
    }

    /// Archive metadata; empty before bring-up or when the archive has none.
    pub fn archive_info(&self) -> ArchiveInfo {
        self.connected
            .get()
            .map(|c| c.info.clone())
            .unwrap_or_default()
    }

    /// Currently connected peers; zero before the swarm is joined.
    pub fn peer_count(&self) -> usize {
        self.connected.get().map_or(0, |c| c.swarm.peer_count())
    }

    /// Replica revision counter, once the replica is open.
    pub fn version(&self) -> Option<u64> {
        self.connected.get().map(|c| c.store.version())
    }

    pub async fn read_file(
        &self,
        path: &str,
        encoding: Encoding,
    ) -> Result<FileContent, ClientError> {
        let connected = self.connected("read file")?;
        Ok(connected
            .store
            .read_file(&ArchivePath::new(path), encoding)
            .await?)
    }

    pub async fn read_file_stream(
        &self,
        path: &str,
        options: ReadStreamOptions,
    ) -> Result<ByteStream, ClientError> {
        let connected = self.connected("read file stream")?;
        Ok(connected
            .store
            .read_stream(&ArchivePath::new(path), options)
            .await?)
    }

    pub fn read_history_stream(&self) -> Result<HistoryStream, ClientError> {
        let connected = self.connected("read history")?;
        Ok(connected.store.history()?)
    }

    /// The archive's directory tree, enumerated on first call and reused
    /// afterwards.
    pub async fn archive_file_tree(&self) -> Result<Arc<FileTree>, ClientError> {
        let connected = self.connected("enumerate tree")?;
        let tree = self
            .tree
            .get_or_try_init(|| async {
                let started = Instant::now();
                let tree = tree::enumerate(&connected.store, &ArchivePath::root()).await?;
                if let Some(metrics) = self.metrics() {
                    metrics.observe("enumerate_tree", started);
                }
                Ok::<_, ClientError>(Arc::new(tree))
            })
            .await?;
        Ok(Arc::clone(tree))
    }

    /// Where a download without an explicit local path goes.
    fn target(&self, local: Option<&Path>) -> Result<DownloadTarget, ClientError> {
        match local {
            Some(local) => Ok(DownloadTarget::Materialize(local.to_path_buf())),
            None if self.config.storage.is_persistent() => Ok(DownloadTarget::Discard),
            None => Err(ClientError::Usage(
                "a local path is required when storage is not persistent".to_string(),
            )),
        }
    }

    fn downloader<'a>(
        &'a self,
        connected: &'a Connected<E::Replica, T::Session>,
    ) -> Downloader<'a, E::Replica> {
        Downloader {
            store: &connected.store,
            events: &self.events,
            metrics: self.metrics(),
        }
    }

    /// Download a file or directory, chosen by what `remote` is.
    ///
    /// Without `local`, content is only replicated into the persistent
    /// replica; outside persistent mode that is a usage error.
    pub async fn download(&self, remote: &str, local: Option<&Path>) -> Result<(), ClientError> {
        let connected = self.connected("download")?;
        let target = self.target(local)?;
        let started = Instant::now();
        let result = self
            .downloader(connected)
            .download(ArchivePath::new(remote), target)
            .await;
        if let Some(metrics) = self.metrics() {
            metrics.observe("download", started);
        }
        result
    }

    /// Download a single file. Returns the number of bytes transferred.
    pub async fn download_file(
        &self,
        remote: &str,
        local: Option<&Path>,
    ) -> Result<u64, ClientError> {
        let connected = self.connected("download file")?;
        let target = self.target(local)?;
        self.downloader(connected)
            .download_file(&ArchivePath::new(remote), &target)
            .await
    }

    /// Download a directory recursively.
    pub async fn download_dir(
        &self,
        remote: &str,
        local: Option<&Path>,
    ) -> Result<(), ClientError> {
        let connected = self.connected("download directory")?;
        let target = self.target(local)?;
        self.downloader(connected)
            .download_dir(ArchivePath::new(remote), target)
            .await
    }

    /// Delete the on-disk metadata directory of a closed raw-mode replica.
    pub async fn remove_metadata_directory(&self) -> Result<(), ClientError> {
        self.state
            .require("remove metadata directory", ClientState::Closed)?;
        let storage = &self.config.storage;
        if !storage.is_persistent() {
            return Err(ClientError::Usage(
                "metadata is held in memory; there is no directory to remove".to_string(),
            ));
        }
        if storage.is_managed() {
            return Err(ClientError::Usage(
                "managed storage owns its metadata directory".to_string(),
            ));
        }
        let dir = storage.metadata_dir().ok_or_else(|| {
            ClientError::Usage("storage has no metadata directory".to_string())
        })?;
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| ClientError::local_write("remove", &dir, e))?;
        info!(path = %dir.display(), "metadata directory removed");
        Ok(())
    }
}

async fn release_store<R: Replica>(store: &ReplicaStore<R>) {
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to release replica after aborted bring-up");
    }
}

async fn release_swarm<S: TransportSession>(swarm: &SwarmSession<S>) {
    if let Err(e) = swarm.leave().await {
        warn!(error = %e, "failed to leave swarm after aborted bring-up");
    }
    if let Err(e) = swarm.destroy().await {
        warn!(error = %e, "failed to destroy swarm after aborted bring-up");
    }
}

impl<E, T, N> Drop for ArchiveClient<E, T, N>
where
    E: StorageEngine,
    T: DiscoveryTransport,
{
    fn drop(&mut self) {
        let watcher = self
            .peer_watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
    }
}
