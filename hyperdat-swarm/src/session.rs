// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Swarm membership for one archive.
//!
//! [`SwarmSession`] wraps a transport session, mirrors its connection count
//! into a watch channel and enforces the leave-then-destroy teardown order.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use hyperdat_store_core::DiscoveryKey;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::transport::{ConnectionEvent, DiscoveryTransport, TransportSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Joined,
    Left,
    Destroyed,
}

pub struct SwarmSession<S> {
    transport: Arc<S>,
    discovery_key: DiscoveryKey,
    peers: Arc<watch::Sender<usize>>,
    phase: Mutex<Phase>,
    bridge: JoinHandle<()>,
}

impl<S: TransportSession> SwarmSession<S> {
    /// Join the swarm for `discovery_key` through `transport`.
    pub async fn join<T>(
        transport: &T,
        discovery_key: DiscoveryKey,
        config: &SwarmConfig,
    ) -> Result<Self, SwarmError>
    where
        T: DiscoveryTransport<Session = S>,
    {
        config.validate()?;
        let session = transport.join(&discovery_key, config).await?;
        debug!(
            discovery_key = %discovery_key,
            transport = %config.transport,
            max_connections = config.max_connections,
            "joined swarm"
        );
        Ok(Self::from_transport(session, discovery_key))
    }

    /// Wrap an already joined transport session. Must be called inside a
    /// tokio runtime.
    pub fn from_transport(session: S, discovery_key: DiscoveryKey) -> Self {
        // Subscribe before sampling the count so no change is missed.
        let events = session.events();
        let (peers, _) = watch::channel(session.connection_count());
        let peers = Arc::new(peers);
        let transport = Arc::new(session);
        let bridge = tokio::spawn(bridge_events(
            events,
            Arc::downgrade(&transport),
            Arc::clone(&peers),
            discovery_key,
        ));
        Self {
            transport,
            discovery_key,
            peers,
            phase: Mutex::new(Phase::Joined),
            bridge,
        }
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.discovery_key
    }

    pub fn transport(&self) -> &S {
        &self.transport
    }

    /// Number of peers currently connected.
    pub fn peer_count(&self) -> usize {
        *self.peers.borrow()
    }

    pub fn watch_peers(&self) -> watch::Receiver<usize> {
        self.peers.subscribe()
    }

    /// Suspend until at least one peer is connected.
    pub async fn wait_for_first_peer(&self) -> Result<(), SwarmError> {
        let mut peers = self.watch_peers();
        loop {
            if *peers.borrow_and_update() > 0 {
                return Ok(());
            }
            if self.phase() != Phase::Joined {
                return Err(SwarmError::Closed);
            }
            peers.changed().await.map_err(|_| SwarmError::Closed)?;
        }
    }

    fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, from: Phase, to: Phase) -> Result<(), SwarmError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match (*phase, from) {
            (current, expected) if current == expected => {
                *phase = to;
                Ok(())
            }
            (Phase::Joined, _) => Err(SwarmError::NotLeft),
            (Phase::Left, _) => Err(SwarmError::AlreadyLeft),
            (Phase::Destroyed, _) => Err(SwarmError::AlreadyDestroyed),
        }
    }

    /// Stop advertising the discovery key. First half of teardown.
    pub async fn leave(&self) -> Result<(), SwarmError> {
        self.advance(Phase::Joined, Phase::Left)?;
        // Wake first-peer waiters so they observe the phase change.
        self.peers.send_modify(|_| {});
        self.transport.leave().await?;
        debug!(discovery_key = %self.discovery_key, "left swarm");
        Ok(())
    }

    /// Release every transport resource. Only valid after [`leave`](Self::leave).
    pub async fn destroy(&self) -> Result<(), SwarmError> {
        self.advance(Phase::Left, Phase::Destroyed)?;
        let result = self.transport.destroy().await;
        self.bridge.abort();
        self.peers.send_replace(0);
        match &result {
            Ok(()) => debug!(discovery_key = %self.discovery_key, "swarm destroyed"),
            Err(e) => warn!(discovery_key = %self.discovery_key, error = %e, "swarm destroy failed"),
        }
        result
    }
}

impl<S> Drop for SwarmSession<S> {
    fn drop(&mut self) {
        self.bridge.abort();
    }
}

async fn bridge_events<S: TransportSession>(
    mut events: tokio::sync::broadcast::Receiver<ConnectionEvent>,
    transport: Weak<S>,
    peers: Arc<watch::Sender<usize>>,
    discovery_key: DiscoveryKey,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                trace!(discovery_key = %discovery_key, ?event, "connection event");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(discovery_key = %discovery_key, skipped, "connection events lagged");
            }
            Err(RecvError::Closed) => break,
        }
        let Some(transport) = transport.upgrade() else {
            break;
        };
        let count = transport.connection_count();
        peers.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackTransport, TeardownStep};
    use crate::transport::PeerId;
    use std::time::Duration;

    fn dk() -> DiscoveryKey {
        DiscoveryKey::from_bytes([5; 32])
    }

    async fn wait_for_count(session: &SwarmSession<impl TransportSession>, expected: usize) {
        let mut peers = session.watch_peers();
        tokio::time::timeout(Duration::from_secs(5), peers.wait_for(|n| *n == expected))
            .await
            .expect("peer count never reached expected value")
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn peer_count_follows_connection_events() {
        let transport = LoopbackTransport::new();
        let session = SwarmSession::join(&transport, dk(), &SwarmConfig::default())
            .await
            .unwrap();
        assert_eq!(session.peer_count(), 0);

        transport.connect_peer(&dk(), PeerId::new([1])).unwrap();
        transport.connect_peer(&dk(), PeerId::new([2])).unwrap();
        wait_for_count(&session, 2).await;

        transport.disconnect_peer(&dk(), &PeerId::new([1])).unwrap();
        wait_for_count(&session, 1).await;
        assert_eq!(session.peer_count(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn wait_for_first_peer_resumes_on_connect() {
        let transport = LoopbackTransport::new();
        let session = Arc::new(
            SwarmSession::join(&transport, dk(), &SwarmConfig::default())
                .await
                .unwrap(),
        );
        let waiter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.wait_for_first_peer().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        transport.connect_peer(&dk(), PeerId::new([7])).unwrap();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn teardown_must_leave_before_destroy() {
        let transport = LoopbackTransport::new();
        let session = SwarmSession::join(&transport, dk(), &SwarmConfig::default())
            .await
            .unwrap();
        assert_eq!(session.destroy().await, Err(SwarmError::NotLeft));

        session.leave().await.unwrap();
        assert_eq!(session.leave().await, Err(SwarmError::AlreadyLeft));
        session.destroy().await.unwrap();
        assert_eq!(session.destroy().await, Err(SwarmError::AlreadyDestroyed));

        assert_eq!(
            transport.teardown_log(),
            vec![TeardownStep::Leave(dk()), TeardownStep::Destroy(dk())]
        );
        assert_eq!(session.peer_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn join_rejects_invalid_config() {
        let transport = LoopbackTransport::new();
        let config = SwarmConfig {
            upload: false,
            download: false,
            ..SwarmConfig::default()
        };
        let result = SwarmSession::join(&transport, dk(), &config).await;
        assert!(matches!(result, Err(SwarmError::Config(_))));
    }
}
