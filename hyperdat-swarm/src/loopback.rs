// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! In-process discovery transport.
//!
//! No sockets are opened. Peers "connect" when a test calls
//! [`LoopbackTransport::connect_peer`], which makes it possible to drive the
//! connection-count logic deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use hyperdat_store_core::DiscoveryKey;
use tokio::sync::broadcast;
use tracing::trace;

use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::transport::{ConnectionEvent, DiscoveryTransport, PeerId, TransportSession};

const EVENT_CAPACITY: usize = 256;

/// Teardown calls seen by the transport, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    Leave(DiscoveryKey),
    Destroy(DiscoveryKey),
}

#[derive(Default)]
struct TransportState {
    sessions: HashMap<DiscoveryKey, Arc<SessionShared>>,
    teardown: Vec<TeardownStep>,
    refuse_joins: Option<String>,
}

#[derive(Clone, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<TransportState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self, discovery_key: &DiscoveryKey) -> Result<Arc<SessionShared>, SwarmError> {
        self.state()
            .sessions
            .get(discovery_key)
            .cloned()
            .ok_or_else(|| SwarmError::Join {
                discovery_key: *discovery_key,
                reason: "not joined".to_string(),
            })
    }

    /// Make every following join fail with `reason`.
    pub fn refuse_joins(&self, reason: impl Into<String>) {
        self.state().refuse_joins = Some(reason.into());
    }

    /// Configuration the swarm for `discovery_key` was joined with.
    pub fn joined_config(&self, discovery_key: &DiscoveryKey) -> Option<SwarmConfig> {
        self.state()
            .sessions
            .get(discovery_key)
            .map(|s| s.config.clone())
    }

    pub fn teardown_log(&self) -> Vec<TeardownStep> {
        self.state().teardown.clone()
    }

    /// Simulate `peer` connecting to the swarm for `discovery_key`.
    ///
    /// Connecting an already connected peer is a no-op.
    pub fn connect_peer(
        &self,
        discovery_key: &DiscoveryKey,
        peer: PeerId,
    ) -> Result<(), SwarmError> {
        self.session(discovery_key)?.connect(peer)
    }

    pub fn disconnect_peer(
        &self,
        discovery_key: &DiscoveryKey,
        peer: &PeerId,
    ) -> Result<(), SwarmError> {
        self.session(discovery_key)?.disconnect(peer);
        Ok(())
    }
}

impl DiscoveryTransport for LoopbackTransport {
    type Session = LoopbackSession;

    async fn join(
        &self,
        discovery_key: &DiscoveryKey,
        config: &SwarmConfig,
    ) -> Result<LoopbackSession, SwarmError> {
        let allowed = config.allowed_peers()?;
        let mut state = self.state();
        if let Some(reason) = &state.refuse_joins {
            return Err(SwarmError::Join {
                discovery_key: *discovery_key,
                reason: reason.clone(),
            });
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(SessionShared {
            discovery_key: *discovery_key,
            config: config.clone(),
            allowed,
            peers: Mutex::new(HashSet::new()),
            events,
            accepting: AtomicBool::new(true),
            transport: Arc::downgrade(&self.state),
        });
        state
            .sessions
            .insert(*discovery_key, Arc::clone(&shared));
        Ok(LoopbackSession { shared })
    }
}

struct SessionShared {
    discovery_key: DiscoveryKey,
    config: SwarmConfig,
    allowed: Option<HashSet<PeerId>>,
    peers: Mutex<HashSet<PeerId>>,
    events: broadcast::Sender<ConnectionEvent>,
    accepting: AtomicBool,
    transport: Weak<Mutex<TransportState>>,
}

impl SessionShared {
    fn peers(&self) -> MutexGuard<'_, HashSet<PeerId>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self, peer: PeerId) -> Result<(), SwarmError> {
        let rejected = |reason: &str| SwarmError::PeerRejected {
            peer: peer.clone(),
            reason: reason.to_string(),
        };
        if !self.accepting.load(Ordering::Acquire) {
            return Err(rejected("swarm is not accepting connections"));
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&peer) {
                return Err(rejected("not in allow list"));
            }
        }
        {
            let mut peers = self.peers();
            if peers.contains(&peer) {
                return Ok(());
            }
            if let Some(limit) = self.config.connection_limit() {
                if peers.len() >= limit {
                    return Err(rejected("connection limit reached"));
                }
            }
            peers.insert(peer.clone());
        }
        trace!(discovery_key = %self.discovery_key, peer = %peer, "peer connected");
        let _ = self.events.send(ConnectionEvent::Connected(peer));
        Ok(())
    }

    fn disconnect(&self, peer: &PeerId) {
        if self.peers().remove(peer) {
            trace!(discovery_key = %self.discovery_key, peer = %peer, "peer disconnected");
            let _ = self.events.send(ConnectionEvent::Disconnected(peer.clone()));
        }
    }

    fn with_transport(&self, f: impl FnOnce(&mut TransportState)) {
        if let Some(transport) = self.transport.upgrade() {
            f(&mut transport.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

pub struct LoopbackSession {
    shared: Arc<SessionShared>,
}

impl LoopbackSession {
    pub fn config(&self) -> &SwarmConfig {
        &self.shared.config
    }
}

impl TransportSession for LoopbackSession {
    fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    fn connection_count(&self) -> usize {
        self.shared.peers().len()
    }

    async fn leave(&self) -> Result<(), SwarmError> {
        self.shared.accepting.store(false, Ordering::Release);
        let step = TeardownStep::Leave(self.shared.discovery_key);
        self.shared.with_transport(|state| state.teardown.push(step));
        Ok(())
    }

    async fn destroy(&self) -> Result<(), SwarmError> {
        let dropped: Vec<PeerId> = self.shared.peers().drain().collect();
        for peer in dropped {
            let _ = self.shared.events.send(ConnectionEvent::Disconnected(peer));
        }
        let discovery_key = self.shared.discovery_key;
        self.shared.with_transport(|state| {
            state.teardown.push(TeardownStep::Destroy(discovery_key));
            let is_current = state
                .sessions
                .get(&discovery_key)
                .is_some_and(|s| Arc::ptr_eq(s, &self.shared));
            if is_current {
                state.sessions.remove(&discovery_key);
            }
        });
        Ok(())
    }
}
