// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! The contract between hyperdat and the external discovery transport.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use hyperdat_store_core::DiscoveryKey;
use tokio::sync::broadcast;

use crate::config::SwarmConfig;
use crate::error::SwarmError;

/// Identity of a remote peer, as announced by the transport.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for PeerId {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SwarmError::InvalidPeerId {
                input: s.to_string(),
                reason: "empty".to_string(),
            });
        }
        hex::decode(s).map(Self).map_err(|e| SwarmError::InvalidPeerId {
            input: s.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(PeerId),
    Disconnected(PeerId),
}

/// Registers discovery keys with the peer network.
pub trait DiscoveryTransport: Send + Sync + 'static {
    type Session: TransportSession;

    fn join(
        &self,
        discovery_key: &DiscoveryKey,
        config: &SwarmConfig,
    ) -> impl Future<Output = Result<Self::Session, SwarmError>> + Send;
}

/// One joined discovery key.
pub trait TransportSession: Send + Sync + 'static {
    /// Connection events from now on. Events sent before the call are not
    /// replayed; read [`connection_count`](Self::connection_count) after
    /// subscribing.
    fn events(&self) -> broadcast::Receiver<ConnectionEvent>;

    /// Peers currently connected.
    fn connection_count(&self) -> usize;

    /// Stop advertising and accepting new connections.
    fn leave(&self) -> impl Future<Output = Result<(), SwarmError>> + Send;

    /// Drop every connection and release transport resources.
    fn destroy(&self) -> impl Future<Output = Result<(), SwarmError>> + Send;
}
