// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use hyperdat_store_core::DiscoveryKey;
use thiserror::Error;

use crate::transport::PeerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwarmError {
    #[error("invalid swarm configuration: {0}")]
    Config(String),

    #[error("invalid peer id {input:?}: {reason}")]
    InvalidPeerId { input: String, reason: String },

    #[error("failed to join swarm {discovery_key}: {reason}")]
    Join {
        discovery_key: DiscoveryKey,
        reason: String,
    },

    #[error("peer {peer} rejected: {reason}")]
    PeerRejected { peer: PeerId, reason: String },

    #[error("swarm session has already left")]
    AlreadyLeft,

    #[error("swarm session must leave before it is destroyed")]
    NotLeft,

    #[error("swarm session is already destroyed")]
    AlreadyDestroyed,

    #[error("swarm session closed while waiting for peers")]
    Closed,
}
