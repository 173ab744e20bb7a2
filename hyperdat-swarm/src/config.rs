// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::SwarmError;
use crate::transport::PeerId;

/// Which connection transports the swarm may use.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Hole-punched UDP only.
    #[display("utp")]
    Utp,
    #[display("tcp")]
    Tcp,
    #[default]
    #[display("both")]
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Serve archive data to peers.
    pub upload: bool,
    /// Fetch archive data from peers.
    pub download: bool,
    pub transport: TransportKind,
    /// Simultaneous connection limit (0 = unlimited).
    pub max_connections: usize,
    /// Hex-encoded ids of the only peers allowed to connect (empty = all).
    pub allow_list: Vec<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            upload: true,
            download: true,
            transport: TransportKind::Both,
            max_connections: 0,
            allow_list: Vec::new(),
        }
    }
}

impl SwarmConfig {
    pub fn connection_limit(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }

    /// Parsed allow-list, `None` when every peer is allowed.
    pub fn allowed_peers(&self) -> Result<Option<HashSet<PeerId>>, SwarmError> {
        if self.allow_list.is_empty() {
            return Ok(None);
        }
        self.allow_list
            .iter()
            .map(|id| id.parse())
            .collect::<Result<HashSet<_>, _>>()
            .map(Some)
    }

    pub fn validate(&self) -> Result<(), SwarmError> {
        if !self.upload && !self.download {
            return Err(SwarmError::Config(
                "at least one of upload and download must be enabled".to_string(),
            ));
        }
        self.allowed_peers().map(|_| ())
    }
}
