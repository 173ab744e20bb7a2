// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use hyperdat_address::AddressError;
use hyperdat_store_core::StoreError;
use hyperdat_swarm::SwarmError;
use thiserror::Error;

use crate::state::ClientState;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("cannot {operation} while the client is {state}")]
    StateViolation {
        operation: &'static str,
        state: ClientState,
    },

    #[error("usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Swarm error: {0}")]
    Swarm(#[from] SwarmError),

    #[error("failed to {operation} {}: {source}", .path.display())]
    LocalWrite {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn local_write(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::LocalWrite {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    pub fn is_state_violation(&self) -> bool {
        matches!(self, Self::StateViolation { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}
