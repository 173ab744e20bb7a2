// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;

use hyperdat_store_core::StorageConfig;
use hyperdat_swarm::SwarmConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::ClientMetrics;

/// Name of the metadata document read from the archive root during
/// bring-up.
pub const DEFAULT_METADATA_FILE: &str = "dat.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub storage: StorageConfig,
    pub swarm: SwarmConfig,
    /// Hold bring-up until the first peer connects.
    pub wait_for_peer: bool,
    /// Replicate (or materialise) the addressed path as the last bring-up
    /// step when storage is persistent.
    pub sync_on_init: bool,
    /// Archive-root file holding [`ArchiveInfo`](crate::ArchiveInfo).
    pub metadata_file: String,
    #[serde(skip)]
    pub metrics: Option<Arc<ClientMetrics>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            swarm: SwarmConfig::default(),
            wait_for_peer: false,
            sync_on_init: true,
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            metrics: None,
        }
    }
}

impl ClientConfig {
    pub fn from_file(settings_file: &Path) -> Result<Self, ConfigError> {
        let contents = read_to_string(settings_file).map_err(|e| ConfigError::ReadFile {
            path: settings_file.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate().map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })?;
        self.swarm.validate().map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })?;
        if self.metadata_file.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid {
                reason: "metadata_file must name a file".to_string(),
            });
        }
        Ok(())
    }
}
