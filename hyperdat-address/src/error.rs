// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid archive address {input:?}: {reason}")]
    Parse { input: String, reason: String },

    #[error("could not resolve archive name {name:?}: {reason}")]
    NameResolution { name: String, reason: String },
}

impl AddressError {
    pub fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn name_resolution(name: &str, reason: impl Into<String>) -> Self {
        Self::NameResolution {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
