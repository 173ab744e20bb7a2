// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::path::ArchivePath;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no such file or directory: {0}")]
    NotFound(ArchivePath),

    #[error("not a directory: {0}")]
    NotADirectory(ArchivePath),

    #[error("is a directory: {0}")]
    IsADirectory(ArchivePath),

    #[error("the archive root cannot be removed")]
    RootNotRemovable,

    #[error("content of {0} is not valid UTF-8")]
    InvalidUtf8(ArchivePath),

    #[error("stream error reading {path}: {source}")]
    Stream {
        path: ArchivePath,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("replica is closed")]
    Closed,

    #[error("replica was already closed")]
    AlreadyClosed,

    #[error("operation not supported by this storage engine: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn stream(path: ArchivePath, source: std::io::Error) -> Self {
        Self::Stream { path, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper trait for adding context to IO errors
pub trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StoreError::io(f(), e))
    }
}
