// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::time::SystemTime;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::path::ArchivePath;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
    #[display("unknown")]
    Unknown,
}

/// Metadata the storage engine reports for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: EntryKind,
    /// Content length in bytes; zero for directories.
    pub size: u64,
    pub mtime: Option<SystemTime>,
    /// Archive version at which the entry was last written.
    pub version: u64,
}

impl Stat {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    #[display("put")]
    Put,
    #[display("del")]
    Del,
    #[display("mkdir")]
    Mkdir,
}

/// One change in the archive's append-only log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub version: u64,
    pub kind: HistoryKind,
    pub path: ArchivePath,
}
