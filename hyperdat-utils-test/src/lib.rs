// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Test utilities for hyperdat.
//!
//! Proptest strategies for archive paths and trees, plus a temp dir helper
//! with a canonical path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use tempfile::TempDir;

/// A wrapper around TempDir that provides a canonicalized path.
/// This resolves symlinks like /var -> /private/var on macOS, so paths
/// reported by the client compare equal to the ones a test built.
pub struct CanonicalTempDir {
    _inner: TempDir,
    path: PathBuf,
}

impl CanonicalTempDir {
    pub fn new() -> std::io::Result<Self> {
        let inner = TempDir::new()?;
        let path = inner.path().canonicalize()?;
        Ok(Self {
            _inner: inner,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn arb_filename() -> impl Strategy<Value = String> {
    "[a-zA-Z 0-9.?=+]+".prop_filter("Not cur and parent dir", |s| s != "." && s != "..")
}

/// Arbitrary path strings as a user might type them: mixed separators,
/// duplicate slashes, `.` and `..` segments.
pub fn arb_archive_path_str() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        4 => arb_filename(),
        1 => Just(".".to_string()),
        1 => Just("..".to_string()),
        1 => Just(String::new()),
    ];
    (
        any::<bool>(),
        proptest::collection::vec((segment, prop_oneof![Just('/'), Just('\\')]), 0..8),
    )
        .prop_map(|(leading, parts)| {
            let mut out = String::new();
            if leading {
                out.push('/');
            }
            for (segment, sep) in parts {
                out.push_str(&segment);
                out.push(sep);
            }
            out
        })
}

prop_compose! {
    /// Relative file path of one to three segments. Directory segments are
    /// plain lowercase words and file names end in `.bin`, so no path of a
    /// generated tree is both a file and a directory.
    pub fn arb_tree_file_path()(
        dirs in proptest::collection::vec("[a-z]{1,6}", 0..3),
        name in "[a-z]{1,6}",
    ) -> String {
        let mut path = dirs.join("/");
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(&name);
        path.push_str(".bin");
        path
    }
}

prop_compose! {
    /// A small archive tree: relative file path to content.
    pub fn arb_tree()(
        files in proptest::collection::btree_map(
            arb_tree_file_path(),
            proptest::collection::vec(any::<u8>(), 0..512),
            0..12,
        )
    ) -> BTreeMap<String, Vec<u8>> {
        files
    }
}
