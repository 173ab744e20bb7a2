// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Logical paths inside an archive.

use std::fmt;
use std::path::{Path, PathBuf};

/// An absolute, `/`-separated path inside an archive.
///
/// Always normalised: it starts with `/`, has no trailing separator (except
/// for the root itself) and contains no empty, `.` or `..` segments. `..`
/// is resolved lexically and never climbs above the root, so any string
/// converts into a valid path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchivePath(String);

impl ArchivePath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn new(path: &str) -> Self {
        Self::root().join(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Resolve `relative` against this path.
    ///
    /// A leading `/` in `relative` is ignored; the result is always below
    /// (or equal to) `self` unless `relative` contains `..` segments.
    pub fn join(&self, relative: &str) -> Self {
        let mut segments: Vec<&str> = self.segments().collect();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Self::root();
        }
        let mut out = String::with_capacity(relative.len() + self.0.len() + 1);
        for segment in segments {
            out.push('/');
            out.push_str(segment);
        }
        Self(out)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Map this path below a local directory.
    pub fn to_local(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        out.extend(self.segments());
        out
    }
}

impl Default for ArchivePath {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for ArchivePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArchivePath {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod unittests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("", "/")]
    #[case::root("/", "/")]
    #[case::relative("a/b", "/a/b")]
    #[case::trailing_slash("/a/b/", "/a/b")]
    #[case::double_slash("//a//b", "/a/b")]
    #[case::dot("/a/./b", "/a/b")]
    #[case::dotdot("/a/../b", "/b")]
    #[case::dotdot_above_root("/../../a", "/a")]
    #[case::backslash("a\\b", "/a/b")]
    fn normalises(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(ArchivePath::new(input).as_str(), expected);
    }

    #[test]
    fn join_child() {
        let dir = ArchivePath::new("/photos");
        assert_eq!(dir.join("cat.jpg").as_str(), "/photos/cat.jpg");
        assert_eq!(ArchivePath::root().join("cat.jpg").as_str(), "/cat.jpg");
    }

    #[test]
    fn parent_and_file_name() {
        let path = ArchivePath::new("/a/b/c.txt");
        assert_eq!(path.file_name(), Some("c.txt"));
        assert_eq!(path.parent(), Some(ArchivePath::new("/a/b")));
        assert_eq!(ArchivePath::new("/a").parent(), Some(ArchivePath::root()));
        assert_eq!(ArchivePath::root().parent(), None);
        assert_eq!(ArchivePath::root().file_name(), None);
    }

    #[test]
    fn to_local_maps_segments() {
        let local = ArchivePath::new("/b/c").to_local(Path::new("/tmp/out"));
        assert_eq!(local, PathBuf::from("/tmp/out/b/c"));
        assert_eq!(
            ArchivePath::root().to_local(Path::new("/tmp/out")),
            PathBuf::from("/tmp/out")
        );
    }
}
