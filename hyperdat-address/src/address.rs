// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Archive address syntax.
//!
//! ```text
//! scheme://key-or-name[+version][/path]
//! scheme://key-or-name[/path][+version]
//! ```
//!
//! The version may follow the key segment or close the whole address. A key
//! segment containing a `.` is a human-readable name that has to be looked
//! up; anything else must be a hex-encoded archive key.

use std::fmt;
use std::str::FromStr;

use hyperdat_store_core::{ArchiveKey, ArchivePath};

use crate::error::AddressError;

/// The key segment of an address, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyOrName {
    Key(ArchiveKey),
    Name(String),
}

impl fmt::Display for KeyOrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrName::Key(key) => fmt::Display::fmt(key, f),
            KeyOrName::Name(name) => f.write_str(name),
        }
    }
}

/// A parsed, not yet resolved, archive address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveAddress {
    pub protocol: String,
    pub key: KeyOrName,
    pub path: ArchivePath,
    pub version: Option<u64>,
}

impl ArchiveAddress {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let (protocol, rest) = input
            .trim_start()
            .split_once("://")
            .ok_or_else(|| AddressError::parse(input, "expected scheme://key-or-name/path"))?;
        if !is_valid_scheme(protocol) {
            return Err(AddressError::parse(input, "invalid scheme"));
        }

        let (host, mut path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest.trim_end(), ""),
        };
        let (host, mut version) = match host.split_once('+') {
            Some((host, version)) => (host, Some(parse_version(input, version)?)),
            None => (host, None),
        };
        if host.is_empty() {
            return Err(AddressError::parse(input, "missing key or name"));
        }
        if version.is_none() && ends_with_version(path) {
            if let Some((prefix, suffix)) = path.rsplit_once('+') {
                version = Some(parse_version(input, suffix)?);
                path = prefix;
            }
        }

        let key = if host.contains('.') {
            let name = host.trim_end_matches('.');
            if name.is_empty() {
                return Err(AddressError::parse(input, "empty name"));
            }
            KeyOrName::Name(name.to_ascii_lowercase())
        } else {
            let key = host
                .parse::<ArchiveKey>()
                .map_err(|e| AddressError::parse(input, format!("invalid key: {e}")))?;
            KeyOrName::Key(key)
        };

        Ok(Self {
            protocol: protocol.to_ascii_lowercase(),
            key,
            path: ArchivePath::new(path),
            version,
        })
    }

    /// Whether the key segment needs a name lookup.
    pub fn is_name(&self) -> bool {
        matches!(self.key, KeyOrName::Name(_))
    }

    /// Attach a resolved key.
    pub fn with_key(self, key: ArchiveKey) -> ResolvedAddress {
        ResolvedAddress {
            protocol: self.protocol,
            key,
            path: self.path,
            version: self.version,
        }
    }
}

impl FromStr for ArchiveAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ArchiveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_address(f, &self.protocol, &self.key, self.version, &self.path)
    }
}

/// An address whose key is a binary archive key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub protocol: String,
    pub key: ArchiveKey,
    pub path: ArchivePath,
    /// Version named by the address. Informational only: replicas are
    /// opened at their latest version regardless.
    pub version: Option<u64>,
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_address(f, &self.protocol, &self.key, self.version, &self.path)
    }
}

fn write_address(
    f: &mut fmt::Formatter<'_>,
    protocol: &str,
    key: &dyn fmt::Display,
    version: Option<u64>,
    path: &ArchivePath,
) -> fmt::Result {
    write!(f, "{protocol}://{key}")?;
    if let Some(version) = version {
        write!(f, "+{version}")?;
    }
    if !path.is_root() {
        write!(f, "{path}")?;
        // Keep a trailing `+N` in the last segment from reading as a version.
        if version.is_none() && ends_with_version(path.as_str()) {
            f.write_str("/")?;
        }
    }
    Ok(())
}

fn ends_with_version(path: &str) -> bool {
    path.rsplit_once('+').is_some_and(|(_, suffix)| {
        !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())
    })
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn parse_version(input: &str, version: &str) -> Result<u64, AddressError> {
    version
        .parse()
        .map_err(|_| AddressError::parse(input, format!("invalid version {version:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const KEY: &str = "6161616161616161616161616161616161616161616161616161616161616161";

    fn key() -> ArchiveKey {
        KEY.parse().unwrap()
    }

    #[test]
    fn parses_key_address_without_path() {
        let address = ArchiveAddress::parse(&format!("dat://{KEY}")).unwrap();
        assert_eq!(address.protocol, "dat");
        assert_eq!(address.key, KeyOrName::Key(key()));
        assert!(address.path.is_root());
        assert_eq!(address.version, None);
    }

    #[rstest]
    #[case::version_on_key(format!("dat://{KEY}+12/docs/readme.md"), "/docs/readme.md", Some(12))]
    #[case::version_at_end(format!("dat://{KEY}/docs/readme.md+12"), "/docs/readme.md", Some(12))]
    #[case::trailing_slash(format!("dat://{KEY}/docs/"), "/docs", None)]
    #[case::plus_in_name(format!("dat://{KEY}/a+b"), "/a+b", None)]
    #[case::root_version(format!("DAT://{KEY}+3"), "/", Some(3))]
    #[case::space_in_last_segment(format!("dat://{KEY}/ /"), "/ ", None)]
    #[case::surrounding_whitespace(format!("  dat://{KEY}+2 "), "/", Some(2))]
    fn parses_path_and_version(
        #[case] input: String,
        #[case] path: &str,
        #[case] version: Option<u64>,
    ) {
        let address = ArchiveAddress::parse(&input).unwrap();
        assert_eq!(address.protocol, "dat");
        assert_eq!(address.path.as_str(), path);
        assert_eq!(address.version, version);
    }

    #[test]
    fn dotted_key_segment_is_a_name() {
        let address = ArchiveAddress::parse("dat://Example.COM./site").unwrap();
        assert_eq!(address.key, KeyOrName::Name("example.com".to_string()));
        assert!(address.is_name());
        assert_eq!(address.path.as_str(), "/site");
    }

    #[rstest]
    #[case::no_scheme(KEY.to_string())]
    #[case::empty_scheme(format!("://{KEY}"))]
    #[case::bad_scheme(format!("1dat://{KEY}"))]
    #[case::no_host("dat:///path".to_string())]
    #[case::short_key("dat://abcd".to_string())]
    #[case::bad_version(format!("dat://{KEY}+x/a"))]
    #[case::empty("".to_string())]
    #[case::lone_dot("dat://./x".to_string())]
    #[case::only_dots("dat://.../x".to_string())]
    fn rejects_malformed_addresses(#[case] input: String) {
        assert!(matches!(
            ArchiveAddress::parse(&input),
            Err(AddressError::Parse { .. })
        ));
    }

    #[test]
    fn display_uses_canonical_form() {
        let address = ArchiveAddress::parse(&format!("dat://{KEY}/x//y/+4")).unwrap();
        assert_eq!(address.to_string(), format!("dat://{KEY}+4/x/y"));
    }

    #[rstest]
    #[case::trailing_space(format!("dat://{KEY}/docs /"))]
    #[case::plus_digits_segment(format!("dat://{KEY}/a+1/"))]
    #[case::plus_digits_with_version(format!("dat://{KEY}+7/a+1"))]
    fn display_reparses_to_the_same_address(#[case] input: String) {
        let first = ArchiveAddress::parse(&input).unwrap();
        let again = ArchiveAddress::parse(&first.to_string()).unwrap();
        assert_eq!(first, again);
    }

    proptest! {
        #[test]
        fn proptest_parse_display_is_stable(
            raw_path in hyperdat_utils_test::arb_archive_path_str(),
            version in proptest::option::of(any::<u64>()),
        ) {
            let mut input = format!("dat://{KEY}");
            if let Some(version) = version {
                input.push_str(&format!("+{version}"));
            }
            input.push('/');
            input.push_str(&raw_path);

            let first = ArchiveAddress::parse(&input).unwrap();
            let again = ArchiveAddress::parse(&first.to_string()).unwrap();
            prop_assert_eq!(&first, &again);
            prop_assert_eq!(first.version, version.or(again.version));
        }
    }
}
