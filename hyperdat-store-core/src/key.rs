// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Archive keys.
//!
//! An archive is identified by a 32-byte public key. Peers replicating the
//! same archive find each other through a *discovery key* derived from it,
//! so the archive key itself is never announced on the network.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length in bytes of archive and discovery keys.
pub const KEY_LEN: usize = 32;

/// Domain separator mixed into the discovery key derivation.
const DISCOVERY_DOMAIN: &[u8] = b"hypercore";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyParseError {
    #[error("key must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

fn parse_key(s: &str) -> Result<[u8; KEY_LEN], KeyParseError> {
    if s.len() != KEY_LEN * 2 {
        return Err(KeyParseError::InvalidLength {
            expected: KEY_LEN * 2,
            actual: s.len(),
        });
    }
    let mut out = [0u8; KEY_LEN];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

/// Public key of an archive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveKey([u8; KEY_LEN]);

impl ArchiveKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Derive the key peers use to find each other for this archive.
    pub fn discovery_key(&self) -> DiscoveryKey {
        let mut hasher = Sha256::new();
        hasher.update(DISCOVERY_DOMAIN);
        hasher.update(self.0);
        DiscoveryKey(hasher.finalize().into())
    }
}

impl FromStr for ArchiveKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key(s).map(Self)
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveKey({self})")
    }
}

impl Serialize for ArchiveKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArchiveKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Key announced to the discovery network for an archive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveryKey([u8; KEY_LEN]);

impl DiscoveryKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl FromStr for DiscoveryKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key(s).map(Self)
    }
}

impl fmt::Display for DiscoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for DiscoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiscoveryKey({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "778f8d955175c92e4ced5e4f5563f69bfec0c86cc6f670352c457943666fe639";

    #[test]
    fn parse_and_display_roundtrip() {
        let key: ArchiveKey = KEY_HEX.parse().unwrap();
        assert_eq!(key.to_string(), KEY_HEX);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let key: ArchiveKey = KEY_HEX.to_uppercase().parse().unwrap();
        assert_eq!(key.to_string(), KEY_HEX);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = "abcd".parse::<ArchiveKey>().unwrap_err();
        assert_eq!(
            err,
            KeyParseError::InvalidLength {
                expected: 64,
                actual: 4
            }
        );
    }

    #[test]
    fn non_hex_is_rejected() {
        let bad = "z".repeat(64);
        assert!(matches!(
            bad.parse::<ArchiveKey>(),
            Err(KeyParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn invalid_hex_keeps_the_decoder_error() {
        let bad = format!("g{}", &KEY_HEX[1..]);
        assert_eq!(
            bad.parse::<ArchiveKey>().unwrap_err(),
            KeyParseError::InvalidHex(hex::FromHexError::InvalidHexCharacter { c: 'g', index: 0 })
        );
    }

    #[test]
    fn discovery_key_is_stable_and_distinct() {
        let key: ArchiveKey = KEY_HEX.parse().unwrap();
        let a = key.discovery_key();
        let b = key.discovery_key();
        assert_eq!(a, b);
        assert_ne!(a.as_bytes(), key.as_bytes());
    }
}
