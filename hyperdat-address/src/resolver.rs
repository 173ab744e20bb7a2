// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use hyperdat_store_core::ArchiveKey;
use tracing::debug;

use crate::address::{ArchiveAddress, KeyOrName, ResolvedAddress};
use crate::error::AddressError;

/// Looks up the archive key published under a human-readable name.
pub trait NameResolver: Send + Sync + 'static {
    /// Resolve `name`. With `bypass_cache` set, implementations that cache
    /// answers must perform a fresh lookup.
    fn resolve_name(
        &self,
        name: &str,
        bypass_cache: bool,
    ) -> impl Future<Output = Result<ArchiveKey, AddressError>> + Send;
}

impl<T: NameResolver> NameResolver for Arc<T> {
    fn resolve_name(
        &self,
        name: &str,
        bypass_cache: bool,
    ) -> impl Future<Output = Result<ArchiveKey, AddressError>> + Send {
        (**self).resolve_name(name, bypass_cache)
    }
}

/// Table-backed resolver. Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticNameResolver {
    names: HashMap<String, ArchiveKey>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str, key: ArchiveKey) -> Self {
        self.insert(name, key);
        self
    }

    pub fn insert(&mut self, name: &str, key: ArchiveKey) {
        self.names.insert(name.to_ascii_lowercase(), key);
    }
}

impl NameResolver for StaticNameResolver {
    async fn resolve_name(
        &self,
        name: &str,
        _bypass_cache: bool,
    ) -> Result<ArchiveKey, AddressError> {
        self.names
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| AddressError::name_resolution(name, "no record for name"))
    }
}

/// Turns address strings into [`ResolvedAddress`]es, using an injected
/// [`NameResolver`] for names.
#[derive(Debug, Clone)]
pub struct AddressResolver<N> {
    names: N,
}

impl<N: NameResolver> AddressResolver<N> {
    pub fn new(names: N) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &N {
        &self.names
    }

    pub async fn resolve(&self, address: &str) -> Result<ResolvedAddress, AddressError> {
        let parsed = ArchiveAddress::parse(address)?;
        self.resolve_parsed(parsed).await
    }

    pub async fn resolve_parsed(
        &self,
        address: ArchiveAddress,
    ) -> Result<ResolvedAddress, AddressError> {
        let key = match &address.key {
            KeyOrName::Key(key) => *key,
            KeyOrName::Name(name) => {
                let key = self.names.resolve_name(name, true).await?;
                debug!(name = %name, key = %key, "resolved archive name");
                key
            }
        };
        Ok(address.with_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: &str = "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f";

    fn key() -> ArchiveKey {
        KEY.parse().unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn hex_key_is_used_verbatim() {
        let resolver = AddressResolver::new(StaticNameResolver::new());
        let resolved = resolver.resolve(&format!("dat://{KEY}/a/b")).await.unwrap();
        assert_eq!(resolved.key, key());
        assert_eq!(resolved.path.as_str(), "/a/b");
    }

    #[test_log::test(tokio::test)]
    async fn names_go_through_the_name_resolver() {
        let resolver =
            AddressResolver::new(StaticNameResolver::new().with_name("Example.com", key()));
        let resolved = resolver.resolve("dat://example.COM+2/x").await.unwrap();
        assert_eq!(resolved.key, key());
        assert_eq!(resolved.version, Some(2));
    }

    #[test_log::test(tokio::test)]
    async fn unknown_name_is_a_resolution_error() {
        let resolver = AddressResolver::new(StaticNameResolver::new());
        let err = resolver.resolve("dat://missing.example").await.unwrap_err();
        assert!(matches!(
            err,
            AddressError::NameResolution { name, .. } if name == "missing.example"
        ));
    }

    #[test_log::test(tokio::test)]
    async fn parse_errors_skip_name_lookup() {
        let resolver = AddressResolver::new(StaticNameResolver::new());
        let err = resolver.resolve("not an address").await.unwrap_err();
        assert!(matches!(err, AddressError::Parse { .. }));
    }

    #[test]
    fn proptest_resolve_is_deterministic() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let resolver =
            AddressResolver::new(StaticNameResolver::new().with_name("site.example", key()));
        proptest!(|(raw_path in hyperdat_utils_test::arb_archive_path_str(),
                    use_name in any::<bool>(),
                    version in proptest::option::of(0u64..1000))| {
            let host = if use_name { "site.example" } else { KEY };
            let version = version.map(|v| format!("+{v}")).unwrap_or_default();
            let input = format!("dat://{host}{version}/{raw_path}");
            rt.block_on(async {
                let first = resolver.resolve(&input).await.unwrap();
                let second = resolver.resolve(&input).await.unwrap();
                prop_assert_eq!(&first.key, &key());
                prop_assert_eq!(first, second);
                Ok(())
            })?;
        });
    }
}
