// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Time-bounded cache in front of a [`NameResolver`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use hyperdat_store_core::ArchiveKey;
use tracing::trace;

use crate::error::AddressError;
use crate::resolver::NameResolver;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    key: ArchiveKey,
    expires: Instant,
}

/// Caches successful answers of the wrapped resolver for `ttl`.
///
/// Failures are never cached. A lookup with `bypass_cache` set always asks
/// the wrapped resolver and refreshes the entry.
#[derive(Debug)]
pub struct CachedNameResolver<N> {
    inner: N,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<N: NameResolver> CachedNameResolver<N> {
    pub fn new(inner: N) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: N, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    pub fn invalidate(&self, name: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_ascii_lowercase());
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, name: &str) -> Option<ArchiveKey> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.key),
            Some(_) => {
                entries.remove(name);
                None
            }
            None => None,
        }
    }

    fn store(&self, name: String, key: ArchiveKey) {
        let entry = CacheEntry {
            key,
            expires: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, entry);
    }
}

impl<N: NameResolver> NameResolver for CachedNameResolver<N> {
    async fn resolve_name(
        &self,
        name: &str,
        bypass_cache: bool,
    ) -> Result<ArchiveKey, AddressError> {
        let normalised = name.to_ascii_lowercase();
        if !bypass_cache {
            if let Some(key) = self.cached(&normalised) {
                trace!(name = %name, "name cache hit");
                return Ok(key);
            }
        }
        let key = self.inner.resolve_name(name, bypass_cache).await?;
        self.store(normalised, key);
        Ok(key)
    }
}
