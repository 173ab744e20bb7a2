// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Archive addresses for hyperdat.
//!
//! Parses `scheme://key-or-name/path` addresses and turns names into archive
//! keys through an injected [`NameResolver`].

pub mod address;
pub mod cache;
pub mod error;
pub mod resolver;

pub use address::{ArchiveAddress, KeyOrName, ResolvedAddress};
pub use cache::CachedNameResolver;
pub use error::AddressError;
pub use resolver::{AddressResolver, NameResolver, StaticNameResolver};
