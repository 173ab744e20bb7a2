// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Swarm membership for hyperdat.
//!
//! The discovery transport is an external service reached through the
//! [`DiscoveryTransport`] / [`TransportSession`] contract. [`SwarmSession`]
//! sits on top of it: it keeps the live peer count, offers the optional
//! "first peer" bring-up gate and enforces the two-phase teardown.
//!
//! # Key Modules
//!
//! - `transport` - the transport contract and peer ids
//! - `session` - [`SwarmSession`]
//! - `loopback` - an in-process transport for tests and offline use

pub mod config;
pub mod error;
pub mod loopback;
pub mod session;
pub mod transport;

pub use config::{SwarmConfig, TransportKind};
pub use error::SwarmError;
pub use loopback::{LoopbackSession, LoopbackTransport, TeardownStep};
pub use session::SwarmSession;
pub use transport::{ConnectionEvent, DiscoveryTransport, PeerId, TransportSession};
