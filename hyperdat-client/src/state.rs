// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Client lifecycle.
//!
//! ```text
//! uninitialized -> initializing -> ready -> closing -> closed
//! ```
//!
//! Every arrow is taken at most once. A transition is checked and applied
//! under one lock acquisition before the caller yields, so two concurrent
//! callers can never both pass the same guard.

use std::sync::{Mutex, PoisonError};

use derive_more::Display;
use tracing::debug;

use crate::error::ClientError;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    #[display("uninitialized")]
    Uninitialized,
    #[display("initializing")]
    Initializing,
    #[display("ready")]
    Ready,
    #[display("closing")]
    Closing,
    #[display("closed")]
    Closed,
}

#[derive(Debug)]
pub(crate) struct StateMachine {
    current: Mutex<ClientState>,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(ClientState::Uninitialized),
        }
    }

    pub(crate) fn get(&self) -> ClientState {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `from` to `to`, failing with
    /// [`ClientError::StateViolation`] if the client is anywhere else.
    pub(crate) fn transition(
        &self,
        operation: &'static str,
        from: ClientState,
        to: ClientState,
    ) -> Result<(), ClientError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != from {
            return Err(ClientError::StateViolation {
                operation,
                state: *current,
            });
        }
        *current = to;
        debug!(operation, %from, %to, "client state transition");
        Ok(())
    }

    /// Fail unless the client is in `expected`.
    pub(crate) fn require(
        &self,
        operation: &'static str,
        expected: ClientState,
    ) -> Result<(), ClientError> {
        match self.get() {
            state if state == expected => Ok(()),
            state => Err(ClientError::StateViolation { operation, state }),
        }
    }
}
