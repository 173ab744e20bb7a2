// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Lifecycle notifications.
//!
//! Events are a side effect of what the client does; nothing inside the
//! client reacts to them.

use hyperdat_store_core::ArchivePath;
use tokio::sync::broadcast;

use crate::state::ClientState;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    StateChanged { from: ClientState, to: ClientState },
    FileDownloaded { path: ArchivePath, bytes: u64 },
    PeersChanged(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // Nobody listening is the common case.
        let _ = self.sender.send(event);
    }
}
