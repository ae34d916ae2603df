//! Session state shared between the caller's actions and the transport's
//! event dispatch.
//!
//! The [`SessionState`] struct is wrapped in a `Mutex` inside the controller;
//! every mutation of the roster or the conversation logs happens under that
//! lock.

use tokio_util::sync::CancellationToken;

use orkiv_shared::{ConnectionStatus, Jid};

use crate::conversation::Conversations;
use crate::roster::RosterStore;

/// Central session state.
pub struct SessionState {
    /// Current connection lifecycle status.
    pub status: ConnectionStatus,

    /// Address of the account of the latest connect attempt.
    /// `None` until the first attempt.
    pub local_identity: Option<Jid>,

    /// Contacts and their live presences.
    /// Filled by the roster fetch, emptied at disconnect or failure.
    pub roster: RosterStore,

    /// Conversation history, kept for the lifetime of the process.
    pub conversations: Conversations,

    /// Incremented on every connect and disconnect; events and handshake
    /// results tagged with an older value are stale.
    pub generation: u64,

    /// Cancelled when the session ends: stops the connect handshake, the
    /// event dispatch, and any send still waiting on the transport.
    pub attempt: Option<CancellationToken>,
}

impl SessionState {
    /// Create a disconnected state with no contacts and no history.
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            local_identity: None,
            roster: RosterStore::new(),
            conversations: Conversations::new(),
            generation: 0,
            attempt: None,
        }
    }

    /// Whether `generation` still designates the current attempt.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Stop the current attempt's work and move to a new generation.
    pub fn retire_attempt(&mut self) {
        if let Some(token) = self.attempt.take() {
            token.cancel();
        }
        self.generation += 1;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
