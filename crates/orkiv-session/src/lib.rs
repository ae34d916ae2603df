//! Messaging-session core: connection lifecycle, roster and presence
//! tracking, and per-peer conversation history over a pluggable transport.

pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod loopback;
pub mod roster;
pub mod state;
pub mod transport;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use conversation::{ConversationLog, Conversations, LogEntry, Sender};
pub use error::{ConnectError, SendError, TransportError};
pub use events::{EventHub, SessionEvent};
pub use loopback::LoopbackTransport;
pub use roster::{ContactEntry, ContactView, PresenceUpdate, RosterStore};
pub use state::SessionState;
pub use transport::Transport;
