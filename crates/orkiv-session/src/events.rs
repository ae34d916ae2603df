use serde::Serialize;
use tokio::sync::broadcast;

use orkiv_shared::{ConnectionStatus, EffectivePresence, Jid};

use crate::conversation::LogEntry;

pub const EVENT_STATUS_CHANGED: &str = "status-changed";
pub const EVENT_ROSTER_REPLACED: &str = "roster-replaced";
pub const EVENT_PRESENCE_CHANGED: &str = "presence-changed";
pub const EVENT_MESSAGE_APPENDED: &str = "message-appended";

/// State changes published to presentation layers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    StatusChanged {
        status: ConnectionStatus,
    },
    RosterReplaced {
        contacts: usize,
    },
    PresenceChanged {
        peer: Jid,
        presence: EffectivePresence,
    },
    MessageAppended {
        peer: Jid,
        entry: LogEntry,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => EVENT_STATUS_CHANGED,
            Self::RosterReplaced { .. } => EVENT_ROSTER_REPLACED,
            Self::PresenceChanged { .. } => EVENT_PRESENCE_CHANGED,
            Self::MessageAppended { .. } => EVENT_MESSAGE_APPENDED,
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        let name = event.name();
        // Nobody listening is not an error
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "No subscribers for session event");
        }
    }
}
