//! Per-peer message history.
//!
//! A [`ConversationLog`] is append-only and hands out copies of its entries,
//! so nothing outside the session can rewrite history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use orkiv_shared::constants::{LOG_TIMESTAMP_FORMAT, ME_LABEL};
use orkiv_shared::Jid;

/// Who wrote a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Me,
    Peer(Jid),
}

/// A single line of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sender: Sender,
    pub body: String,
}

impl LogEntry {
    /// A message we sent.
    pub fn outbound(body: impl Into<String>) -> Self {
        Self::new(Sender::Me, body.into())
    }

    /// A message received from `from`; the resource is dropped.
    pub fn inbound(from: &Jid, body: impl Into<String>) -> Self {
        Self::new(Sender::Peer(from.bare()), body.into())
    }

    fn new(sender: Sender, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sender,
            body,
        }
    }

    /// `"Me"` or the sender's bare address.
    pub fn sender_label(&self) -> String {
        match &self.sender {
            Sender::Me => ME_LABEL.to_string(),
            Sender::Peer(jid) => jid.to_string(),
        }
    }

    /// The line as shown in a chat window: `(2024-05-01 09:30) Me: hi`.
    pub fn render(&self) -> String {
        format!(
            "({}) {}: {}",
            self.timestamp.format(LOG_TIMESTAMP_FORMAT),
            self.sender_label(),
            self.body
        )
    }
}

/// Ordered history with one peer.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    peer: Jid,
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    pub fn new(peer: Jid) -> Self {
        Self {
            peer: peer.bare(),
            entries: Vec::new(),
        }
    }

    pub fn peer(&self) -> &Jid {
        &self.peer
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Copy of every entry in arrival order.
    pub fn history(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All conversation logs of the process, keyed by bare peer address.
#[derive(Debug, Clone, Default)]
pub struct Conversations {
    logs: BTreeMap<Jid, ConversationLog>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// The log for `peer`, created empty on first use.
    pub fn get_or_create(&mut self, peer: &Jid) -> &mut ConversationLog {
        let bare = peer.bare();
        self.logs
            .entry(bare.clone())
            .or_insert_with(|| ConversationLog::new(bare))
    }

    pub fn append(&mut self, peer: &Jid, entry: LogEntry) {
        self.get_or_create(peer).append(entry);
    }

    pub fn get(&self, peer: &Jid) -> Option<&ConversationLog> {
        self.logs.get(&peer.bare())
    }

    /// History with `peer`; empty when no log exists yet.
    pub fn history(&self, peer: &Jid) -> Vec<LogEntry> {
        self.get(peer).map(ConversationLog::history).unwrap_or_default()
    }

    /// Peers with a log, sorted by address.
    pub fn peers(&self) -> Vec<Jid> {
        self.logs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}
