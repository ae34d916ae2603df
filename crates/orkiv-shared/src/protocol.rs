//! Vocabulary exchanged across the transport boundary.
//!
//! Inbound events keep addresses and type names as raw strings: the
//! transport hands over what arrived on the wire and the session core
//! decides what is well formed.

use serde::{Deserialize, Serialize};

use crate::identity::Jid;

/// Everything a transport can report to the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransportEvent {
    /// A message stanza arrived
    Message(MessageEvent),

    /// A presence stanza arrived
    Presence(PresenceEvent),

    /// The established stream went away
    StreamClosed { reason: String },
}

/// An inbound message stanza.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Full sender address as received
    pub from: String,
    /// Stanza type attribute (`chat`, `normal`, `groupchat`, ...)
    pub kind: String,
    pub body: String,
}

/// Message stanza types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Normal,
    Groupchat,
    Headline,
    Error,
}

impl MessageKind {
    /// A missing type attribute means `normal`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim() {
            "" | "normal" => Some(Self::Normal),
            "chat" => Some(Self::Chat),
            "groupchat" => Some(Self::Groupchat),
            "headline" => Some(Self::Headline),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether the kind belongs in a one-to-one conversation.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Chat | Self::Normal)
    }
}

/// An inbound presence stanza.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Sender address as received, possibly carrying the resource
    pub from: String,
    /// Resource, when not already part of `from`
    pub resource: Option<String>,
    pub show: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i8>,
}

impl PresenceEvent {
    /// A presence with neither show nor status, or an explicit
    /// `unavailable`, takes the resource offline.
    pub fn is_unavailable(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.show) && blank(&self.status) {
            return true;
        }
        matches!(
            self.show.as_deref().map(str::trim),
            Some("unavailable") | Some("offline")
        )
    }
}

/// Subscription state of a roster item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    None,
    To,
    From,
    Both,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::To => "to",
            Self::From => "from",
            Self::Both => "both",
        }
    }
}

/// One contact in the account's server-side roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterItem {
    pub jid: Jid,
    pub name: Option<String>,
    pub subscription: Subscription,
}

impl RosterItem {
    pub fn new(jid: Jid, name: Option<&str>) -> Self {
        Self {
            jid,
            name: name.map(str::to_string),
            subscription: Subscription::Both,
        }
    }
}

/// The roster as fetched once after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub items: Vec<RosterItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind() {
        assert_eq!(MessageKind::parse(""), Some(MessageKind::Normal));
        assert!(MessageKind::parse("chat").unwrap().is_direct());
        assert!(!MessageKind::parse("groupchat").unwrap().is_direct());
        assert_eq!(MessageKind::parse("bogus"), None);
    }

    #[test]
    fn test_presence_unavailable() {
        let empty = PresenceEvent {
            from: "a@b".into(),
            resource: Some("desk".into()),
            ..Default::default()
        };
        assert!(empty.is_unavailable());

        let away = PresenceEvent {
            show: Some("away".into()),
            ..empty.clone()
        };
        assert!(!away.is_unavailable());

        let status_only = PresenceEvent {
            status: Some("lunch".into()),
            ..empty.clone()
        };
        assert!(!status_only.is_unavailable());

        let gone = PresenceEvent {
            show: Some("unavailable".into()),
            status: Some("bye".into()),
            ..empty
        };
        assert!(gone.is_unavailable());
    }
}
