use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ShowParseError;

/// Lifecycle of the single session a process holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// The last attempt or the established stream failed.
    Failed(String),
}

impl ConnectionStatus {
    /// Whether a connect attempt is in flight or established.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Declared availability of a peer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Show {
    Available,
    Chat,
    Away,
    Xa,
    Dnd,
    Offline,
}

impl Show {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Chat => "chat",
            Self::Away => "away",
            Self::Xa => "xa",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Show {
    type Err = ShowParseError;

    /// Accepts the protocol `<show/>` values. An empty show means plain
    /// availability; `unavailable` is the presence type for going offline.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "available" => Ok(Self::Available),
            "chat" => Ok(Self::Chat),
            "away" => Ok(Self::Away),
            "xa" => Ok(Self::Xa),
            "dnd" => Ok(Self::Dnd),
            "unavailable" | "offline" => Ok(Self::Offline),
            other => Err(ShowParseError(other.to_string())),
        }
    }
}

/// Live presence of one connected resource of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub resource: String,
    pub status_text: String,
    pub show: Show,
    pub priority: i8,
    pub received_at: DateTime<Utc>,
}

/// The single presence shown for a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePresence {
    pub show: Show,
    pub status_text: String,
}

impl EffectivePresence {
    pub fn offline() -> Self {
        Self {
            show: Show::Offline,
            status_text: String::new(),
        }
    }
}

impl From<&PresenceRecord> for EffectivePresence {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            show: record.show,
            status_text: record.status_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_parse() {
        assert_eq!("".parse::<Show>().unwrap(), Show::Available);
        assert_eq!("AWAY".parse::<Show>().unwrap(), Show::Away);
        assert_eq!("unavailable".parse::<Show>().unwrap(), Show::Offline);
        assert!("sleeping".parse::<Show>().is_err());
    }

    #[test]
    fn test_status_activity() {
        assert!(ConnectionStatus::Connecting.is_active());
        assert!(ConnectionStatus::Connected.is_active());
        assert!(!ConnectionStatus::Disconnected.is_active());
        assert!(!ConnectionStatus::Failed("boom".into()).is_active());
    }
}
