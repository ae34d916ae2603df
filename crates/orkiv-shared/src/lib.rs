//! Types shared between the session core and its presentation layers:
//! peer addresses, presence values, and the transport event vocabulary.

pub mod constants;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use error::{JidError, ShowParseError};
pub use identity::{Credential, Jid};
pub use protocol::{
    MessageEvent, MessageKind, PresenceEvent, RosterItem, RosterSnapshot, Subscription,
    TransportEvent,
};
pub use types::{ConnectionStatus, EffectivePresence, PresenceRecord, Show};
