//! The boundary between the session core and the wire protocol.
//!
//! Stream setup, authentication, and stanza encoding all live behind
//! [`Transport`]. Inbound traffic is pushed into the sink registered with
//! [`Transport::on_event`], from whatever task the implementation runs its
//! I/O on.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use orkiv_shared::{Credential, Jid, RosterSnapshot, Show, TransportEvent};

use crate::error::TransportError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Register the sink inbound events are delivered to. Replaces any
    /// previously registered sink.
    fn on_event(&self, sink: mpsc::Sender<TransportEvent>);

    /// Open the stream and authenticate as `jid`.
    async fn connect(
        &self,
        jid: &Jid,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Fetch the account's roster.
    async fn request_roster(&self) -> Result<RosterSnapshot, TransportError>;

    /// Broadcast our own presence.
    async fn send_presence(&self, show: Show) -> Result<(), TransportError>;

    /// Enqueue a chat message. Success means accepted locally, not delivered.
    async fn send_message(&self, to: &Jid, body: &str) -> Result<(), TransportError>;

    /// Close the stream, waiting at most `grace` for the server.
    async fn disconnect(&self, grace: Duration);
}
