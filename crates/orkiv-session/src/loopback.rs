//! In-memory transport.
//!
//! Plays the server side of a session without any network: it checks
//! credentials against a table of accounts, serves a canned roster,
//! broadcasts canned contact presences after our own presence goes out, and
//! can echo outbound messages back as inbound chat. Switches make connect
//! hang or fail, sends bounce or stall, and close hang, and
//! [`LoopbackTransport::inject`] pushes arbitrary inbound events.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use orkiv_shared::{
    Credential, Jid, MessageEvent, PresenceEvent, RosterItem, RosterSnapshot, Show,
    TransportEvent,
};

use crate::error::TransportError;
use crate::transport::Transport;

/// Delay before an echoed message comes back.
const ECHO_DELAY: Duration = Duration::from_millis(20);

/// Resource the loopback "server" uses for contacts it speaks for.
const LOOPBACK_RESOURCE: &str = "loopback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectMode {
    Normal,
    Hang,
    Unreachable,
}

#[derive(Debug)]
struct Inner {
    accounts: HashMap<Jid, String>,
    roster: RosterSnapshot,
    contact_presences: Vec<PresenceEvent>,
    echo: bool,
    connect_mode: ConnectMode,
    reject_sends: bool,
    stall_sends: bool,
    hang_disconnect: bool,
    sink: Option<mpsc::Sender<TransportEvent>>,
    connected: bool,
    announced: bool,
    roster_requests: usize,
    sent_messages: Vec<(Jid, String)>,
    sent_presences: Vec<Show>,
    disconnects: usize,
}

/// A transport that talks to itself.
#[derive(Debug)]
pub struct LoopbackTransport {
    inner: Mutex<Inner>,
}

impl LoopbackTransport {
    /// Accepts any credential until an account is registered.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                accounts: HashMap::new(),
                roster: RosterSnapshot::default(),
                contact_presences: Vec::new(),
                echo: false,
                connect_mode: ConnectMode::Normal,
                reject_sends: false,
                stall_sends: false,
                hang_disconnect: false,
                sink: None,
                connected: false,
                announced: false,
                roster_requests: 0,
                sent_messages: Vec::new(),
                sent_presences: Vec::new(),
                disconnects: 0,
            }),
        }
    }

    /// Only registered accounts may log in from now on.
    pub fn with_account(self, jid: &Jid, password: &str) -> Self {
        self.lock().accounts.insert(jid.bare(), password.to_string());
        self
    }

    /// Add a roster contact.
    pub fn with_contact(self, jid: &Jid, name: Option<&str>) -> Self {
        self.lock().roster.items.push(RosterItem::new(jid.bare(), name));
        self
    }

    /// Have `jid/resource` announce a presence once we announce ours.
    pub fn with_contact_presence(self, jid: &Jid, resource: &str, show: Show, priority: i8) -> Self {
        self.lock().contact_presences.push(PresenceEvent {
            from: jid.bare().to_string(),
            resource: Some(resource.to_string()),
            show: Some(show.as_str().to_string()),
            status: None,
            priority: Some(priority),
        });
        self
    }

    /// Bounce every sent message back from its recipient.
    pub fn with_echo(self, echo: bool) -> Self {
        self.lock().echo = echo;
        self
    }

    /// Make `connect` never complete.
    pub fn hanging(self) -> Self {
        self.lock().connect_mode = ConnectMode::Hang;
        self
    }

    /// Make `connect` fail with a network error.
    pub fn unreachable(self) -> Self {
        self.lock().connect_mode = ConnectMode::Unreachable;
        self
    }

    /// Make `disconnect` never complete once the stream is marked closed.
    pub fn hanging_disconnect(self) -> Self {
        self.lock().hang_disconnect = true;
        self
    }

    /// Refuse outbound messages.
    pub fn set_reject_sends(&self, reject: bool) {
        self.lock().reject_sends = reject;
    }

    /// Leave outbound messages and presences pending forever.
    pub fn set_stall_sends(&self, stall: bool) {
        self.lock().stall_sends = stall;
    }

    /// Deliver `event` to the registered sink. Returns `false` when no sink
    /// is registered or the receiving side is gone.
    pub async fn inject(&self, event: TransportEvent) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Simulate the server dropping an established stream.
    pub async fn drop_stream(&self, reason: &str) -> bool {
        self.lock().connected = false;
        self.inject(TransportEvent::StreamClosed {
            reason: reason.to_string(),
        })
        .await
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn roster_requests(&self) -> usize {
        self.lock().roster_requests
    }

    pub fn sent_messages(&self) -> Vec<(Jid, String)> {
        self.lock().sent_messages.clone()
    }

    pub fn sent_presences(&self) -> Vec<Show> {
        self.lock().sent_presences.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn stall_if_requested(&self) {
        let stall = self.lock().stall_sends;
        if stall {
            debug!("Loopback send stalled");
            std::future::pending::<()>().await;
        }
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.lock().connected {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn on_event(&self, sink: mpsc::Sender<TransportEvent>) {
        self.lock().sink = Some(sink);
    }

    async fn connect(
        &self,
        jid: &Jid,
        credential: &Credential,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let mode = {
            let inner = self.lock();
            if inner.connect_mode == ConnectMode::Normal && !inner.accounts.is_empty() {
                match inner.accounts.get(&jid.bare()) {
                    Some(password) if password == credential.expose() => {}
                    _ => return Err(TransportError::Auth("not-authorized".to_string())),
                }
            }
            inner.connect_mode
        };

        match mode {
            ConnectMode::Normal => {
                self.lock().connected = true;
                info!(jid = %jid, "Loopback stream opened");
                Ok(())
            }
            ConnectMode::Hang => {
                debug!(jid = %jid, "Loopback connect hanging");
                std::future::pending::<()>().await;
                Ok(())
            }
            ConnectMode::Unreachable => {
                Err(TransportError::Network("connection refused".to_string()))
            }
        }
    }

    async fn request_roster(&self) -> Result<RosterSnapshot, TransportError> {
        self.ensure_connected()?;
        let mut inner = self.lock();
        inner.roster_requests += 1;
        Ok(inner.roster.clone())
    }

    async fn send_presence(&self, show: Show) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.stall_if_requested().await;
        let (first, broadcasts, sink) = {
            let mut inner = self.lock();
            inner.sent_presences.push(show);
            let first = !inner.announced;
            inner.announced = true;
            (
                first,
                inner.contact_presences.clone(),
                inner.sink.clone(),
            )
        };

        // Contacts answer the initial presence with their own
        if let (true, Some(sink)) = (first, sink) {
            for presence in broadcasts {
                if sink.send(TransportEvent::Presence(presence)).await.is_err() {
                    break;
                }
            }
        }
        Ok(())
    }

    async fn send_message(&self, to: &Jid, body: &str) -> Result<(), TransportError> {
        self.stall_if_requested().await;
        let sink = {
            let mut inner = self.lock();
            if !inner.connected {
                return Err(TransportError::Closed);
            }
            if inner.reject_sends {
                return Err(TransportError::Rejected("service-unavailable".to_string()));
            }
            inner.sent_messages.push((to.clone(), body.to_string()));
            if inner.echo {
                inner.sink.clone()
            } else {
                None
            }
        };

        if let Some(sink) = sink {
            let event = TransportEvent::Message(MessageEvent {
                from: format!("{}/{}", to.bare(), LOOPBACK_RESOURCE),
                kind: "chat".to_string(),
                body: body.to_string(),
            });
            tokio::spawn(async move {
                tokio::time::sleep(ECHO_DELAY).await;
                let _ = sink.send(event).await;
            });
        }
        Ok(())
    }

    async fn disconnect(&self, _grace: Duration) {
        let hang = {
            let mut inner = self.lock();
            inner.connected = false;
            inner.sink = None;
            inner.announced = false;
            inner.disconnects += 1;
            inner.hang_disconnect
        };
        if hang {
            debug!("Loopback close hanging");
            std::future::pending::<()>().await;
        }
        debug!("Loopback stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jid(s: &str) -> Jid {
        Jid::parse(s).unwrap()
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_open_accepts_anyone() {
        let transport = LoopbackTransport::new();
        transport
            .connect(&jid("a@example.org"), &Credential::new("x"), TIMEOUT)
            .await
            .unwrap();
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_registered_accounts_checked() {
        let me = jid("me@example.org");
        let transport = LoopbackTransport::new().with_account(&me, "secret");

        let err = transport
            .connect(&me, &Credential::new("wrong"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Auth(_)));

        transport
            .connect(&me.with_resource("desk").unwrap(), &Credential::new("secret"), TIMEOUT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_requests_need_a_stream() {
        let transport = LoopbackTransport::new();
        assert_eq!(transport.request_roster().await, Err(TransportError::Closed));
        assert_eq!(
            transport.send_message(&jid("b@example.org"), "hi").await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_echo_comes_back_from_recipient() {
        let transport = LoopbackTransport::new().with_echo(true);
        let (tx, mut rx) = mpsc::channel(4);
        transport.on_event(tx);
        transport
            .connect(&jid("me@example.org"), &Credential::new("x"), TIMEOUT)
            .await
            .unwrap();

        transport.send_message(&jid("bob@example.org"), "ping").await.unwrap();

        match rx.recv().await.unwrap() {
            TransportEvent::Message(msg) => {
                assert_eq!(msg.from, "bob@example.org/loopback");
                assert_eq!(msg.body, "ping");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(transport.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_drops_sink() {
        let transport = LoopbackTransport::new();
        let (tx, mut rx) = mpsc::channel(4);
        transport.on_event(tx);
        transport.disconnect(TIMEOUT).await;

        assert!(rx.recv().await.is_none());
        assert!(!transport.inject(TransportEvent::StreamClosed { reason: "x".into() }).await);
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_stall_and_hang_switches() {
        let transport = LoopbackTransport::new().hanging_disconnect();
        transport
            .connect(&jid("me@example.org"), &Credential::new("x"), TIMEOUT)
            .await
            .unwrap();
        transport.set_stall_sends(true);

        let short = Duration::from_millis(50);
        let bob = jid("bob@example.org");
        assert!(tokio::time::timeout(short, transport.send_message(&bob, "hi"))
            .await
            .is_err());
        assert!(tokio::time::timeout(short, transport.send_presence(Show::Away))
            .await
            .is_err());
        assert!(transport.sent_messages().is_empty());

        assert!(tokio::time::timeout(short, transport.disconnect(short))
            .await
            .is_err());
        assert!(!transport.is_connected());
        assert_eq!(transport.disconnect_count(), 1);
    }
}
