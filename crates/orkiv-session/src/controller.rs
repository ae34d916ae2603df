//! Session lifecycle and event dispatch.
//!
//! [`SessionController`] owns the session state behind a mutex and drives a
//! [`Transport`]. Caller actions (connect, send, disconnect) run on the
//! caller's task; inbound transport events are applied by a dispatch task
//! spawned for each connect attempt. Both paths mutate the roster and the
//! conversation logs only while holding the state lock, and the lock is
//! never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use orkiv_shared::constants::DEFAULT_PRIORITY;
use orkiv_shared::{
    ConnectionStatus, Credential, EffectivePresence, Jid, MessageEvent, MessageKind,
    PresenceEvent, PresenceRecord, RosterSnapshot, Show, TransportEvent,
};

use crate::config::SessionConfig;
use crate::conversation::LogEntry;
use crate::error::{ConnectError, SendError, TransportError};
use crate::events::{EventHub, SessionEvent};
use crate::roster::{ContactView, PresenceUpdate};
use crate::state::SessionState;
use crate::transport::Transport;

/// State and event fan-out shared with the dispatch task.
struct Shared {
    state: Mutex<SessionState>,
    events: EventHub,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, state: &mut SessionState, status: ConnectionStatus) {
        if state.status == status {
            return;
        }
        info!(from = %state.status, to = %status, "Session status changed");
        state.status = status.clone();
        self.events.emit(SessionEvent::StatusChanged { status });
    }

    /// Apply one transport event if it belongs to the current attempt.
    ///
    /// The generation check and the mutation happen under one lock.
    fn dispatch(&self, generation: u64, event: TransportEvent) {
        let mut state = self.lock();
        if !state.is_current(generation) {
            debug!(generation, "Dropping event from a superseded connection");
            return;
        }
        match event {
            TransportEvent::Message(message) => self.on_inbound_message(&mut state, message),
            TransportEvent::Presence(presence) => self.on_presence_event(&mut state, presence),
            TransportEvent::StreamClosed { reason } => self.on_stream_closed(&mut state, reason),
        }
    }

    fn on_inbound_message(&self, state: &mut SessionState, event: MessageEvent) {
        match MessageKind::parse(&event.kind) {
            Some(kind) if kind.is_direct() => {}
            Some(kind) => {
                debug!(from = %event.from, kind = ?kind, "Ignoring non-conversation message");
                return;
            }
            None => {
                warn!(from = %event.from, kind = %event.kind, "Dropping message of unknown type");
                return;
            }
        }

        let from = match Jid::parse(&event.from) {
            Ok(jid) => jid.bare(),
            Err(e) => {
                warn!(from = %event.from, error = %e, "Dropping message with malformed sender");
                return;
            }
        };

        // Chat state notifications and receipts carry no body
        if event.body.is_empty() {
            debug!(peer = %from, "Ignoring message without body");
            return;
        }

        let entry = LogEntry::inbound(&from, event.body);
        state.conversations.append(&from, entry.clone());
        debug!(peer = %from, "Inbound message appended");
        self.events.emit(SessionEvent::MessageAppended { peer: from, entry });
    }

    fn on_presence_event(&self, state: &mut SessionState, event: PresenceEvent) {
        let jid = match Jid::parse(&event.from) {
            Ok(jid) => jid,
            Err(e) => {
                warn!(from = %event.from, error = %e, "Dropping presence with malformed sender");
                return;
            }
        };
        let resource = event
            .resource
            .clone()
            .or_else(|| jid.resource().map(str::to_string))
            .unwrap_or_default();

        let update = if event.is_unavailable() {
            PresenceUpdate::Unavailable { resource }
        } else {
            let show = match event.show.as_deref().unwrap_or_default().parse::<Show>() {
                Ok(show) => show,
                Err(e) => {
                    warn!(peer = %jid, error = %e, "Dropping presence with unknown show");
                    return;
                }
            };
            PresenceUpdate::Available(PresenceRecord {
                resource,
                status_text: event.status.unwrap_or_default(),
                show,
                priority: event.priority.unwrap_or(DEFAULT_PRIORITY),
                received_at: Utc::now(),
            })
        };

        self.on_presence_update(state, &jid, update);
    }

    fn on_presence_update(&self, state: &mut SessionState, peer: &Jid, update: PresenceUpdate) {
        if !state.roster.apply_presence(peer, update) {
            return;
        }
        self.events.emit(SessionEvent::PresenceChanged {
            peer: peer.bare(),
            presence: state.roster.effective_presence(peer),
        });
    }

    fn replace_roster(&self, state: &mut SessionState, snapshot: RosterSnapshot) {
        state.roster.replace(snapshot);
        let contacts = state.roster.len();
        info!(contacts, "Roster synchronized");
        self.events.emit(SessionEvent::RosterReplaced { contacts });
    }

    fn on_stream_closed(&self, state: &mut SessionState, reason: String) {
        if state.status != ConnectionStatus::Connected {
            debug!(reason = %reason, "Ignoring stream close outside an established session");
            return;
        }
        warn!(reason = %reason, "Stream closed by transport");
        state.retire_attempt();
        state.roster.clear();
        self.set_status(state, ConnectionStatus::Failed(reason));
    }
}

/// Drives one messaging session over a [`Transport`].
pub struct SessionController {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let events = EventHub::new(config.event_buffer);
        Self {
            transport,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::new()),
                events,
            }),
        }
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Connect with the login form's username and server.
    pub async fn login(
        &self,
        username: &str,
        server: &str,
        credential: Credential,
    ) -> Result<(), ConnectError> {
        let jid = Jid::from_parts(username.trim(), server.trim(), None)?;
        self.connect_as(jid, credential).await
    }

    /// Connect and authenticate as `address`, fetch the roster, and announce
    /// presence. Makes exactly one attempt.
    pub async fn connect(&self, address: &str, credential: Credential) -> Result<(), ConnectError> {
        let jid = Jid::parse(address)?;
        self.connect_as(jid, credential).await
    }

    async fn connect_as(&self, jid: Jid, credential: Credential) -> Result<(), ConnectError> {
        let (generation, cancel) = {
            let mut state = self.shared.lock();
            if state.status.is_active() {
                return Err(ConnectError::AlreadyActive);
            }
            state.retire_attempt();
            let cancel = CancellationToken::new();
            state.attempt = Some(cancel.clone());
            state.local_identity = Some(jid.clone());
            state.roster.clear();
            self.shared.set_status(&mut state, ConnectionStatus::Connecting);
            (state.generation, cancel)
        };
        info!(jid = %jid, generation, "Connecting");

        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        self.transport.on_event(event_tx);
        spawn_dispatch(self.shared.clone(), generation, event_rx, cancel.clone());

        let timeout = self.config.connect_timeout;
        let deadline = Instant::now() + timeout;

        let snapshot = match self
            .bounded(&cancel, deadline, async {
                match self.transport.connect(&jid, &credential, timeout).await {
                    Ok(()) => self.transport.request_roster().await,
                    Err(e) => Err(e),
                }
            })
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail_attempt(generation, e).await),
        };

        // Applied before our presence goes out so that contacts' answering
        // presences find their roster entries.
        {
            let mut state = self.shared.lock();
            if !state.is_current(generation) {
                return Err(ConnectError::Aborted);
            }
            self.shared.replace_roster(&mut state, snapshot);
        }

        let show = self.config.initial_show;
        if let Err(e) = self
            .bounded(&cancel, deadline, self.transport.send_presence(show))
            .await
        {
            return Err(self.fail_attempt(generation, e).await);
        }

        let mut state = self.shared.lock();
        if !state.is_current(generation) {
            return Err(ConnectError::Aborted);
        }
        self.shared.set_status(&mut state, ConnectionStatus::Connected);
        info!(jid = %jid, contacts = state.roster.len(), "Session established");
        Ok(())
    }

    /// Run a handshake step unless the attempt is cancelled or the deadline
    /// passes first.
    async fn bounded<T, F>(
        &self,
        cancel: &CancellationToken,
        deadline: Instant,
        step: F,
    ) -> Result<T, ConnectError>
    where
        F: std::future::Future<Output = Result<T, TransportError>>,
    {
        tokio::select! {
            _ = cancel.cancelled() => Err(ConnectError::Aborted),
            res = tokio::time::timeout_at(deadline, step) => match res {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(ConnectError::from(e)),
                Err(_) => Err(ConnectError::Timeout(self.config.connect_timeout)),
            },
        }
    }

    /// Record a failed attempt and tear down whatever the transport opened.
    async fn fail_attempt(&self, generation: u64, error: ConnectError) -> ConnectError {
        if error == ConnectError::Aborted {
            return error;
        }
        {
            let mut state = self.shared.lock();
            if !state.is_current(generation) {
                return ConnectError::Aborted;
            }
            state.retire_attempt();
            state.roster.clear();
            self.shared
                .set_status(&mut state, ConnectionStatus::Failed(error.to_string()));
        }
        warn!(error = %error, "Connect attempt failed");
        self.close_transport().await;
        error
    }

    /// End the session. Safe to call in any state and any number of times.
    ///
    /// Aborts an in-flight connect. Conversation logs are kept.
    pub async fn disconnect(&self) {
        let previous = {
            let mut state = self.shared.lock();
            let previous = state.status.clone();
            state.retire_attempt();
            state.roster.clear();
            self.shared
                .set_status(&mut state, ConnectionStatus::Disconnected);
            previous
        };

        match previous {
            ConnectionStatus::Connected | ConnectionStatus::Connecting => {
                info!(from = %previous, "Disconnecting");
                self.close_transport().await;
            }
            _ => debug!("Disconnect requested while not connected"),
        }
    }

    async fn close_transport(&self) {
        let grace = self.config.disconnect_grace;
        if tokio::time::timeout(grace, self.transport.disconnect(grace))
            .await
            .is_err()
        {
            warn!(grace = ?grace, "Transport did not close within the grace period");
        }
    }

    /// Send `body` to `peer` and record it in the peer's log.
    ///
    /// The entry is appended once the transport has accepted the message;
    /// delivery is not awaited. Returns the appended entry.
    pub async fn send_message(&self, peer: &Jid, body: &str) -> Result<LogEntry, SendError> {
        let session = self.ensure_connected()?;
        self.bounded_send(&session, self.transport.send_message(peer, body))
            .await?;

        let peer = peer.bare();
        let entry = LogEntry::outbound(body);
        self.shared.lock().conversations.append(&peer, entry.clone());
        debug!(peer = %peer, "Outbound message appended");
        self.shared.events.emit(SessionEvent::MessageAppended {
            peer,
            entry: entry.clone(),
        });
        Ok(entry)
    }

    /// Announce a new presence for our own account.
    pub async fn set_presence(&self, show: Show) -> Result<(), SendError> {
        let session = self.ensure_connected()?;
        self.bounded_send(&session, self.transport.send_presence(show))
            .await?;
        info!(show = %show, "Presence announced");
        Ok(())
    }

    /// The running session's token, or `NotConnected`.
    fn ensure_connected(&self) -> Result<CancellationToken, SendError> {
        let state = self.shared.lock();
        let session = match (&state.status, &state.attempt) {
            (ConnectionStatus::Connected, Some(session)) => Ok(session.clone()),
            _ => Err(SendError::NotConnected),
        };
        session
    }

    /// Run one outbound transport call unless the session ends or the send
    /// timeout passes first.
    async fn bounded_send<F>(&self, session: &CancellationToken, step: F) -> Result<(), SendError>
    where
        F: std::future::Future<Output = Result<(), TransportError>>,
    {
        let limit = self.config.send_timeout;
        tokio::select! {
            _ = session.cancelled() => Err(SendError::NotConnected),
            res = tokio::time::timeout(limit, step) => match res {
                Ok(res) => res.map_err(SendError::from),
                Err(_) => {
                    warn!(timeout = ?limit, "Transport did not accept the stanza in time");
                    Err(SendError::Timeout(limit))
                }
            },
        }
    }

    /// Apply an inbound message that arrived outside the registered sink.
    /// Ignored unless a session is connecting or connected.
    pub fn on_inbound_message(&self, event: MessageEvent) {
        if let Some(mut state) = self.active_state() {
            self.shared.on_inbound_message(&mut state, event);
        }
    }

    /// Replace the roster with `snapshot`. Ignored unless a session is
    /// connecting or connected.
    pub fn on_roster_sync(&self, snapshot: RosterSnapshot) {
        if let Some(mut state) = self.active_state() {
            self.shared.replace_roster(&mut state, snapshot);
        }
    }

    pub fn on_presence_update(&self, peer: &Jid, update: PresenceUpdate) {
        if let Some(mut state) = self.active_state() {
            self.shared.on_presence_update(&mut state, peer, update);
        }
    }

    fn active_state(&self) -> Option<MutexGuard<'_, SessionState>> {
        let state = self.shared.lock();
        if state.status.is_active() {
            Some(state)
        } else {
            debug!(status = %state.status, "Ignoring transport event outside an active session");
            None
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status.clone()
    }

    pub fn local_identity(&self) -> Option<Jid> {
        self.shared.lock().local_identity.clone()
    }

    pub fn list_contacts(&self) -> Vec<ContactView> {
        self.shared.lock().roster.list_contacts()
    }

    pub fn effective_presence(&self, peer: &Jid) -> EffectivePresence {
        self.shared.lock().roster.effective_presence(peer)
    }

    pub fn history(&self, peer: &Jid) -> Vec<LogEntry> {
        self.shared.lock().conversations.history(peer)
    }

    /// Peers with a conversation log, sorted.
    pub fn conversations(&self) -> Vec<Jid> {
        self.shared.lock().conversations.peers()
    }
}

/// Feed transport events into the session until the attempt is retired or
/// the transport drops its sender.
fn spawn_dispatch(
    shared: Arc<Shared>,
    generation: u64,
    mut events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        debug!(generation, "Transport event dispatch started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => shared.dispatch(generation, event),
                    None => break,
                },
            }
        }
        debug!(generation, "Transport event dispatch ended");
    });
}
