//! [`FeedClient`]: the owned handle applications hold.
//!
//! One driver task owns the reconnect policy, the live transport session,
//! the dispatcher, and the backoff timer. The handle talks to it over a
//! command channel and reads state through a `watch` channel and a shared
//! view of the collection, so every public method is synchronous.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use slotfeed_core::{BookingRecord, ConnectionState, FeedError, ProtocolError};
use slotfeed_settings::FeedSettings;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::notification::Notification;
use crate::observer::ObserverSet;
use crate::protocol::{OutboundRequest, encode};
use crate::reconciler::BookingsView;
use crate::reconnect::{LossDecision, PolicyPhase, ReconnectPolicy};
use crate::transport::websocket::WebSocketConnector;
use crate::transport::{
    Connector, DisconnectReason, Endpoint, Outbox, SendOutcome, SessionId, SessionOptions,
    TransportEvent, TransportSession, TransportSignal,
};

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of the connection, published on every change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// A session is open.
    pub connected: bool,
    /// Transport lifecycle state.
    pub state: ConnectionState,
    /// Consecutive failed reconnect attempts.
    pub attempts: u32,
    /// Reconnect policy state.
    pub phase: PolicyPhase,
}

impl ConnectionStatus {
    fn from_policy(policy: &ReconnectPolicy) -> Self {
        let phase = policy.phase();
        let state = match phase {
            PolicyPhase::AwaitingConnect => ConnectionState::Connecting,
            PolicyPhase::Connected => ConnectionState::Connected,
            PolicyPhase::Idle | PolicyPhase::BackoffWait | PolicyPhase::Exhausted => {
                ConnectionState::Disconnected
            }
        };
        Self {
            connected: state.is_connected(),
            state,
            attempts: policy.retry().attempts,
            phase,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Connect(Endpoint),
    Disconnect,
    Shutdown,
}

/// Booking feed client.
///
/// Dropping the handle stops the driver and closes any open connection.
pub struct FeedClient {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    outbox: Arc<Mutex<Option<Outbox>>>,
    bookings: BookingsView,
    driver: Option<JoinHandle<()>>,
}

impl FeedClient {
    /// Start the driver task. Must be called inside a tokio runtime.
    ///
    /// The client starts `Idle`; call [`connect`](Self::connect).
    pub fn spawn(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        observers: ObserverSet,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::new(&config.reconnect);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::from_policy(&policy));
        let outbox = Arc::new(Mutex::new(None));
        let dispatcher = Dispatcher::new(observers);
        let bookings = dispatcher.view();

        let driver = Driver {
            config,
            connector,
            policy,
            dispatcher,
            endpoint: None,
            session: None,
            session_connected: false,
            next_session: 0,
            backoff: None,
            events_tx,
            events_rx,
            commands: commands_rx,
            outbox: Arc::clone(&outbox),
            status: status_tx,
        };

        Self {
            commands: commands_tx,
            status: status_rx,
            outbox,
            bookings,
            driver: Some(tokio::spawn(driver.run())),
        }
    }

    /// Build a `WebSocket` client from loaded settings, connecting right away
    /// when `client.autoConnect` is set.
    pub fn from_settings(settings: &FeedSettings, observers: ObserverSet) -> Self {
        let config = ClientConfig::from(settings);
        let connector = Arc::new(WebSocketConnector::from_config(&config));
        let auto_connect = config.auto_connect;
        let client = Self::spawn(config, connector, observers);
        if auto_connect {
            client.connect(Endpoint::from(&settings.endpoint));
        }
        client
    }

    /// Start connecting with a fresh retry budget.
    ///
    /// Ignored while a session is open, handshaking, or scheduled.
    pub fn connect(&self, endpoint: Endpoint) {
        self.command(Command::Connect(endpoint));
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Ask the server for the full collection.
    pub fn request_snapshot(&self) -> SendOutcome {
        match self.send(&OutboundRequest::GetBookings) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "failed to encode snapshot request");
                SendOutcome::Dropped
            }
        }
    }

    /// Send `{"type": kind, ...fields}`.
    pub fn send_custom(
        &self,
        kind: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Result<SendOutcome, ProtocolError> {
        self.send(&OutboundRequest::custom(kind, fields)?)
    }

    /// Encode and send an outbound request. Dropped unless connected.
    pub fn send(&self, request: &OutboundRequest) -> Result<SendOutcome, ProtocolError> {
        let frame = encode(request)?;
        let outcome = self
            .outbox
            .lock()
            .as_ref()
            .map_or(SendOutcome::Dropped, |outbox| outbox.send(frame));
        if !outcome.is_sent() {
            debug!(kind = request.kind(), "outbound frame dropped");
        }
        Ok(outcome)
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver that yields every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Ordered copy of the local collection.
    pub fn bookings(&self) -> Vec<BookingRecord> {
        self.bookings.snapshot()
    }

    /// Shared read handle for the local collection.
    pub fn bookings_view(&self) -> BookingsView {
        self.bookings.clone()
    }

    /// Close the connection and wait for the driver to exit.
    pub async fn shutdown(mut self) {
        self.command(Command::Shutdown);
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "feed driver task failed");
            }
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("feed driver already stopped");
        }
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        if self.driver.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("status", &*self.status.borrow())
            .field("bookings", &self.bookings.len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

struct Driver {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    dispatcher: Dispatcher,
    endpoint: Option<Endpoint>,
    session: Option<TransportSession>,
    session_connected: bool,
    next_session: u64,
    backoff: Option<Pin<Box<Sleep>>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    outbox: Arc<Mutex<Option<Outbox>>>,
    status: watch::Sender<ConnectionStatus>,
}

async fn backoff_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect(endpoint)) => self.connect(endpoint),
                    Some(Command::Disconnect) => self.disconnect(),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.events_rx.recv() => self.on_event(event),
                () = backoff_elapsed(&mut self.backoff) => self.on_backoff_elapsed(),
            }
            self.publish_status();
        }

        self.disconnect();
        self.publish_status();
        debug!("feed driver stopped");
    }

    fn publish_status(&self) {
        let next = ConnectionStatus::from_policy(&self.policy);
        let _ = self.status.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }

    fn connect(&mut self, endpoint: Endpoint) {
        if !self.policy.request_connect() {
            debug!(phase = %self.policy.phase(), "connect ignored");
            return;
        }
        info!(url = endpoint.url(), "connecting to booking feed");
        self.endpoint = Some(endpoint);
        self.open_session();
    }

    fn disconnect(&mut self) {
        self.backoff = None;
        self.policy.disconnect();
        let was_connected = self.session_connected;
        self.close_session();
        if was_connected {
            info!("disconnected from booking feed");
            let reason = DisconnectReason::ClosedLocally;
            let _ = self
                .dispatcher
                .observers()
                .emit("on_disconnect", |o| o.on_disconnect(&reason));
        }
    }

    fn open_session(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        self.close_session();
        self.next_session += 1;
        let id = SessionId(self.next_session);
        debug!(session = %id, "opening transport session");

        let session = TransportSession::open(
            id,
            endpoint,
            Arc::clone(&self.connector),
            SessionOptions {
                connect_timeout: self.config.connect_timeout,
                outbound_buffer: self.config.outbound_buffer,
            },
            self.events_tx.clone(),
        );
        *self.outbox.lock() = Some(session.outbox());
        self.session = Some(session);
    }

    fn close_session(&mut self) {
        *self.outbox.lock() = None;
        self.session_connected = false;
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    fn on_event(&mut self, event: TransportEvent) {
        let live = self.session.as_ref().map(TransportSession::id);
        if live != Some(event.session) {
            debug!(session = %event.session, "ignoring event from stale session");
            return;
        }

        match event.signal {
            TransportSignal::Connected => self.on_connected(),
            TransportSignal::Frame(text) => {
                let _ = self.dispatcher.handle_frame(&text);
            }
            TransportSignal::Error(e) => {
                self.dispatcher
                    .observers()
                    .report_error(&FeedError::Transport(e));
                self.on_connection_lost();
            }
            TransportSignal::Disconnected(reason) => {
                let was_connected = self.session_connected;
                *self.outbox.lock() = None;
                self.session = None;
                self.session_connected = false;
                if was_connected {
                    let _ = self
                        .dispatcher
                        .observers()
                        .emit("on_disconnect", |o| o.on_disconnect(&reason));
                }
                self.on_connection_lost();
            }
        }
    }

    fn on_connected(&mut self) {
        if !self.policy.on_connected() {
            return;
        }
        self.session_connected = true;
        info!(session = ?self.session.as_ref().map(TransportSession::id), "booking feed connected");
        let _ = self
            .dispatcher
            .observers()
            .emit("on_connect", |o| o.on_connect());

        if self.config.request_snapshot_on_connect {
            self.request_snapshot();
        }
    }

    fn request_snapshot(&self) {
        let Some(session) = &self.session else {
            return;
        };
        match encode(&OutboundRequest::GetBookings) {
            Ok(frame) => {
                if !session.send(frame).is_sent() {
                    warn!(session = %session.id(), "snapshot request dropped");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode snapshot request"),
        }
    }

    fn on_connection_lost(&mut self) {
        match self.policy.on_connection_lost() {
            LossDecision::Retry { attempt, delay } => {
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                info!(
                    attempt,
                    max_attempts = self.policy.retry().ceiling,
                    delay_ms,
                    "reconnect scheduled"
                );
                self.backoff = Some(Box::pin(tokio::time::sleep(delay)));
            }
            LossDecision::Exhausted { attempts } => {
                error!(attempts, "reconnect attempts exhausted, giving up");
                self.backoff = None;
                let observers = self.dispatcher.observers();
                let _ = observers.emit("on_retry_exhausted", |o| o.on_retry_exhausted(attempts));
                observers.report_error(&FeedError::RetryExhausted { attempts });
                self.dispatcher.notify(&Notification::retry_exhausted(attempts));
            }
            LossDecision::Ignored => {}
        }
    }

    fn on_backoff_elapsed(&mut self) {
        self.backoff = None;
        if self.policy.on_backoff_elapsed() {
            debug!(attempt = self.policy.retry().attempts, "backoff elapsed, reconnecting");
            self.open_session();
        }
    }
}
