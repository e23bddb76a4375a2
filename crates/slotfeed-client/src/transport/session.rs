//! A single physical connection.
//!
//! [`TransportSession::open`] returns immediately in the `Connecting` state
//! and runs the handshake plus all socket I/O on its own task. Every outcome,
//! including a failed handshake, is reported through the event sink; `open`
//! itself never fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use slotfeed_core::{ConnectionState, TransportError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    Connector, DisconnectReason, Endpoint, EventSink, InboundFrame, SendOutcome, SessionId,
    TransportEvent, TransportSignal,
};

/// How long a local close waits for the close frame to flush.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-session limits.
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// Handshake timeout.
    pub connect_timeout: Duration,
    /// Outbound frames buffered before sends are dropped.
    pub outbound_buffer: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            outbound_buffer: 64,
        }
    }
}

/// Cloneable send handle for one session.
///
/// Sends are fire-and-forget: anything written while the session is not
/// connected, or while the buffer is full, is dropped and counted.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<String>,
    state: Arc<Mutex<ConnectionState>>,
    dropped: Arc<AtomicU64>,
}

impl Outbox {
    /// Queue a text frame.
    pub fn send(&self, frame: String) -> SendOutcome {
        if self.state.lock().is_connected() && self.tx.try_send(frame).is_ok() {
            SendOutcome::Sent
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            SendOutcome::Dropped
        }
    }

    /// Frames dropped so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owns one connection's lifecycle.
pub struct TransportSession {
    id: SessionId,
    outbox: Outbox,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TransportSession {
    /// Start connecting to `endpoint`. Must be called inside a tokio runtime.
    pub fn open(
        id: SessionId,
        endpoint: Endpoint,
        connector: Arc<dyn Connector>,
        options: SessionOptions,
        events: EventSink,
    ) -> Self {
        let (tx, rx) = mpsc::channel(options.outbound_buffer.max(1));
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let cancel = CancellationToken::new();

        let io = SessionIo {
            id,
            endpoint,
            connector,
            connect_timeout: options.connect_timeout,
            state: state.clone(),
            outbound: rx,
            cancel: cancel.clone(),
            events,
        };
        let task = tokio::spawn(io.run());

        Self {
            id,
            outbox: Outbox {
                tx,
                state,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            cancel,
            task,
        }
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.outbox.state.lock()
    }

    /// Queue a text frame; dropped unless connected.
    pub fn send(&self, frame: String) -> SendOutcome {
        self.outbox.send(frame)
    }

    /// Send handle that outlives borrows of the session.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(session = %self.id, "closing transport session");
            self.cancel.cancel();
        }
    }

    /// Whether the I/O task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// I/O task
// ─────────────────────────────────────────────────────────────────────────────

struct SessionIo {
    id: SessionId,
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    state: Arc<Mutex<ConnectionState>>,
    outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
    events: EventSink,
}

impl SessionIo {
    fn emit(&self, signal: TransportSignal) {
        // Receiver gone means the client is shutting down.
        let _ = self.events.send(TransportEvent {
            session: self.id,
            signal,
        });
    }

    fn finish(&self, reason: DisconnectReason) {
        *self.state.lock() = ConnectionState::Disconnected;
        self.emit(TransportSignal::Disconnected(reason));
    }

    fn fail(&self, error: TransportError) {
        *self.state.lock() = ConnectionState::Disconnected;
        self.emit(TransportSignal::Error(error));
        self.emit(TransportSignal::Disconnected(DisconnectReason::Failed));
    }

    async fn run(mut self) {
        let connect = tokio::time::timeout(
            self.connect_timeout,
            self.connector.connect(&self.endpoint),
        );

        let outcome = tokio::select! {
            () = self.cancel.cancelled() => None,
            res = connect => Some(res),
        };

        let (mut sink, mut stream) = match outcome {
            None => return self.finish(DisconnectReason::ClosedLocally),
            Some(Ok(Ok(pair))) => pair,
            Some(Ok(Err(e))) => {
                warn!(session = %self.id, error = %e, "connect failed");
                return self.fail(e);
            }
            Some(Err(_elapsed)) => {
                #[allow(clippy::cast_possible_truncation)]
                let timeout_ms = self.connect_timeout.as_millis() as u64;
                let e = TransportError::Timeout {
                    url: self.endpoint.url().to_owned(),
                    timeout_ms,
                };
                warn!(session = %self.id, error = %e, "connect timed out");
                return self.fail(e);
            }
        };

        *self.state.lock() = ConnectionState::Connected;
        info!(session = %self.id, url = self.endpoint.url(), "transport connected");
        self.emit(TransportSignal::Connected);

        let reason = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    *self.state.lock() = ConnectionState::Disconnected;
                    let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, sink.close()).await;
                    break DisconnectReason::ClosedLocally;
                }
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        break DisconnectReason::ClosedLocally;
                    };
                    if let Err(e) = sink.send(frame).await {
                        warn!(session = %self.id, error = %e, "write failed");
                        return self.fail(e);
                    }
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(InboundFrame::Text(text))) => self.emit(TransportSignal::Frame(text)),
                    Some(Ok(InboundFrame::Close { code, reason })) => {
                        break DisconnectReason::ClosedByPeer { code, reason };
                    }
                    Some(Err(e)) => {
                        warn!(session = %self.id, error = %e, "read failed");
                        return self.fail(e);
                    }
                    None => break DisconnectReason::StreamEnded,
                },
            }
        };

        info!(session = %self.id, %reason, "transport disconnected");
        self.finish(reason);
    }
}
