//! In-memory connector and recording observer for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::sink;
use parking_lot::Mutex;
use slotfeed_core::{BookingId, BookingRecord, DeletedBooking, FeedError, TransportError};
use tokio::sync::{Notify, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::notification::Notification;
use crate::observer::{FeedObserver, HandlerResult};
use crate::transport::{
    Connector, DisconnectReason, Endpoint, FrameSink, FrameStream, InboundFrame, TransportEvent,
};

const TEST_WAIT: Duration = Duration::from_secs(60);

/// Next event from a session, failing the test if none arrives.
pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(TEST_WAIT, rx.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event channel closed")
}

// ─────────────────────────────────────────────────────────────────────────────
// MockConnector
// ─────────────────────────────────────────────────────────────────────────────

/// How one connect attempt behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// Hand back a socket pair wired to a [`MockPeer`].
    Accept,
    /// Fail with `TransportError::Connect`.
    Refuse,
    /// Never finish the handshake.
    Hang,
}

/// Scripted [`Connector`].
pub struct MockConnector {
    script: Mutex<VecDeque<Behavior>>,
    fallback: Behavior,
    attempts: AtomicU32,
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPeer>>,
}

impl MockConnector {
    /// Play `script` in order, then `fallback` forever.
    pub fn scripted(script: impl IntoIterator<Item = Behavior>, fallback: Behavior) -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts: AtomicU32::new(0),
            peers_tx,
            peers_rx: tokio::sync::Mutex::new(peers_rx),
        }
    }

    /// Every attempt succeeds.
    pub fn accepting() -> Self {
        Self::scripted([], Behavior::Accept)
    }

    /// Every attempt fails.
    pub fn refusing() -> Self {
        Self::scripted([], Behavior::Refuse)
    }

    /// Every attempt hangs.
    pub fn pending() -> Self {
        Self::scripted([], Behavior::Hang)
    }

    /// Connect calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Server side of the next accepted connection.
    pub async fn next_peer(&self) -> MockPeer {
        let mut rx = self.peers_rx.lock().await;
        tokio::time::timeout(TEST_WAIT, rx.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<(FrameSink, FrameStream), TransportError> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        let behavior = self.script.lock().pop_front().unwrap_or(self.fallback);
        match behavior {
            Behavior::Accept => {
                let (to_server, from_client) = mpsc::unbounded_channel::<String>();
                let (to_client, from_server) =
                    mpsc::unbounded_channel::<Result<InboundFrame, TransportError>>();

                let sink: FrameSink = Box::pin(sink::unfold(to_server, |tx, frame: String| async move {
                    tx.send(frame)
                        .map_err(|_| TransportError::Socket("peer gone".into()))?;
                    Ok::<_, TransportError>(tx)
                }));
                let stream: FrameStream = Box::pin(UnboundedReceiverStream::new(from_server));

                let _ = self.peers_tx.send(MockPeer {
                    outgoing: to_client,
                    incoming: from_client,
                });
                Ok((sink, stream))
            }
            Behavior::Refuse => Err(TransportError::Connect {
                url: endpoint.url().to_owned(),
                reason: "connection refused".into(),
            }),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Server end of a mock socket. Dropping it ends the client's stream.
pub struct MockPeer {
    outgoing: mpsc::UnboundedSender<Result<InboundFrame, TransportError>>,
    incoming: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Push a text frame to the client.
    pub fn send_text(&self, text: &str) {
        let _ = self.outgoing.send(Ok(InboundFrame::Text(text.to_owned())));
    }

    /// Push a JSON frame to the client.
    pub fn send_json(&self, value: &serde_json::Value) {
        self.send_text(&value.to_string());
    }

    /// Send a close frame.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.outgoing.send(Ok(InboundFrame::Close {
            code: Some(code),
            reason: reason.to_owned(),
        }));
    }

    /// Break the socket with a read error.
    pub fn fail(&self, message: &str) {
        let _ = self
            .outgoing
            .send(Err(TransportError::Socket(message.to_owned())));
    }

    /// Next frame the client wrote, or `None` if it closed.
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(TEST_WAIT, self.incoming.recv())
            .await
            .ok()
            .flatten()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordingObserver
// ─────────────────────────────────────────────────────────────────────────────

/// One observer callback, flattened for assertions.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservedCall {
    Connect,
    Disconnect(DisconnectReason),
    Error(FeedError),
    RetryExhausted(u32),
    Snapshot(Vec<BookingId>),
    /// Record id and collection length after the change.
    Created(BookingId, usize),
    Updated(BookingId, usize),
    Deleted(BookingId, usize),
    Notification(Notification),
}

/// Observer that records every call.
#[derive(Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<ObservedCall>>,
    changed: Notify,
}

impl RecordingObserver {
    /// Everything recorded so far.
    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().clone()
    }

    /// Count of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&ObservedCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Wait until `pred` holds for the recorded calls.
    pub async fn wait_for(&self, pred: impl Fn(&[ObservedCall]) -> bool) {
        let wait = async {
            loop {
                let changed = self.changed.notified();
                if pred(&self.calls.lock()) {
                    return;
                }
                changed.await;
            }
        };
        tokio::time::timeout(TEST_WAIT, wait)
            .await
            .expect("timed out waiting for observer calls");
    }

    fn record(&self, call: ObservedCall) -> HandlerResult {
        self.calls.lock().push(call);
        self.changed.notify_waiters();
        Ok(())
    }
}

impl FeedObserver for RecordingObserver {
    fn on_connect(&self) -> HandlerResult {
        self.record(ObservedCall::Connect)
    }

    fn on_disconnect(&self, reason: &DisconnectReason) -> HandlerResult {
        self.record(ObservedCall::Disconnect(reason.clone()))
    }

    fn on_error(&self, error: &FeedError) -> HandlerResult {
        self.record(ObservedCall::Error(error.clone()))
    }

    fn on_retry_exhausted(&self, attempts: u32) -> HandlerResult {
        self.record(ObservedCall::RetryExhausted(attempts))
    }

    fn on_snapshot(&self, bookings: &[BookingRecord]) -> HandlerResult {
        self.record(ObservedCall::Snapshot(
            bookings.iter().map(|b| b.id.clone()).collect(),
        ))
    }

    fn on_created(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        self.record(ObservedCall::Created(record.id.clone(), bookings.len()))
    }

    fn on_updated(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        self.record(ObservedCall::Updated(record.id.clone(), bookings.len()))
    }

    fn on_deleted(&self, deleted: &DeletedBooking, bookings: &[BookingRecord]) -> HandlerResult {
        self.record(ObservedCall::Deleted(deleted.id.clone(), bookings.len()))
    }

    fn on_notification(&self, notification: &Notification) -> HandlerResult {
        self.record(ObservedCall::Notification(notification.clone()))
    }
}
