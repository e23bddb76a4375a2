//! Subscription interface for UI layers.
//!
//! Observers are called synchronously on the client's driver task, in
//! registration order. A callback that returns an error or panics is
//! isolated: the failure is logged, reported to the *other* observers'
//! [`FeedObserver::on_error`], and dispatch carries on.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use slotfeed_core::{BookingRecord, BoxError, DeletedBooking, FeedError, HandlerError};
use tracing::warn;

use crate::notification::Notification;
use crate::transport::DisconnectReason;

/// Return type of every observer callback.
pub type HandlerResult = Result<(), BoxError>;

/// Receives feed events. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait FeedObserver: Send + Sync {
    /// A session finished its handshake.
    fn on_connect(&self) -> HandlerResult {
        Ok(())
    }

    /// The live session ended.
    fn on_disconnect(&self, reason: &DisconnectReason) -> HandlerResult {
        Ok(())
    }

    /// Transport, protocol, handler, or exhaustion error.
    fn on_error(&self, error: &FeedError) -> HandlerResult {
        Ok(())
    }

    /// Automatic reconnection stopped after `attempts`.
    fn on_retry_exhausted(&self, attempts: u32) -> HandlerResult {
        Ok(())
    }

    /// A snapshot replaced the collection.
    fn on_snapshot(&self, bookings: &[BookingRecord]) -> HandlerResult {
        Ok(())
    }

    /// A booking was inserted at the front.
    fn on_created(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        Ok(())
    }

    /// A booking was replaced or inserted.
    fn on_updated(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        Ok(())
    }

    /// A booking was removed (or was already absent).
    fn on_deleted(&self, deleted: &DeletedBooking, bookings: &[BookingRecord]) -> HandlerResult {
        Ok(())
    }

    /// Human-readable banner for the last event.
    fn on_notification(&self, notification: &Notification) -> HandlerResult {
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_owned()
    }
}

fn guarded<F>(handler: &str, observer: &dyn FeedObserver, f: F) -> Result<(), HandlerError>
where
    F: Fn(&dyn FeedObserver) -> HandlerResult,
{
    match catch_unwind(AssertUnwindSafe(|| f(observer))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::new(handler, e.to_string())),
        Err(payload) => Err(HandlerError::new(handler, panic_message(payload.as_ref()))),
    }
}

/// Ordered list of observers with failure isolation.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn FeedObserver>>,
}

impl ObserverSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    pub fn push(&mut self, observer: Arc<dyn FeedObserver>) {
        self.observers.push(observer);
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn FeedObserver>) -> Self {
        self.push(observer);
        self
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no observers.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Invoke `f` on every observer. Returns the failures, which have
    /// already been logged and forwarded to the other observers.
    pub fn emit<F>(&self, handler: &str, f: F) -> Vec<HandlerError>
    where
        F: Fn(&dyn FeedObserver) -> HandlerResult,
    {
        let mut failures = Vec::new();
        for (index, observer) in self.observers.iter().enumerate() {
            if let Err(err) = guarded(handler, observer.as_ref(), &f) {
                warn!(handler, observer = index, error = %err.message, "observer failed");
                failures.push((index, err));
            }
        }

        for (failed, err) in &failures {
            let error = FeedError::Handler(err.clone());
            self.notify_error(&error, Some(*failed));
        }
        failures.into_iter().map(|(_, err)| err).collect()
    }

    /// Deliver `error` to every observer's `on_error`.
    pub fn report_error(&self, error: &FeedError) {
        self.notify_error(error, None);
    }

    fn notify_error(&self, error: &FeedError, skip: Option<usize>) {
        for (index, observer) in self.observers.iter().enumerate() {
            if skip == Some(index) {
                continue;
            }
            let outcome = guarded("on_error", observer.as_ref(), |o: &dyn FeedObserver| {
                o.on_error(error)
            });
            if let Err(err) = outcome {
                warn!(observer = index, error = %err.message, "on_error handler failed");
            }
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}
