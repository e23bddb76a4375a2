//! Routes decoded frames to the reconciler and observers.

use slotfeed_core::{FeedError, ProtocolError};
use tracing::{debug, instrument, warn};

use crate::notification::Notification;
use crate::observer::ObserverSet;
use crate::protocol::{InboundMessage, decode};
use crate::reconciler::{BookingsView, Reconciler};

/// Which handler a message was routed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `bookings_data`.
    Snapshot,
    /// `booking_created`.
    Created,
    /// `booking_updated`.
    Updated,
    /// `booking_deleted`.
    Deleted,
    /// Anything else; no handler ran.
    Unknown(String),
}

/// Owns the reconciler and fans events out to observers.
#[derive(Debug)]
pub struct Dispatcher {
    reconciler: Reconciler,
    observers: ObserverSet,
}

impl Dispatcher {
    /// Dispatcher over an empty collection.
    pub fn new(observers: ObserverSet) -> Self {
        Self {
            reconciler: Reconciler::new(),
            observers,
        }
    }

    /// Reader handle for the collection.
    pub fn view(&self) -> BookingsView {
        self.reconciler.view()
    }

    /// The observers this dispatcher notifies.
    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Decode and route one text frame.
    ///
    /// Malformed frames are logged, reported through `on_error`, and
    /// dropped; `None` is returned.
    #[instrument(skip_all)]
    pub fn handle_frame(&self, raw: &str) -> Option<Route> {
        match decode(raw).and_then(InboundMessage::try_from) {
            Ok(message) => Some(self.dispatch(message)),
            Err(error) => {
                self.reject(error, raw);
                None
            }
        }
    }

    fn reject(&self, error: ProtocolError, raw: &str) {
        warn!(error = %error, len = raw.len(), "dropping inbound frame");
        self.observers.report_error(&FeedError::Protocol(error));
    }

    /// Run exactly one handler for `message`.
    pub fn dispatch(&self, message: InboundMessage) -> Route {
        debug!(kind = message.kind(), "routing message");
        match message {
            InboundMessage::BookingsData(records) => {
                let _ = self.reconciler.apply_snapshot(records);
                let bookings = self.reconciler.records();
                let _ = self.observers.emit("on_snapshot", |o| o.on_snapshot(&bookings));
                Route::Snapshot
            }
            InboundMessage::BookingCreated(record) => {
                let notification = Notification::created(&record);
                self.reconciler.apply_created(record.clone());
                let bookings = self.reconciler.records();
                let _ = self
                    .observers
                    .emit("on_created", |o| o.on_created(&record, &bookings));
                self.notify(&notification);
                Route::Created
            }
            InboundMessage::BookingUpdated(record) => {
                let notification = Notification::updated(&record);
                let _ = self.reconciler.apply_updated(record.clone());
                let bookings = self.reconciler.records();
                let _ = self
                    .observers
                    .emit("on_updated", |o| o.on_updated(&record, &bookings));
                self.notify(&notification);
                Route::Updated
            }
            InboundMessage::BookingDeleted(deleted) => {
                let notification = Notification::deleted(&deleted);
                let _ = self.reconciler.apply_deleted(&deleted.id);
                let bookings = self.reconciler.records();
                let _ = self
                    .observers
                    .emit("on_deleted", |o| o.on_deleted(&deleted, &bookings));
                self.notify(&notification);
                Route::Deleted
            }
            InboundMessage::Unknown { kind } => {
                debug!(kind, "ignoring unknown message kind");
                Route::Unknown(kind)
            }
        }
    }

    /// Deliver a notification to every observer.
    pub fn notify(&self, notification: &Notification) {
        let _ = self
            .observers
            .emit("on_notification", |o| o.on_notification(notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{FeedObserver, HandlerResult};
    use crate::test_utils::{ObservedCall, RecordingObserver};
    use assert_matches::assert_matches;
    use slotfeed_core::{BookingId, BookingRecord};
    use std::sync::Arc;

    fn setup() -> (Dispatcher, Arc<RecordingObserver>) {
        let recorder = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(ObserverSet::new().with(recorder.clone()));
        (dispatcher, recorder)
    }

    fn ids(d: &Dispatcher) -> Vec<String> {
        d.view().snapshot().iter().map(|b| b.id.to_string()).collect()
    }

    #[test]
    fn routes_each_kind_to_one_handler() {
        let (d, rec) = setup();
        assert_eq!(
            d.handle_frame(r#"{"type":"bookings_data","data":[{"id":1}]}"#),
            Some(Route::Snapshot)
        );
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_created","data":{"id":2}}"#),
            Some(Route::Created)
        );
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_updated","data":{"id":2}}"#),
            Some(Route::Updated)
        );
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_deleted","data":{"id":1}}"#),
            Some(Route::Deleted)
        );

        let calls = rec.calls();
        assert_eq!(calls[0], ObservedCall::Snapshot(vec![BookingId::from(1)]));
        assert_matches!(&calls[1], ObservedCall::Created(id, 2) if *id == BookingId::from(2));
        assert_matches!(&calls[2], ObservedCall::Notification(n) if n.title == "New Booking Created");
        assert_matches!(&calls[3], ObservedCall::Updated(_, 2));
        assert_matches!(&calls[5], ObservedCall::Deleted(id, 1) if *id == BookingId::from(1));
        assert_eq!(calls.len(), 7);
    }

    #[test]
    fn example_scenario() {
        let (d, _) = setup();
        let _ = d.handle_frame(r#"{"type":"bookings_data","data":[{"id":1,"service_name":"A"}]}"#);
        let _ = d.handle_frame(r#"{"type":"booking_created","data":{"id":2}}"#);
        assert_eq!(ids(&d), ["2", "1"]);
        let _ = d.handle_frame(r#"{"type":"booking_deleted","data":{"id":1}}"#);
        assert_eq!(ids(&d), ["2"]);
        let _ = d.handle_frame(r#"{"type":"booking_updated","data":{"id":2,"service_name":"X"}}"#);
        assert_eq!(d.view().snapshot(), vec![BookingRecord::new(2, "X")]);
    }

    #[test]
    fn malformed_frame_is_reported_and_dropped() {
        let (d, rec) = setup();
        let _ = d.handle_frame(r#"{"type":"bookings_data","data":[{"id":1}]}"#);

        assert_eq!(d.handle_frame("{not json"), None);
        assert_eq!(d.handle_frame(r#"{"data":{}}"#), None);
        assert_eq!(d.handle_frame(r#"{"type":"booking_created","data":{}}"#), None);

        let errors: Vec<_> = rec
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ObservedCall::Error(FeedError::Protocol(_))))
            .collect();
        assert_eq!(errors.len(), 3);
        assert_eq!(ids(&d), ["1"]);

        // Still routing afterwards.
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_created","data":{"id":2}}"#),
            Some(Route::Created)
        );
    }

    #[test]
    fn unknown_kind_runs_no_handler() {
        let (d, rec) = setup();
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_archived","data":{"id":1}}"#),
            Some(Route::Unknown("booking_archived".into()))
        );
        assert!(rec.calls().is_empty());
        assert!(d.view().is_empty());
    }

    struct Exploding;

    impl FeedObserver for Exploding {
        fn on_created(&self, _: &BookingRecord, _: &[BookingRecord]) -> HandlerResult {
            panic!("boom");
        }
    }

    #[test]
    fn handler_panic_does_not_stop_dispatch() {
        let recorder = Arc::new(RecordingObserver::default());
        let d = Dispatcher::new(
            ObserverSet::new()
                .with(Arc::new(Exploding))
                .with(recorder.clone()),
        );

        assert_eq!(
            d.handle_frame(r#"{"type":"booking_created","data":{"id":1}}"#),
            Some(Route::Created)
        );
        assert_eq!(
            d.handle_frame(r#"{"type":"booking_created","data":{"id":2}}"#),
            Some(Route::Created)
        );
        assert_eq!(ids(&d), ["2", "1"]);
        let handler_errors = recorder
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ObservedCall::Error(FeedError::Handler(_))))
            .count();
        assert_eq!(handler_errors, 2);
    }

    #[test]
    fn observers_see_collection_after_mutation() {
        let (d, rec) = setup();
        let _ = d.handle_frame(r#"{"type":"bookings_data","data":[{"id":1},{"id":2}]}"#);
        let _ = d.handle_frame(r#"{"type":"booking_deleted","data":{"id":9}}"#);
        assert_matches!(&rec.calls()[1], ObservedCall::Deleted(_, 2));
    }
}
