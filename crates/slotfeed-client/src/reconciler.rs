//! The local booking collection.
//!
//! Newest-first ordered sequence with a single writer. Readers get a
//! [`BookingsView`], which only ever hands out clones.

use std::sync::Arc;

use parking_lot::RwLock;
use slotfeed_core::{BookingId, BookingRecord};
use tracing::debug;

/// Where an update landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An existing record was replaced at `index`.
    Replaced {
        /// Position of the replaced record.
        index: usize,
    },
    /// No record had the id; inserted at the front instead.
    Inserted,
}

/// Read-only handle to the collection.
#[derive(Clone, Debug)]
pub struct BookingsView {
    records: Arc<RwLock<Vec<BookingRecord>>>,
}

impl BookingsView {
    /// Cloned, ordered copy of the collection.
    pub fn snapshot(&self) -> Vec<BookingRecord> {
        self.records.read().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// Sole writer of the collection.
#[derive(Debug, Default)]
pub struct Reconciler {
    records: Arc<RwLock<Vec<BookingRecord>>>,
}

impl Reconciler {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader handle sharing this collection.
    pub fn view(&self) -> BookingsView {
        BookingsView {
            records: Arc::clone(&self.records),
        }
    }

    /// Cloned, ordered copy of the collection.
    pub fn records(&self) -> Vec<BookingRecord> {
        self.records.read().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Replace everything. Returns the new length.
    pub fn apply_snapshot(&self, records: Vec<BookingRecord>) -> usize {
        let mut guard = self.records.write();
        *guard = records;
        debug!(count = guard.len(), "snapshot applied");
        guard.len()
    }

    /// Insert at the front. Existing records with the same id are kept.
    pub fn apply_created(&self, record: BookingRecord) {
        debug!(booking_id = %record.id, "booking created");
        self.records.write().insert(0, record);
    }

    /// Replace the first record with the same id in place, or insert at the
    /// front when there is none.
    pub fn apply_updated(&self, record: BookingRecord) -> UpdateOutcome {
        let mut guard = self.records.write();
        if let Some(index) = guard.iter().position(|r| r.id == record.id) {
            debug!(booking_id = %record.id, index, "booking replaced");
            guard[index] = record;
            UpdateOutcome::Replaced { index }
        } else {
            debug!(booking_id = %record.id, "update for unknown booking, inserting");
            guard.insert(0, record);
            UpdateOutcome::Inserted
        }
    }

    /// Remove the first record with `id`. Absent ids are a no-op.
    pub fn apply_deleted(&self, id: &BookingId) -> Option<BookingRecord> {
        let mut guard = self.records.write();
        let index = guard.iter().position(|r| &r.id == id)?;
        debug!(booking_id = %id, index, "booking removed");
        Some(guard.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(r: &Reconciler) -> Vec<String> {
        r.records().iter().map(|b| b.id.to_string()).collect()
    }

    fn booking(id: i64) -> BookingRecord {
        BookingRecord::new(id, "Haircut")
    }

    #[test]
    fn starts_empty() {
        let r = Reconciler::new();
        assert!(r.is_empty());
        assert!(r.view().is_empty());
    }

    #[test]
    fn snapshot_replaces_in_order() {
        let r = Reconciler::new();
        r.apply_created(booking(99));
        assert_eq!(r.apply_snapshot(vec![booking(3), booking(1), booking(2)]), 3);
        assert_eq!(ids(&r), ["3", "1", "2"]);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let r = Reconciler::new();
        let snap = vec![booking(1), booking(2)];
        let _ = r.apply_snapshot(snap.clone());
        let first = r.records();
        let _ = r.apply_snapshot(snap);
        assert_eq!(r.records(), first);
    }

    #[test]
    fn created_goes_to_front() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1)]);
        r.apply_created(booking(2));
        assert_eq!(ids(&r), ["2", "1"]);
    }

    #[test]
    fn created_with_known_id_duplicates() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1), booking(2)]);
        r.apply_created(booking(2));
        assert_eq!(ids(&r), ["2", "1", "2"]);
    }

    #[test]
    fn updated_replaces_in_place() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1), booking(2), booking(3)]);
        let outcome = r.apply_updated(BookingRecord::new(2, "Massage"));
        assert_eq!(outcome, UpdateOutcome::Replaced { index: 1 });
        assert_eq!(ids(&r), ["1", "2", "3"]);
        assert_eq!(r.records()[1].service_name, "Massage");
    }

    #[test]
    fn updated_unknown_behaves_like_created() {
        let by_update = Reconciler::new();
        let by_create = Reconciler::new();
        for r in [&by_update, &by_create] {
            let _ = r.apply_snapshot(vec![booking(1), booking(2)]);
        }
        let record = BookingRecord::new(7, "Nails");

        assert_eq!(by_update.apply_updated(record.clone()), UpdateOutcome::Inserted);
        by_create.apply_created(record);
        assert_eq!(by_update.records(), by_create.records());
        assert_eq!(ids(&by_update), ["7", "1", "2"]);
    }

    #[test]
    fn updated_matches_mixed_id_encodings() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(5)]);
        let outcome = r.apply_updated(BookingRecord::new("5", "Facial"));
        assert_eq!(outcome, UpdateOutcome::Replaced { index: 0 });
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn deleted_removes_first_match_only() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1), booking(2)]);
        r.apply_created(booking(1));
        let removed = r.apply_deleted(&BookingId::from(1));
        assert_eq!(removed.map(|b| b.id), Some(BookingId::from(1)));
        assert_eq!(ids(&r), ["1", "2"]);
    }

    #[test]
    fn deleted_absent_is_noop() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1), booking(2)]);
        let before = r.records();
        assert!(r.apply_deleted(&BookingId::from(42)).is_none());
        assert_eq!(r.records(), before);
    }

    #[test]
    fn end_to_end_event_sequence() {
        let r = Reconciler::new();
        let _ = r.apply_snapshot(vec![booking(1)]);
        r.apply_created(booking(2));
        assert_eq!(ids(&r), ["2", "1"]);
        let _ = r.apply_deleted(&BookingId::from(1));
        assert_eq!(ids(&r), ["2"]);
        let _ = r.apply_updated(BookingRecord::new(2, "X"));
        assert_eq!(r.records(), vec![BookingRecord::new(2, "X")]);
    }

    #[test]
    fn view_sees_writes() {
        let r = Reconciler::new();
        let view = r.view();
        r.apply_created(booking(1));
        assert_eq!(view.len(), 1);
        assert_eq!(view.snapshot()[0].id, BookingId::from(1));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Create(i64),
            Update(i64),
            Delete(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0i64..8).prop_map(Op::Create),
                (0i64..8).prop_map(Op::Update),
                (0i64..8).prop_map(Op::Delete),
            ]
        }

        fn duplicates(r: &Reconciler) -> usize {
            let records = r.records();
            let unique: HashSet<_> = records.iter().map(|b| b.id.clone()).collect();
            records.len() - unique.len()
        }

        proptest! {
            #[test]
            fn duplicates_only_come_from_creates_of_known_ids(
                snapshot in proptest::collection::hash_set(0i64..8, 0..6),
                ops in proptest::collection::vec(op(), 0..40),
            ) {
                let r = Reconciler::new();
                let _ = r.apply_snapshot(snapshot.into_iter().map(booking).collect());
                let mut known_creates = 0usize;

                for op in ops {
                    let len_before = r.len();
                    match op {
                        Op::Create(id) => {
                            if r.records().iter().any(|b| b.id == BookingId::from(id)) {
                                known_creates += 1;
                            }
                            r.apply_created(booking(id));
                        }
                        Op::Update(id) => {
                            let _ = r.apply_updated(booking(id));
                            prop_assert!(r.len() == len_before || r.len() == len_before + 1);
                        }
                        Op::Delete(id) => {
                            let removed = r.apply_deleted(&BookingId::from(id));
                            let expected = len_before - usize::from(removed.is_some());
                            prop_assert_eq!(r.len(), expected);
                        }
                    }
                    prop_assert!(duplicates(&r) <= known_creates);
                }
            }

            #[test]
            fn snapshot_of_unique_ids_keeps_length_and_order(
                ids in proptest::collection::hash_set(any::<i64>(), 0..20),
            ) {
                let ordered: Vec<i64> = ids.into_iter().collect();
                let r = Reconciler::new();
                let n = r.apply_snapshot(ordered.iter().copied().map(booking).collect());
                prop_assert_eq!(n, ordered.len());
                let got: Vec<BookingId> = r.records().into_iter().map(|b| b.id).collect();
                let want: Vec<BookingId> = ordered.into_iter().map(BookingId::from).collect();
                prop_assert_eq!(got, want);
            }
        }
    }
}
