//! Ordered, deduplicating result store shared by all extraction tasks.

use crate::events::EventSink;
use mapscout_core::{BusinessRecord, DedupKey};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Records between "collected so far" log lines.
const LOG_EVERY: usize = 10;

/// What happened to a record offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored at this 1-based position.
    Accepted(usize),
    /// A record with the same key is already stored.
    Duplicate,
    /// Blank name.
    Unnamed,
    /// The session was stopped; nothing more is stored.
    Sealed,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<BusinessRecord>,
    seen: HashSet<DedupKey>,
    sealed: bool,
}

/// Append-only record list plus its seen-key set, guarded by one lock.
///
/// Check-and-insert and the resulting events happen inside the same critical
/// section, so event order always matches store order.
#[derive(Debug, Clone)]
pub struct ResultStore {
    inner: Arc<Mutex<StoreInner>>,
    events: EventSink,
}

impl ResultStore {
    pub fn new(events: EventSink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer a record; on acceptance publish its Result and Progress events.
    pub fn insert(&self, record: BusinessRecord, target: u32) -> InsertOutcome {
        let mut inner = self.lock();
        if inner.sealed {
            return InsertOutcome::Sealed;
        }
        if !record.is_acceptable() {
            return InsertOutcome::Unnamed;
        }

        let key = DedupKey::for_record(&record);
        if !inner.seen.insert(key) {
            tracing::debug!("duplicate skipped: {}", record.name);
            return InsertOutcome::Duplicate;
        }

        inner.records.push(record.clone());
        let index = inner.records.len();

        self.events.result(record, index);
        self.events.progress(index, target);
        if index % LOG_EVERY == 0 {
            self.events.info(format!("progress: {index} extracted"));
        }

        InsertOutcome::Accepted(index)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity left before `target` is reached.
    pub fn remaining(&self, target: u32) -> usize {
        (target as usize).saturating_sub(self.len())
    }

    /// Copy of every record in discovery order.
    pub fn snapshot(&self) -> Vec<BusinessRecord> {
        self.lock().records.clone()
    }

    /// Reject all further inserts.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    /// Clear records and seen keys for a new session.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.seen.clear();
        inner.sealed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProgressEvent;

    fn store() -> ResultStore {
        ResultStore::new(EventSink::new(64))
    }

    #[test]
    fn test_first_insertion_wins() {
        let store = store();
        let first = BusinessRecord::named("Botica Central").with_address("Av. Principal 123");
        let variant = BusinessRecord::named("  BOTICA   central ").with_address("av. principal 123");

        assert_eq!(store.insert(first.clone(), 10), InsertOutcome::Accepted(1));
        assert_eq!(store.insert(variant, 10), InsertOutcome::Duplicate);
        assert_eq!(store.snapshot(), vec![first]);
    }

    #[test]
    fn test_same_name_different_address_is_distinct() {
        let store = store();
        store.insert(BusinessRecord::named("Inkafarma").with_address("Av. Larco 100"), 10);
        let outcome = store.insert(BusinessRecord::named("Inkafarma").with_address("Av. Arequipa 200"), 10);
        assert_eq!(outcome, InsertOutcome::Accepted(2));
    }

    #[test]
    fn test_unnamed_rejected() {
        let store = store();
        assert_eq!(store.insert(BusinessRecord::named("   "), 10), InsertOutcome::Unnamed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sealed_store_rejects() {
        let store = store();
        store.seal();
        assert_eq!(store.insert(BusinessRecord::named("Tarde"), 10), InsertOutcome::Sealed);
        assert!(store.is_empty());

        store.reset();
        assert_eq!(store.insert(BusinessRecord::named("Tarde"), 10), InsertOutcome::Accepted(1));
    }

    #[test]
    fn test_reset_clears_seen_keys() {
        let store = store();
        store.insert(BusinessRecord::named("Botica Central"), 10);
        store.reset();
        assert_eq!(store.insert(BusinessRecord::named("Botica Central"), 10), InsertOutcome::Accepted(1));
    }

    #[test]
    fn test_remaining() {
        let store = store();
        store.insert(BusinessRecord::named("A"), 2);
        store.insert(BusinessRecord::named("B"), 2);
        store.insert(BusinessRecord::named("C"), 2);
        assert_eq!(store.remaining(2), 0);
        assert_eq!(store.remaining(5), 2);
    }

    #[tokio::test]
    async fn test_events_follow_store_order() {
        let events = EventSink::new(64);
        let mut rx = events.subscribe();
        let store = ResultStore::new(events);

        for i in 1..=10 {
            store.insert(BusinessRecord::named(format!("Negocio {i}")), 20);
        }

        for i in 1..=10 {
            match rx.recv().await.unwrap() {
                ProgressEvent::Result { record, index } => {
                    assert_eq!(index, i);
                    assert_eq!(record.name, format!("Negocio {i}"));
                }
                other => panic!("expected result, got {other:?}"),
            }
            match rx.recv().await.unwrap() {
                ProgressEvent::Progress { current, total, percentage } => {
                    assert_eq!(current, i);
                    assert_eq!(total, 20);
                    assert_eq!(percentage, (i * 100 / 20) as u64);
                }
                other => panic!("expected progress, got {other:?}"),
            }
        }
        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Log { .. }));
    }

    #[test]
    fn test_concurrent_inserts_never_duplicate() {
        let store = store();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let name = if t % 2 == 0 {
                            format!("Negocio {i}")
                        } else {
                            format!("  NEGOCIO   {i} ")
                        };
                        store.insert(BusinessRecord::named(name), 1000);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.snapshot();
        assert_eq!(records.len(), 50);
        let keys: HashSet<_> = records.iter().map(DedupKey::for_record).collect();
        assert_eq!(keys.len(), records.len());
    }
}
