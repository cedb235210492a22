use crate::models::{CounterSnapshot, EntityCode};
use crate::storage::{KeyValueStore, load_value, persist_value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, warn};

pub const PERSONAL_STORAGE_KEY: &str = "my-clicks-storage";

/// The local user's own clicks. Survives restarts: every mutation is written
/// back to the key/value store before it returns.
#[derive(Clone)]
pub struct PersonalCounterStore {
    counts: Arc<Mutex<CounterSnapshot>>,
    backend: Arc<dyn KeyValueStore>,
}

impl PersonalCounterStore {
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let mut counts: CounterSnapshot = load_value(backend.as_ref(), PERSONAL_STORAGE_KEY);
        if !counts.is_consistent() {
            warn!(
                stored_total = counts.total(),
                "stored personal total disagrees with clicks, re-deriving"
            );
            counts.recompute_total();
        }

        Self {
            counts: Arc::new(Mutex::new(counts)),
            backend,
        }
    }

    /// Returns the entity's new count and the new total.
    pub fn increment(&self, entity: &EntityCode) -> (u64, u64) {
        let mut counts = self.counts.lock();
        let count = counts.increment(entity);
        self.persist(&counts);
        (count, counts.total())
    }

    pub fn set_count(&self, entity: &EntityCode, count: u64) {
        let mut counts = self.counts.lock();
        counts.set_count(entity, count);
        self.persist(&counts);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.counts.lock().clone()
    }

    pub fn total(&self) -> u64 {
        self.counts.lock().total()
    }

    pub fn count(&self, entity: &EntityCode) -> u64 {
        self.counts.lock().count(entity)
    }

    fn persist(&self, counts: &CounterSnapshot) {
        if let Err(err) = persist_value(self.backend.as_ref(), PERSONAL_STORAGE_KEY, counts) {
            error!("failed to persist personal clicks: {err}");
        }
    }
}
