use crate::models::{CounterSnapshot, EntityCode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct SharedCounts {
    counts: CounterSnapshot,
    /// Amount the displayed total sits above the sum of `counts`.
    carried: u64,
    /// Set once the first remote snapshot has been merged.
    synced: bool,
}

impl SharedCounts {
    fn total(&self) -> u64 {
        self.counts.total().saturating_add(self.carried)
    }
}

/// Last-known global counts for this session. Never persisted.
///
/// The displayed total never goes down across [`SharedCounterStore::replace_all`]:
/// when a snapshot sums lower than what is on screen, the gap is carried on
/// top of the new per-entity counts.
#[derive(Clone, Default)]
pub struct SharedCounterStore {
    inner: Arc<Mutex<SharedCounts>>,
}

impl SharedCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity's new count and the new total.
    pub fn increment(&self, entity: &EntityCode) -> (u64, u64) {
        let mut shared = self.inner.lock();
        let count = shared.counts.increment(entity);
        (count, shared.total())
    }

    pub fn set_count(&self, entity: &EntityCode, count: u64) {
        self.inner.lock().counts.set_count(entity, count);
    }

    pub fn replace_all(&self, snapshot: CounterSnapshot) {
        let mut shared = self.inner.lock();
        let current = shared.total();
        let incoming = snapshot.total();
        let shortfall = current.saturating_sub(incoming);

        shared.counts = snapshot;
        shared.carried = shortfall;
        shared.synced = true;

        debug!(incoming, shortfall, total = shared.total(), "merged remote snapshot");
    }

    pub fn total(&self) -> u64 {
        self.inner.lock().total()
    }

    pub fn count(&self, entity: &EntityCode) -> u64 {
        self.inner.lock().counts.count(entity)
    }

    /// Per-entity counts as last merged or incremented.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.inner.lock().counts.clone()
    }

    pub fn carried_shortfall(&self) -> u64 {
        self.inner.lock().carried
    }

    /// True until a remote snapshot has been merged. Local clicks alone do
    /// not end loading, and an empty snapshot does.
    pub fn is_loading(&self) -> bool {
        !self.inner.lock().synced
    }
}
