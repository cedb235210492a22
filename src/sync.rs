//! Wall-clock aligned polling of the remote counters.
//!
//! Every client wakes at the same epoch multiples of the sync period, so the
//! whole population reads fresh data at roughly the same moments without any
//! server-side coordination. The timer has two stages: a one-shot wait for
//! the first boundary (`Aligning`), then a fixed-period repeat (`Active`).

use crate::gateway::CounterGateway;
use crate::models::CounterSnapshot;
use crate::shared::SharedCounterStore;
use chrono::Utc;
use parking_lot::Mutex;
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep_until},
};
use tracing::{debug, info, warn};

pub const SYNC_PERIOD: Duration = Duration::from_millis(5000);
pub const ALIGNMENT_BUFFER: Duration = Duration::from_millis(10);

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// First period boundary strictly after `now_ms`, plus `buffer_ms`.
pub fn next_alignment(now_ms: u64, period_ms: u64, buffer_ms: u64) -> u64 {
    let period_ms = period_ms.max(1);
    (now_ms / period_ms + 1) * period_ms + buffer_ms
}

#[derive(Debug, Clone, Copy)]
pub struct SyncTiming {
    pub period: Duration,
    pub buffer: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            period: SYNC_PERIOD,
            buffer: ALIGNMENT_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Aligning { wake_at_ms: u64 },
    Active,
    Stopped,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Idle => f.write_str("idle"),
            SyncPhase::Aligning { .. } => f.write_str("aligning"),
            SyncPhase::Active => f.write_str("active"),
            SyncPhase::Stopped => f.write_str("stopped"),
        }
    }
}

struct SyncInner {
    store: SharedCounterStore,
    gateway: Arc<dyn CounterGateway>,
    clock: Arc<dyn Clock>,
    timing: SyncTiming,
    phase: Mutex<SyncPhase>,
}

impl SyncInner {
    /// One-shot wait for the aligned boundary, then the fixed-period repeat.
    /// Both are anchored on `wake_deadline`, never on when a fetch finished.
    async fn run(self: Arc<Self>, wake_deadline: Instant) {
        sleep_until(wake_deadline).await;

        if !self.advance(SyncPhase::Active) {
            return;
        }
        info!("sync aligned, polling every {:?}", self.timing.period);
        self.fetch_and_merge().await;

        let mut ticker = interval_at(wake_deadline + self.timing.period, self.timing.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if self.is_stopped() {
                return;
            }
            self.fetch_and_merge().await;
        }
    }

    async fn initial_fetch(self: Arc<Self>) {
        self.fetch_and_merge().await;
    }

    async fn fetch_and_merge(&self) {
        if self.is_stopped() {
            return;
        }
        match self.gateway.fetch_snapshot().await {
            Ok(snapshot) => self.merge(snapshot),
            Err(err) => warn!("skipping sync tick, keeping previous counts: {err}"),
        }
    }

    /// Holds the phase lock across the merge so a concurrent deactivate
    /// either waits for it or prevents it.
    fn merge(&self, snapshot: CounterSnapshot) {
        let phase = self.phase.lock();
        if *phase == SyncPhase::Stopped {
            debug!("discarding snapshot that arrived after shutdown");
            return;
        }
        self.store.replace_all(snapshot);
    }

    fn advance(&self, next: SyncPhase) -> bool {
        let mut phase = self.phase.lock();
        if *phase == SyncPhase::Stopped {
            return false;
        }
        *phase = next;
        true
    }

    fn is_stopped(&self) -> bool {
        *self.phase.lock() == SyncPhase::Stopped
    }
}

/// Drives `Idle -> Aligning -> Active -> Stopped`.
pub struct SyncScheduler {
    inner: Arc<SyncInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(
        store: SharedCounterStore,
        gateway: Arc<dyn CounterGateway>,
        clock: Arc<dyn Clock>,
        timing: SyncTiming,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                store,
                gateway,
                clock,
                timing,
                phase: Mutex::new(SyncPhase::Idle),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Fetches immediately, then waits for the next period boundary. Must be
    /// called from within a tokio runtime.
    pub fn activate(&self) {
        let wake_deadline = {
            let mut phase = self.inner.phase.lock();
            let current = *phase;
            if current != SyncPhase::Idle {
                warn!(phase = %current, "sync scheduler already activated");
                return;
            }
            let now = self.inner.clock.now_ms();
            let wake_at_ms = next_alignment(
                now,
                self.inner.timing.period.as_millis() as u64,
                self.inner.timing.buffer.as_millis() as u64,
            );
            *phase = SyncPhase::Aligning { wake_at_ms };
            info!(now, wake_at_ms, "sync scheduler activated");
            Instant::now() + Duration::from_millis(wake_at_ms - now)
        };

        // The first fetch runs beside the timer so a slow response cannot
        // delay the aligned wake-up.
        let initial = tokio::spawn(Arc::clone(&self.inner).initial_fetch());
        let timer = tokio::spawn(Arc::clone(&self.inner).run(wake_deadline));
        self.tasks.lock().extend([initial, timer]);
    }

    /// Cancels all pending timers. Once this returns, no fetch result will
    /// touch the store. Safe to call repeatedly.
    pub fn deactivate(&self) {
        {
            let mut phase = self.inner.phase.lock();
            if *phase == SyncPhase::Stopped {
                return;
            }
            *phase = SyncPhase::Stopped;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("sync scheduler stopped");
    }

    pub fn phase(&self) -> SyncPhase {
        *self.inner.phase.lock()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::models::EntityCode;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tokio::sync::Notify;
    use tokio::time::sleep;

    fn snapshot(entries: &[(&str, u64)]) -> CounterSnapshot {
        CounterSnapshot::from_counts(
            entries
                .iter()
                .map(|(raw, count)| (EntityCode::parse(raw).unwrap(), *count))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    /// Epoch clock that follows tokio's (pausable) time.
    struct VirtualClock {
        epoch_ms: u64,
        origin: Instant,
    }

    impl VirtualClock {
        fn starting_at(epoch_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                epoch_ms,
                origin: Instant::now(),
            })
        }
    }

    impl Clock for VirtualClock {
        fn now_ms(&self) -> u64 {
            self.epoch_ms + self.origin.elapsed().as_millis() as u64
        }
    }

    /// Records when each fetch happened and replies with a fixed result.
    struct RecordingGateway {
        clock: Arc<dyn Clock>,
        fetched_at: Mutex<Vec<u64>>,
        fail: bool,
        first_delay: Duration,
    }

    #[async_trait]
    impl CounterGateway for RecordingGateway {
        async fn fetch_snapshot(&self) -> Result<CounterSnapshot, FetchError> {
            let is_first = {
                let mut fetched_at = self.fetched_at.lock();
                fetched_at.push(self.clock.now_ms());
                fetched_at.len() == 1
            };
            if is_first {
                sleep(self.first_delay).await;
            }
            if self.fail {
                Err(FetchError::Timeout)
            } else {
                Ok(snapshot(&[("TR", 5), ("US", 10)]))
            }
        }

        fn report_increment(&self, _entity: &EntityCode) {}
    }

    fn recording(clock: Arc<dyn Clock>, fail: bool) -> Arc<RecordingGateway> {
        slow_first(clock, fail, Duration::ZERO)
    }

    fn slow_first(clock: Arc<dyn Clock>, fail: bool, first_delay: Duration) -> Arc<RecordingGateway> {
        Arc::new(RecordingGateway {
            clock,
            fetched_at: Mutex::new(Vec::new()),
            fail,
            first_delay,
        })
    }

    /// Blocks every fetch until released.
    struct StalledGateway {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CounterGateway for StalledGateway {
        async fn fetch_snapshot(&self) -> Result<CounterSnapshot, FetchError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(snapshot(&[("TR", 100)]))
        }

        fn report_increment(&self, _entity: &EntityCode) {}
    }

    #[test]
    fn alignment_picks_next_boundary_plus_buffer() {
        assert_eq!(next_alignment(12_345, 5_000, 10), 15_010);
        assert_eq!(next_alignment(15_000, 5_000, 10), 20_010);
        assert_eq!(next_alignment(0, 5_000, 10), 5_010);
        assert_eq!(next_alignment(19_999, 5_000, 0), 20_000);
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_on_activation_then_on_wall_clock_boundaries() {
        let clock: Arc<dyn Clock> = VirtualClock::starting_at(12_345);
        let gateway = recording(Arc::clone(&clock), false);
        let store = SharedCounterStore::new();
        let scheduler = SyncScheduler::new(
            store.clone(),
            gateway.clone(),
            Arc::clone(&clock),
            SyncTiming::default(),
        );

        scheduler.activate();
        assert_eq!(scheduler.phase(), SyncPhase::Aligning { wake_at_ms: 15_010 });

        sleep(Duration::from_millis(11_000)).await;
        assert_eq!(*gateway.fetched_at.lock(), vec![12_345, 15_010, 20_010]);
        assert_eq!(scheduler.phase(), SyncPhase::Active);
        assert_eq!(store.total(), 15);

        scheduler.deactivate();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_first_fetch_does_not_shift_boundaries() {
        let clock: Arc<dyn Clock> = VirtualClock::starting_at(12_345);
        let gateway = slow_first(Arc::clone(&clock), false, Duration::from_millis(4_000));
        let store = SharedCounterStore::new();
        let scheduler = SyncScheduler::new(
            store.clone(),
            gateway.clone(),
            Arc::clone(&clock),
            SyncTiming::default(),
        );

        scheduler.activate();
        sleep(Duration::from_millis(14_000)).await;

        assert_eq!(
            *gateway.fetched_at.lock(),
            vec![12_345, 15_010, 20_010, 25_010]
        );
        assert_eq!(store.total(), 15);
        scheduler.deactivate();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_leaves_store_and_keeps_ticking() {
        let clock: Arc<dyn Clock> = VirtualClock::starting_at(1_000);
        let gateway = recording(Arc::clone(&clock), true);
        let store = SharedCounterStore::new();
        store.increment(&EntityCode::parse("TR").unwrap());
        let scheduler = SyncScheduler::new(
            store.clone(),
            gateway.clone(),
            Arc::clone(&clock),
            SyncTiming::default(),
        );

        scheduler.activate();
        sleep(Duration::from_millis(9_500)).await;

        assert_eq!(*gateway.fetched_at.lock(), vec![1_000, 5_010, 10_010]);
        assert_eq!(store.total(), 1);
        assert_eq!(store.count(&EntityCode::parse("TR").unwrap()), 1);
        scheduler.deactivate();
    }

    #[tokio::test(start_paused = true)]
    async fn no_fetches_after_deactivate() {
        let clock: Arc<dyn Clock> = VirtualClock::starting_at(12_345);
        let gateway = recording(Arc::clone(&clock), false);
        let scheduler = SyncScheduler::new(
            SharedCounterStore::new(),
            gateway.clone(),
            Arc::clone(&clock),
            SyncTiming::default(),
        );

        scheduler.activate();
        sleep(Duration::from_millis(100)).await;
        scheduler.deactivate();
        scheduler.deactivate();
        assert_eq!(scheduler.phase(), SyncPhase::Stopped);

        sleep(Duration::from_millis(30_000)).await;
        assert_eq!(*gateway.fetched_at.lock(), vec![12_345]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_fetch_is_dropped_on_deactivate() {
        let gateway = Arc::new(StalledGateway {
            started: Notify::new(),
            release: Notify::new(),
        });
        let store = SharedCounterStore::new();
        let scheduler = SyncScheduler::new(
            store.clone(),
            gateway.clone(),
            VirtualClock::starting_at(0),
            SyncTiming::default(),
        );

        scheduler.activate();
        gateway.started.notified().await;
        scheduler.deactivate();
        gateway.release.notify_waiters();

        sleep(Duration::from_millis(20_000)).await;
        assert_eq!(store.total(), 0);
        assert!(store.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn activate_is_ignored_after_stop() {
        let clock: Arc<dyn Clock> = VirtualClock::starting_at(0);
        let gateway = recording(Arc::clone(&clock), false);
        let scheduler = SyncScheduler::new(
            SharedCounterStore::new(),
            gateway.clone(),
            clock,
            SyncTiming::default(),
        );

        scheduler.deactivate();
        scheduler.activate();
        sleep(Duration::from_millis(10_000)).await;
        assert_eq!(scheduler.phase(), SyncPhase::Stopped);
        assert!(gateway.fetched_at.lock().is_empty());
    }

    #[tokio::test]
    async fn merge_after_stop_is_discarded() {
        let store = SharedCounterStore::new();
        let scheduler = SyncScheduler::new(
            store.clone(),
            Arc::new(StalledGateway {
                started: Notify::new(),
                release: Notify::new(),
            }),
            Arc::new(SystemClock),
            SyncTiming::default(),
        );
        scheduler.deactivate();

        scheduler.inner.merge(snapshot(&[("TR", 3)]));
        assert_eq!(store.total(), 0);
    }
}
