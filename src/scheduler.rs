//! Debounce / Refresh Scheduler
//!
//! Owns a single generation counter. Every input change bumps it, aborts the
//! pending timer and arms a new one: wait out the debounce, run a cycle,
//! then re-run every refresh interval.
//!
//! Aborting a timer task stops its cycle at the next await point, so most
//! superseded timer cycles never reach their commit. The abort is not the
//! guard though. Each cycle carries a [`CycleTicket`] for the generation it
//! started in and may only commit while that ticket is still current. That
//! check is what protects cycles run outside a timer task (see
//! [`RefreshScheduler::claim`]) and timer cycles already past their last
//! await when the bump lands.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default wait after the last input change
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

/// Default period between refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Generation a cycle was started in
#[derive(Debug, Clone)]
pub struct CycleTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl CycleTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a newer schedule or a cancel has happened
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Work performed by each scheduled cycle
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self, ticket: CycleTicket);
}

pub struct RefreshScheduler<R: CycleRunner> {
    runner: Arc<R>,
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    debounce: Duration,
    refresh_interval: Duration,
}

impl<R: CycleRunner> RefreshScheduler<R> {
    pub fn new(runner: Arc<R>, debounce: Duration, refresh_interval: Duration) -> Self {
        Self {
            runner,
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            debounce,
            refresh_interval,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Inputs changed: supersede everything and start a debounced cycle
    pub fn schedule(&self) -> u64 {
        self.arm(self.debounce)
    }

    /// Run a cycle now and restart the refresh period from it
    pub fn refresh_now(&self) -> u64 {
        self.arm(Duration::ZERO)
    }

    /// Stop all pending and periodic cycles
    pub fn cancel(&self) {
        self.claim();
    }

    /// Supersede everything and hand out a ticket for a cycle the caller
    /// runs itself. No timer is armed.
    pub fn claim(&self) -> CycleTicket {
        let mut timer = self.lock_timer();
        self.supersede(&mut timer)
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn supersede(&self, timer: &mut Option<JoinHandle<()>>) -> CycleTicket {
        // Bump before the old timer is aborted so an in-flight cycle sees
        // itself superseded even if it is past its last await point.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        CycleTicket {
            generation,
            current: self.generation.clone(),
        }
    }

    fn arm(&self, delay: Duration) -> u64 {
        let mut timer = self.lock_timer();
        let ticket = self.supersede(&mut timer);
        let generation = ticket.generation();
        let runner = self.runner.clone();
        let refresh_interval = self.refresh_interval;

        debug!("Generation {} armed, first cycle in {:?}", generation, delay);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            loop {
                if !ticket.is_current() {
                    break;
                }
                runner.run_cycle(ticket.clone()).await;
                if !ticket.is_current() {
                    break;
                }
                tokio::time::sleep(refresh_interval).await;
            }
        }));

        generation
    }
}

impl<R: CycleRunner> Drop for RefreshScheduler<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the generation of every cycle it runs
    #[derive(Default)]
    struct Recorder {
        runs: Mutex<Vec<u64>>,
        value: AtomicU64,
        seen_values: Mutex<Vec<u64>>,
    }

    impl Recorder {
        fn runs(&self) -> Vec<u64> {
            self.runs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CycleRunner for Recorder {
        async fn run_cycle(&self, ticket: CycleTicket) {
            self.runs.lock().unwrap().push(ticket.generation());
            self.seen_values
                .lock()
                .unwrap()
                .push(self.value.load(Ordering::SeqCst));
        }
    }

    /// Takes a while and only commits if still current
    #[derive(Default)]
    struct SlowCommitter {
        committed: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl CycleRunner for SlowCommitter {
        async fn run_cycle(&self, ticket: CycleTicket) {
            tokio::time::sleep(Duration::from_secs(5)).await;
            if ticket.is_current() {
                self.committed.lock().unwrap().push(ticket.generation());
            }
        }
    }

    fn scheduler<R: CycleRunner>(runner: Arc<R>) -> RefreshScheduler<R> {
        RefreshScheduler::new(runner, DEFAULT_DEBOUNCE, DEFAULT_REFRESH_INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_within_debounce_run_once_with_final_value() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        recorder.value.store(100, Ordering::SeqCst);
        scheduler.schedule();
        tokio::time::sleep(Duration::from_millis(400)).await;

        recorder.value.store(200, Ordering::SeqCst);
        scheduler.schedule();
        tokio::time::sleep(Duration::from_millis(400)).await;

        recorder.value.store(300, Ordering::SeqCst);
        let last = scheduler.schedule();

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert!(recorder.runs().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.runs(), vec![last]);
        assert_eq!(*recorder.seen_values.lock().unwrap(), vec![300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_rearms_after_each_cycle() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        let generation = scheduler.schedule();
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(recorder.runs().len(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(recorder.runs().len(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(recorder.runs(), vec![generation; 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_change_cancels_refresh() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        let first = scheduler.schedule();
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(recorder.runs(), vec![first]);

        // change inputs 20s into the refresh period
        tokio::time::sleep(Duration::from_secs(20)).await;
        let second = scheduler.schedule();

        // the old refresh (due at ~33s) never fires; the new debounce does
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(recorder.runs(), vec![first, second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_everything() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        scheduler.schedule();
        scheduler.cancel();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(recorder.runs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_supersedes_timers() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        let armed = scheduler.schedule();
        let ticket = scheduler.claim();
        assert_eq!(ticket.generation(), armed + 1);
        assert!(ticket.is_current());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(recorder.runs().is_empty());

        scheduler.schedule();
        assert!(!ticket.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_skips_debounce() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = scheduler(recorder.clone());

        let generation = scheduler.refresh_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.runs(), vec![generation]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_does_not_commit() {
        let committer = Arc::new(SlowCommitter::default());
        let scheduler = scheduler(committer.clone());

        // claimed cycles run on the caller's task, so nothing aborts them
        let stale = scheduler.claim();
        let (_, fresh) = tokio::join!(committer.run_cycle(stale.clone()), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            scheduler.claim()
        });
        assert!(!stale.is_current());
        assert!(committer.committed.lock().unwrap().is_empty());

        committer.run_cycle(fresh.clone()).await;
        assert_eq!(*committer.committed.lock().unwrap(), vec![fresh.generation()]);
    }
}
