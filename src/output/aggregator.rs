//! Coalesces per-task state events into periodic progress snapshots.
//!
//! The state callback only enqueues into a pending buffer (last write wins per task)
//! and schedules a flush if none is pending. A flush drains the buffer, applies every
//! update to the authoritative map in one pass and publishes a [`ProgressSnapshot`]
//! on a watch channel, so a slow observer only ever sees the latest merged view.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::download::orchestrator::StateCallback;
use crate::download::state::DownloadItemState;

/// Delay between the first buffered update and its flush.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(80);

/// Merged view of a run at one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Increments on every flush that applied at least one update.
    pub revision: u64,
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Task ids per bucket, in the order they entered it.
    pub queued: Vec<String>,
    pub in_flight: Vec<String>,
    pub finished: Vec<String>,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Queued,
    InFlight,
    Finished,
}

fn bucket_of(state: &DownloadItemState) -> Bucket {
    match state {
        DownloadItemState::Queued => Bucket::Queued,
        DownloadItemState::Downloading | DownloadItemState::Converting => Bucket::InFlight,
        _ => Bucket::Finished,
    }
}

#[derive(Default)]
struct PendingUpdates {
    updates: HashMap<String, DownloadItemState>,
    order: Vec<String>,
}

#[derive(Default)]
struct AggregateState {
    states: HashMap<String, DownloadItemState>,
    snapshot: ProgressSnapshot,
}

impl AggregateState {
    fn apply(&mut self, id: String, state: DownloadItemState) {
        let previous = self.states.get(&id);

        // Terminal states are final for the run
        if previous.map(DownloadItemState::is_terminal).unwrap_or(false) {
            tracing::trace!("Ignoring {} after terminal state for {}", state, id);
            return;
        }

        let old_bucket = previous.map(bucket_of);
        let new_bucket = bucket_of(&state);

        if state.is_terminal() {
            match &state {
                DownloadItemState::Succeeded(_) => self.snapshot.succeeded += 1,
                DownloadItemState::Skipped(_) => self.snapshot.skipped += 1,
                _ => self.snapshot.failed += 1,
            }
        }

        if old_bucket != Some(new_bucket) {
            if let Some(old) = old_bucket {
                self.bucket_mut(old).retain(|existing| *existing != id);
            }
            self.bucket_mut(new_bucket).push(id.clone());
        }

        self.states.insert(id, state);
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Queued => &mut self.snapshot.queued,
            Bucket::InFlight => &mut self.snapshot.in_flight,
            Bucket::Finished => &mut self.snapshot.finished,
        }
    }
}

struct Inner {
    pending: Mutex<PendingUpdates>,
    flush_scheduled: AtomicBool,
    state: Mutex<AggregateState>,
    publisher: watch::Sender<ProgressSnapshot>,
    runtime: Option<Handle>,
    interval: Duration,
}

impl Inner {
    fn record(self: &Arc<Self>, id: &str, state: &DownloadItemState) {
        {
            let mut pending = lock(&self.pending);
            if pending
                .updates
                .insert(id.to_string(), state.clone())
                .is_none()
            {
                pending.order.push(id.to_string());
            }
        }

        if !self.flush_scheduled.swap(true, Ordering::AcqRel) {
            self.schedule_flush();
        }
    }

    fn schedule_flush(self: &Arc<Self>) {
        // Without a runtime, updates wait for the final flush
        let Some(runtime) = &self.runtime else {
            return;
        };

        let inner = Arc::clone(self);
        let interval = self.interval;
        runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            inner.flush();
        });
    }

    fn flush(&self) -> ProgressSnapshot {
        // Lock order is state, then pending: a flush that drained the buffer has
        // applied it before any other flush can read the state.
        let mut state = lock(&self.state);
        self.flush_scheduled.store(false, Ordering::Release);
        let drained = std::mem::take(&mut *lock(&self.pending));

        if drained.order.is_empty() {
            return state.snapshot.clone();
        }

        let PendingUpdates { mut updates, order } = drained;
        for id in order {
            if let Some(update) = updates.remove(&id) {
                state.apply(id, update);
            }
        }

        let snapshot = &mut state.snapshot;
        snapshot.revision += 1;
        snapshot.total = snapshot.queued.len() + snapshot.in_flight.len() + snapshot.finished.len();
        snapshot.completed = snapshot.finished.len();

        let published = snapshot.clone();
        self.publisher.send_replace(published.clone());
        published
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Turns orchestrator state events into coalesced snapshots.
///
/// Cloning shares the same aggregator.
#[derive(Clone)]
pub struct ProgressAggregator {
    inner: Arc<Inner>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::with_interval(FLUSH_INTERVAL)
    }

    /// Flush timers run on the Tokio runtime current at construction, if any.
    pub fn with_interval(interval: Duration) -> Self {
        let (publisher, _) = watch::channel(ProgressSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(PendingUpdates::default()),
                flush_scheduled: AtomicBool::new(false),
                state: Mutex::new(AggregateState::default()),
                publisher,
                runtime: Handle::try_current().ok(),
                interval,
            }),
        }
    }

    /// Buffer one update. Never blocks on a flush in progress for long.
    pub fn record(&self, id: &str, state: &DownloadItemState) {
        self.inner.record(id, state);
    }

    /// Apply all buffered updates now.
    pub fn flush(&self) -> ProgressSnapshot {
        self.inner.flush()
    }

    /// Final synchronous flush once the pipeline is done.
    pub fn finish(&self) -> ProgressSnapshot {
        let snapshot = self.inner.flush();
        tracing::debug!(
            "Progress final: {}/{} done ({} ok, {} skipped, {} failed)",
            snapshot.completed,
            snapshot.total,
            snapshot.succeeded,
            snapshot.skipped,
            snapshot.failed
        );
        snapshot
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.publisher.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.publisher.borrow().clone()
    }

    /// State callback for the orchestrator that feeds this aggregator.
    pub fn callback(&self) -> StateCallback {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |id: &str, state: &DownloadItemState| inner.record(id, state))
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}
