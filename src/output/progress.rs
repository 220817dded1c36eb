//! Progress bar utilities.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::download::timeline::WalkProgress;
use crate::output::aggregator::ProgressSnapshot;

/// Create a spinner for long-running operations.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Spinner message for a timeline walk in progress.
pub fn walk_message(progress: &WalkProgress) -> String {
    format!(
        "Scanning timeline: {} posts, {} media found ({} pages)",
        progress.scanned_posts, progress.tasks_found, progress.pages_fetched
    )
}

/// Create a progress bar for item counts.
pub fn create_item_bar(total: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                message
            ))
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}

/// Item bar driven by published progress snapshots.
pub struct SnapshotBar {
    bar: ProgressBar,
    updater: JoinHandle<()>,
}

impl SnapshotBar {
    /// Start following `snapshots` until [`SnapshotBar::finish`] or the publisher goes away.
    pub fn start(total: usize, mut snapshots: watch::Receiver<ProgressSnapshot>) -> Self {
        let bar = create_item_bar(total as u64, "Downloading");
        bar.enable_steady_tick(std::time::Duration::from_millis(100));

        let follower = bar.clone();
        let updater = tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                apply_snapshot(&follower, &snapshot);
            }
        });

        Self { bar, updater }
    }

    /// Stop following and render the final snapshot.
    pub fn finish(self, snapshot: &ProgressSnapshot) {
        self.updater.abort();
        apply_snapshot(&self.bar, snapshot);
        self.bar.finish_and_clear();
    }
}

fn apply_snapshot(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    bar.set_position(snapshot.completed as u64);
    bar.set_message(snapshot_message(snapshot));
}

/// Status line for a snapshot: active and failed counts.
pub fn snapshot_message(snapshot: &ProgressSnapshot) -> String {
    if snapshot.failed > 0 {
        format!(
            "{} active, {} failed",
            snapshot.in_flight.len(),
            snapshot.failed
        )
    } else {
        format!("{} active", snapshot.in_flight.len())
    }
}
