//! Per-item download state and run results.

use std::fmt;
use std::path::PathBuf;

use crate::media::MediaDownloadTask;

/// Failure reason recorded when cancellation stops a task.
pub const CANCELLED_REASON: &str = "Cancelled";

/// State of one task within a run.
///
/// `Queued → Downloading → [Converting] → {Succeeded | Skipped | Failed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadItemState {
    Queued,
    Downloading,
    Converting,
    Succeeded(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

impl DownloadItemState {
    pub fn cancelled() -> Self {
        DownloadItemState::Failed(CANCELLED_REASON.to_string())
    }

    /// No further transitions happen from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadItemState::Succeeded(_)
                | DownloadItemState::Skipped(_)
                | DownloadItemState::Failed(_)
        )
    }

    /// Whether this is the failure produced by cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DownloadItemState::Failed(reason) if reason == CANCELLED_REASON)
    }

    /// Position in the state machine, used to check forward-only progress.
    pub fn rank(&self) -> u8 {
        match self {
            DownloadItemState::Queued => 0,
            DownloadItemState::Downloading => 1,
            DownloadItemState::Converting => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for DownloadItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadItemState::Queued => write!(f, "queued"),
            DownloadItemState::Downloading => write!(f, "downloading"),
            DownloadItemState::Converting => write!(f, "converting"),
            DownloadItemState::Succeeded(path) => write!(f, "saved {}", path.display()),
            DownloadItemState::Skipped(path) => write!(f, "skipped {}", path.display()),
            DownloadItemState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of one timeline walk.
#[derive(Debug, Clone, Default)]
pub struct TimelineMediaResult {
    pub tasks: Vec<MediaDownloadTask>,
    pub scanned_posts: u32,
    /// True when scanning stopped at the post limit rather than the end of the feed.
    pub reached_post_limit: bool,
}

/// One failed task in a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub task_id: String,
    pub reason: String,
}

/// Outcome counts for a run. Authoritative over any progress view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
    /// True when cancellation stopped the run before every task started.
    pub cancelled: bool,
}

impl DownloadSummary {
    /// Count one terminal outcome. Non-terminal states are ignored.
    pub fn record(&mut self, task_id: &str, state: &DownloadItemState) {
        match state {
            DownloadItemState::Succeeded(_) => self.succeeded += 1,
            DownloadItemState::Skipped(_) => self.skipped += 1,
            DownloadItemState::Failed(reason) => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    task_id: task_id.to_string(),
                    reason: reason.clone(),
                });
            }
            _ => return,
        }
        self.total += 1;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!DownloadItemState::Queued.is_terminal());
        assert!(!DownloadItemState::Downloading.is_terminal());
        assert!(!DownloadItemState::Converting.is_terminal());
        assert!(DownloadItemState::Succeeded(PathBuf::from("a")).is_terminal());
        assert!(DownloadItemState::Skipped(PathBuf::from("a")).is_terminal());
        assert!(DownloadItemState::cancelled().is_terminal());
        assert!(DownloadItemState::cancelled().is_cancellation());
        assert!(!DownloadItemState::Failed("boom".into()).is_cancellation());
    }

    #[test]
    fn test_summary_counts_terminal_outcomes() {
        let mut summary = DownloadSummary::default();
        summary.record("a", &DownloadItemState::Queued);
        summary.record("a", &DownloadItemState::Succeeded(PathBuf::from("a.jpg")));
        summary.record("b", &DownloadItemState::Skipped(PathBuf::from("b.jpg")));
        summary.record("c", &DownloadItemState::Failed("HTTP 404".into()));

        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.total,
            summary.succeeded + summary.skipped + summary.failed
        );
        assert_eq!(
            summary.failures,
            vec![FailureRecord {
                task_id: "c".into(),
                reason: "HTTP 404".into()
            }]
        );
        assert!(summary.has_failures());
    }
}
