//! Download orchestration: run a work list to terminal states with bounded concurrency.

use std::path::Path;
use std::sync::Arc;

use futures::future::{self, join_all};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::{clamp_concurrency, SchedulingMode};
use crate::download::m3u8::Transcoder;
use crate::download::state::{DownloadItemState, DownloadSummary};
use crate::download::transfer::MediaFetcher;
use crate::error::{Error, Result};
use crate::fs::ensure_dir;
use crate::media::{MediaDownloadTask, MediaKind, VideoTransport};

/// Receives `(task id, new state)` on every transition. Called from concurrent tasks.
pub type StateCallback = Arc<dyn Fn(&str, &DownloadItemState) + Send + Sync>;

/// Executes download tasks.
pub struct Orchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn Transcoder>,
    scheduling: SchedulingMode,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            fetcher,
            transcoder,
            scheduling: SchedulingMode::default(),
        }
    }

    pub fn with_scheduling(mut self, scheduling: SchedulingMode) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Run every task to a terminal state and summarize.
    ///
    /// All tasks are announced as queued first. Cancellation stops new tasks from
    /// starting; tasks that never started are left out of the summary, which then has
    /// `cancelled` set. A transfer or export already underway is raced against the
    /// cancellation signal, so it usually ends as a "Cancelled" failure but may still
    /// complete if it finishes first.
    pub async fn run(
        &self,
        tasks: &[MediaDownloadTask],
        concurrency: usize,
        cancel: &CancellationToken,
        on_state: &StateCallback,
    ) -> DownloadSummary {
        let limit = clamp_concurrency(concurrency);

        for task in tasks {
            on_state(task.id(), &DownloadItemState::Queued);
        }

        tracing::info!(
            "Downloading {} media items ({} at a time, {} scheduling)",
            tasks.len(),
            limit,
            self.scheduling
        );

        let mut summary = match self.scheduling {
            SchedulingMode::Batch => self.run_batches(tasks, limit, cancel, on_state).await,
            SchedulingMode::Pool => self.run_pool(tasks, limit, cancel, on_state).await,
        };

        summary.cancelled = cancel.is_cancelled();
        if summary.cancelled {
            tracing::warn!(
                "Cancelled: {} of {} tasks ran",
                summary.total,
                tasks.len()
            );
        }

        summary
    }

    /// Consecutive batches of `limit` tasks with a barrier between batches.
    async fn run_batches(
        &self,
        tasks: &[MediaDownloadTask],
        limit: usize,
        cancel: &CancellationToken,
        on_state: &StateCallback,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        for (index, batch) in tasks.chunks(limit).enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            tracing::debug!("Starting batch {} ({} tasks)", index + 1, batch.len());

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|task| self.process(task, cancel, on_state)),
            )
            .await;

            for (task, state) in batch.iter().zip(outcomes) {
                summary.record(task.id(), &state);
            }
        }

        summary
    }

    /// Bounded pool that starts the next task as soon as any running task finishes.
    async fn run_pool(
        &self,
        tasks: &[MediaDownloadTask],
        limit: usize,
        cancel: &CancellationToken,
        on_state: &StateCallback,
    ) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        let mut outcomes = futures::stream::iter(tasks)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|task| async move { (task, self.process(task, cancel, on_state).await) })
            .buffer_unordered(limit);

        while let Some((task, state)) = outcomes.next().await {
            summary.record(task.id(), &state);
        }

        summary
    }

    /// Drive one task through its pipeline and report the terminal state.
    async fn process(
        &self,
        task: &MediaDownloadTask,
        cancel: &CancellationToken,
        on_state: &StateCallback,
    ) -> DownloadItemState {
        let state = match self.execute(task, cancel, on_state).await {
            Ok(state) => state,
            Err(e) => {
                if e.is_cancelled() {
                    tracing::debug!("{} cancelled", task.id());
                } else {
                    tracing::warn!("Failed to download {}: {}", task.id(), e);
                }
                DownloadItemState::Failed(e.to_string())
            }
        };

        on_state(task.id(), &state);
        state
    }

    async fn execute(
        &self,
        task: &MediaDownloadTask,
        cancel: &CancellationToken,
        on_state: &StateCallback,
    ) -> Result<DownloadItemState> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let destination = task.destination();
        if tokio::fs::try_exists(destination).await? {
            tracing::debug!("Skipping existing file: {}", destination.display());
            return Ok(DownloadItemState::Skipped(destination.to_path_buf()));
        }

        if let Some(parent) = destination.parent() {
            ensure_dir(parent).await?;
        }

        on_state(task.id(), &DownloadItemState::Downloading);

        match task.kind() {
            MediaKind::Photo => self.fetch(task.source_url(), destination, cancel).await?,
            MediaKind::Video | MediaKind::AnimatedImage => {
                match VideoTransport::classify(task.source_url()) {
                    VideoTransport::Mp4 => {
                        self.fetch(task.source_url(), destination, cancel).await?
                    }
                    VideoTransport::Hls => {
                        on_state(task.id(), &DownloadItemState::Converting);
                        self.transcoder
                            .transcode(task.source_url(), destination, cancel)
                            .await?
                    }
                    VideoTransport::Unsupported => return Err(Error::UnsupportedFormat),
                }
            }
        }

        tracing::debug!("Saved {}", destination.display());
        Ok(DownloadItemState::Succeeded(destination.to_path_buf()))
    }

    async fn fetch(&self, url: &str, destination: &Path, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.fetcher.fetch_to_file(url, destination) => result,
        }
    }
}
