//! Timeline Media Downloader - bulk download of an account's timeline media
//!
//! This library walks an account's media timeline (or a single post), builds a
//! deduplicated list of photo and video downloads, and runs it with bounded
//! concurrency, converting HLS streams to MP4 along the way.
//!
//! # Features
//!
//! - Paginated timeline walk with post limit, category and own-posts filters
//! - Single post downloads
//! - Skip-if-present downloads, so reruns resume where they left off
//! - HLS to MP4 conversion via ffmpeg
//! - Batch or worker-pool scheduling
//! - Coalesced progress snapshots for slow consumers
//! - Cooperative cancellation
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tokio_util::sync::CancellationToken;
//! use timeline_media_downloader::{
//!     walk_timeline, Config, FfmpegTranscoder, HttpFetcher, Orchestrator, ProgressAggregator,
//!     TimelineApi,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let api = TimelineApi::new(
//!         config.credential(),
//!         &config.options.user_agent,
//!         config.api.clone(),
//!     )?;
//!     let scope = config.scope("someone");
//!     let cancel = CancellationToken::new();
//!
//!     let walk = walk_timeline(&api, &scope, Duration::from_secs(1), &cancel, |_| {}).await?;
//!
//!     let fetcher = HttpFetcher::new(&config.options.user_agent)?;
//!     let transcoder = FfmpegTranscoder::new(fetcher.client().clone());
//!     let orchestrator = Orchestrator::new(Arc::new(fetcher), Arc::new(transcoder));
//!     let progress = ProgressAggregator::new();
//!
//!     let summary = orchestrator
//!         .run(&walk.tasks, config.concurrency(), &cancel, &progress.callback())
//!         .await;
//!     progress.finish();
//!     println!("{} saved, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

// Re-exports for convenience
pub use api::{TimelineApi, TimelineSource};
pub use config::{parse_target, Config, DownloadScope, SchedulingMode, Target};
pub use download::{
    walk_single_post, walk_timeline, DownloadItemState, DownloadSummary, FfmpegTranscoder,
    HttpFetcher, Orchestrator, StateCallback, TimelineMediaResult,
};
pub use error::{Error, Result};
pub use media::{MediaDownloadTask, MediaKind};
pub use output::{ProgressAggregator, ProgressSnapshot};
