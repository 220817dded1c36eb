//! Download module: from an account's timeline to files on disk.
//!
//! This module provides:
//! - Per-item state and run results
//! - The timeline walk and the single-post walk that build the work list
//! - Direct file transfer
//! - HLS conversion to MP4
//! - The orchestrator that runs the work list with bounded concurrency

pub mod m3u8;
pub mod orchestrator;
pub mod single;
pub mod state;
pub mod timeline;
pub mod transfer;

pub use m3u8::{FfmpegTranscoder, Transcoder};
pub use orchestrator::{Orchestrator, StateCallback};
pub use single::walk_single_post;
pub use state::{DownloadItemState, DownloadSummary, FailureRecord, TimelineMediaResult};
pub use timeline::{walk_timeline, WalkProgress};
pub use transfer::{HttpFetcher, MediaFetcher};
