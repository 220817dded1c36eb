//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Coalesced progress snapshots and the bar that follows them
//! - Statistics reporting

pub mod aggregator;
pub mod console;
pub mod progress;
pub mod stats;

pub use aggregator::{ProgressAggregator, ProgressSnapshot, FLUSH_INTERVAL};
pub use console::{
    print_banner, print_error, print_info, print_run_summary, print_success, print_warning,
};
pub use progress::{create_spinner, walk_message, SnapshotBar};
pub use stats::{print_download_summary, print_walk_result};
