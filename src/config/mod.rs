//! Configuration module for the timeline-media-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Resolving the target string into an account or post
//! - The per-run download scope (limits, filters, destination)
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod scope;
pub mod target;
pub mod validation;

pub use loader::{ApiConfig, CacheConfig, Config, CredentialConfig, OptionsConfig, TargetConfig};
pub use modes::SchedulingMode;
pub use scope::{
    clamp_concurrency, normalize_identity, DownloadScope, DEFAULT_CONCURRENCY, MAX_CONCURRENCY,
    SYSTEM_MAX_POSTS,
};
pub use target::{parse_target, Target};
pub use validation::{validate_config, validate_identity};
