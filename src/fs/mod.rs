//! Filesystem module.
//!
//! Provides:
//! - Path and directory management
//! - Filename generation and sanitizing

pub mod naming;
pub mod paths;

pub use naming::{media_filename, partial_path, sanitize_filename, sanitize_path_component};
pub use paths::{ensure_dir, get_account_folder, get_media_folder};
