//! Media module for task representation and URL handling.

pub mod item;
pub mod parser;

pub use item::{MediaDownloadTask, MediaKind};
pub use parser::{photo_extension, rewrite_photo_url, VideoTransport};
