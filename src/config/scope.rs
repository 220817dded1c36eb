//! The configuration record consumed by the walker and orchestrator.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::paths::{get_account_folder, get_media_folder};
use crate::media::MediaKind;

/// Upper bound on posts scanned in one walk, whatever the caller asks for.
pub const SYSTEM_MAX_POSTS: u32 = 3200;

/// Upper bound on concurrent downloads.
pub const MAX_CONCURRENCY: usize = 8;

/// Concurrency used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Normalize an account identity: trim, strip a leading `@`, lowercase.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Clamp a requested concurrency into `[1, MAX_CONCURRENCY]`.
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

/// What to download for one account and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadScope {
    identity: String,
    max_posts: u32,
    include_photos: bool,
    include_videos: bool,
    own_posts_only: bool,
    destination_root: PathBuf,
}

impl DownloadScope {
    /// Create a scope with every category enabled and the maximum post limit.
    pub fn new(identity: &str, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            identity: normalize_identity(identity),
            max_posts: SYSTEM_MAX_POSTS,
            include_photos: true,
            include_videos: true,
            own_posts_only: false,
            destination_root: destination_root.into(),
        }
    }

    pub fn with_max_posts(mut self, max_posts: u32) -> Self {
        self.max_posts = max_posts;
        self
    }

    pub fn with_photos(mut self, include: bool) -> Self {
        self.include_photos = include;
        self
    }

    pub fn with_videos(mut self, include: bool) -> Self {
        self.include_videos = include;
        self
    }

    pub fn with_own_posts_only(mut self, own_only: bool) -> Self {
        self.own_posts_only = own_only;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn include_photos(&self) -> bool {
        self.include_photos
    }

    pub fn include_videos(&self) -> bool {
        self.include_videos
    }

    pub fn own_posts_only(&self) -> bool {
        self.own_posts_only
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Number of posts a walk may scan: `max(1, min(requested, SYSTEM_MAX_POSTS))`.
    pub fn scan_limit(&self) -> u32 {
        self.max_posts.min(SYSTEM_MAX_POSTS).max(1)
    }

    /// Case-insensitive comparison against the target identity.
    pub fn matches_identity(&self, author: &str) -> bool {
        normalize_identity(author) == self.identity
    }

    pub fn account_dir(&self) -> Result<PathBuf> {
        get_account_folder(&self.destination_root, &self.identity)
    }

    pub fn media_dir(&self, kind: MediaKind) -> Result<PathBuf> {
        get_media_folder(&self.destination_root, &self.identity, kind)
    }
}
