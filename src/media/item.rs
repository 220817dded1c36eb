//! Media download task representation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of media attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedImage,
}

impl MediaKind {
    /// Parse the upstream media `type` field.
    pub fn from_api(value: &str) -> Option<Self> {
        match value {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            "animated_gif" => Some(MediaKind::AnimatedImage),
            _ => None,
        }
    }

    /// Get the folder name for this media kind.
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photos",
            MediaKind::Video | MediaKind::AnimatedImage => "videos",
        }
    }

    /// Videos and animated images share one download path.
    pub fn is_video_like(&self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::AnimatedImage)
    }

    fn dedup_class(&self) -> &'static str {
        if self.is_video_like() {
            "video"
        } else {
            "photo"
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::AnimatedImage => write!(f, "animated image"),
        }
    }
}

/// A single unit of download work.
///
/// The identity is `<postID>_<mediaID>`, stable across runs for the same upstream
/// content, which is what lets the existence check act as a resume mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDownloadTask {
    id: String,
    post_id: String,
    media_id: String,
    source_url: String,
    kind: MediaKind,
    destination: PathBuf,
}

impl MediaDownloadTask {
    pub fn new(
        post_id: impl Into<String>,
        media_id: impl Into<String>,
        source_url: impl Into<String>,
        kind: MediaKind,
        destination: impl Into<PathBuf>,
    ) -> Self {
        let post_id = post_id.into();
        let media_id = media_id.into();
        Self {
            id: format!("{}_{}", post_id, media_id),
            post_id,
            media_id,
            source_url: source_url.into(),
            kind,
            destination: destination.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Key used to suppress duplicate tasks within one walk: `kind | source URL`.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.kind.dedup_class(), self.source_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_post_and_media() {
        let task = MediaDownloadTask::new(
            "100",
            "3_200",
            "https://example.com/a.jpg",
            MediaKind::Photo,
            "/tmp/a.jpg",
        );
        assert_eq!(task.id(), "100_3_200");
        assert_eq!(task.post_id(), "100");
        assert_eq!(task.media_id(), "3_200");
    }

    #[test]
    fn test_dedup_key_treats_animated_as_video() {
        let video = MediaDownloadTask::new("1", "a", "u", MediaKind::Video, "/x.mp4");
        let gif = MediaDownloadTask::new("2", "b", "u", MediaKind::AnimatedImage, "/y.mp4");
        let photo = MediaDownloadTask::new("3", "c", "u", MediaKind::Photo, "/z.jpg");
        assert_eq!(video.dedup_key(), gif.dedup_key());
        assert_ne!(video.dedup_key(), photo.dedup_key());
    }

    #[test]
    fn test_media_kind_from_api() {
        assert_eq!(MediaKind::from_api("photo"), Some(MediaKind::Photo));
        assert_eq!(
            MediaKind::from_api("animated_gif"),
            Some(MediaKind::AnimatedImage)
        );
        assert_eq!(MediaKind::from_api("audio"), None);
        assert_eq!(MediaKind::AnimatedImage.folder_name(), "videos");
    }
}
