//! Timeline walk: paginate the media timeline and build the work list.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::api::{Post, PostMedia, TimelineSource};
use crate::config::DownloadScope;
use crate::download::state::TimelineMediaResult;
use crate::error::{Error, Result};
use crate::fs::naming::media_filename;
use crate::media::{photo_extension, rewrite_photo_url, MediaDownloadTask, MediaKind};

/// Posts requested per timeline page.
pub const PAGE_SIZE: usize = 100;

/// Extension every video-like task is saved with.
const VIDEO_EXTENSION: &str = "mp4";

/// Progress reported after each fetched page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkProgress {
    pub pages_fetched: u32,
    pub scanned_posts: u32,
    pub tasks_found: usize,
}

/// Build the download task for one media item, or `None` if its category is disabled.
pub fn build_task(
    scope: &DownloadScope,
    post_id: &str,
    media: &PostMedia,
) -> Result<Option<MediaDownloadTask>> {
    let (source_url, extension) = match media.kind {
        MediaKind::Photo => {
            if !scope.include_photos() {
                return Ok(None);
            }
            let url = rewrite_photo_url(&media.url);
            let extension = photo_extension(&url);
            (url, extension)
        }
        MediaKind::Video | MediaKind::AnimatedImage => {
            if !scope.include_videos() {
                return Ok(None);
            }
            (media.url.clone(), VIDEO_EXTENSION.to_string())
        }
    };

    let destination = scope
        .media_dir(media.kind)?
        .join(media_filename(post_id, &media.id, &extension));

    Ok(Some(MediaDownloadTask::new(
        post_id,
        media.id.clone(),
        source_url,
        media.kind,
        destination,
    )))
}

/// Accumulates tasks for one walk, applying the author filter and dedup.
pub(crate) struct TaskCollector<'a> {
    scope: &'a DownloadScope,
    seen: HashSet<String>,
    tasks: Vec<MediaDownloadTask>,
}

impl<'a> TaskCollector<'a> {
    pub(crate) fn new(scope: &'a DownloadScope) -> Self {
        Self {
            scope,
            seen: HashSet::new(),
            tasks: Vec::new(),
        }
    }

    /// Add the tasks for a post. Returns how many new tasks were added.
    pub(crate) fn add_post(&mut self, post: &Post) -> Result<usize> {
        if self.scope.own_posts_only() {
            let own = post
                .author
                .as_deref()
                .map(|author| self.scope.matches_identity(author))
                .unwrap_or(false);
            if !own {
                tracing::debug!("Skipping post {} by {:?}", post.id, post.author);
                return Ok(0);
            }
        }

        let mut added = 0;
        for media in &post.media {
            let Some(task) = build_task(self.scope, &post.id, media)? else {
                continue;
            };
            if self.seen.insert(task.dedup_key()) {
                self.tasks.push(task);
                added += 1;
            } else {
                tracing::debug!("Skipping duplicate media {} in post {}", media.id, post.id);
            }
        }

        Ok(added)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn into_tasks(self) -> Vec<MediaDownloadTask> {
        self.tasks
    }
}

/// Walk the media timeline of the scope's account.
///
/// Stops when the scan limit is reached, a page comes back empty, or no next cursor is
/// returned. Page fetch errors are fatal and not retried. Cancellation is checked before
/// every page and returns [`Error::Cancelled`] instead of a partial result.
pub async fn walk_timeline<F>(
    source: &dyn TimelineSource,
    scope: &DownloadScope,
    page_delay: Duration,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<TimelineMediaResult>
where
    F: FnMut(WalkProgress),
{
    let limit = scope.scan_limit();
    let mut collector = TaskCollector::new(scope);
    let mut cursor: Option<String> = None;
    let mut progress = WalkProgress::default();
    let mut reached_post_limit = false;

    tracing::info!(
        "Scanning timeline of {} (up to {} posts)...",
        scope.identity(),
        limit
    );

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if progress.scanned_posts >= limit {
            reached_post_limit = true;
            break;
        }

        if progress.pages_fetched > 0 {
            page_pause(page_delay, cancel).await?;
        }

        let page = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            page = source.media_page(scope.identity(), cursor.as_deref(), PAGE_SIZE) => page?,
        };
        progress.pages_fetched += 1;

        if page.posts.is_empty() {
            tracing::debug!("Empty page, timeline exhausted");
            break;
        }

        for post in &page.posts {
            if progress.scanned_posts >= limit {
                reached_post_limit = true;
                break;
            }
            progress.scanned_posts += 1;
            collector.add_post(post)?;
        }

        progress.tasks_found = collector.len();
        on_progress(progress);

        if reached_post_limit {
            break;
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                tracing::debug!("No next cursor, timeline exhausted");
                break;
            }
        }
    }

    tracing::info!(
        "Timeline scan complete: {} posts scanned, {} media found{}",
        progress.scanned_posts,
        collector.len(),
        if reached_post_limit {
            " (post limit reached)"
        } else {
            ""
        }
    );

    Ok(TimelineMediaResult {
        tasks: collector.into_tasks(),
        scanned_posts: progress.scanned_posts,
        reached_post_limit,
    })
}

/// Jittered, cancellable delay between page fetches.
async fn page_pause(base: Duration, cancel: &CancellationToken) -> Result<()> {
    if base.is_zero() {
        return Ok(());
    }

    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = sleep(jittered(base)) => Ok(()),
    }
}

/// Uniform delay in `[base, 2 * base]`, saturating for very large bases.
fn jittered(base: Duration) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let delay_ms = rand::thread_rng().gen_range(base_ms..=base_ms.saturating_mul(2));
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::TimelinePage;

    /// In-memory feed split into pages by cursor.
    #[derive(Default)]
    pub(crate) struct FakeFeed {
        pub(crate) pages: Vec<Vec<Post>>,
        pub(crate) posts: HashMap<String, Post>,
        pub(crate) fail_on_page: Option<usize>,
        pub(crate) fetches: AtomicUsize,
        pub(crate) cursors: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl TimelineSource for FakeFeed {
        async fn media_page(
            &self,
            _identity: &str,
            cursor: Option<&str>,
            _count: usize,
        ) -> Result<TimelinePage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.cursors
                .lock()
                .unwrap()
                .push(cursor.map(String::from));

            let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            if self.fail_on_page == Some(index) {
                return Err(Error::Api("HTTP 500".into()));
            }

            let posts = self.pages.get(index).cloned().unwrap_or_default();
            let next_cursor = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(TimelinePage { posts, next_cursor })
        }

        async fn post(&self, post_id: &str) -> Result<Post> {
            self.posts
                .get(post_id)
                .cloned()
                .ok_or_else(|| Error::PostNotFound(post_id.to_string()))
        }
    }

    pub(crate) fn photo_post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            author: Some(author.to_string()),
            media: vec![PostMedia {
                id: format!("m{}", id),
                kind: MediaKind::Photo,
                url: format!("https://pbs.twimg.com/media/{}.jpg", id),
            }],
        }
    }

    pub(crate) fn video_post(id: &str, author: &str, url: &str) -> Post {
        Post {
            id: id.to_string(),
            author: Some(author.to_string()),
            media: vec![PostMedia {
                id: format!("v{}", id),
                kind: MediaKind::Video,
                url: url.to_string(),
            }],
        }
    }

    fn scope() -> DownloadScope {
        DownloadScope::new("someone", "/downloads")
    }

    async fn walk(feed: &FakeFeed, scope: &DownloadScope) -> Result<TimelineMediaResult> {
        walk_timeline(
            feed,
            scope,
            Duration::ZERO,
            &CancellationToken::new(),
            |_| {},
        )
        .await
    }

    #[tokio::test]
    async fn test_three_photo_posts() {
        let feed = FakeFeed {
            pages: vec![vec![
                photo_post("1", "someone"),
                photo_post("2", "someone"),
                photo_post("3", "someone"),
            ]],
            ..Default::default()
        };
        let scope = scope().with_max_posts(10).with_videos(false);

        let result = walk(&feed, &scope).await.unwrap();

        assert_eq!(result.tasks.len(), 3);
        assert!(result.tasks.iter().all(|t| t.kind() == MediaKind::Photo));
        assert_eq!(result.scanned_posts, 3);
        assert!(!result.reached_post_limit);
        assert_eq!(
            result.tasks[0].destination(),
            std::path::Path::new("/downloads/someone/photos/1_m1.jpg")
        );
        assert_eq!(
            result.tasks[0].source_url(),
            "https://pbs.twimg.com/media/1.jpg?format=jpg&name=orig"
        );
    }

    #[tokio::test]
    async fn test_limit_enforced_mid_page() {
        let feed = FakeFeed {
            pages: vec![
                (1..=4).map(|i| photo_post(&i.to_string(), "someone")).collect(),
                (5..=8).map(|i| photo_post(&i.to_string(), "someone")).collect(),
            ],
            ..Default::default()
        };

        let result = walk(&feed, &scope().with_max_posts(6)).await.unwrap();

        assert_eq!(result.scanned_posts, 6);
        assert!(result.reached_post_limit);
        assert_eq!(result.tasks.len(), 6);
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_limit_at_page_boundary_stops_without_fetching() {
        let feed = FakeFeed {
            pages: vec![
                (1..=3).map(|i| photo_post(&i.to_string(), "someone")).collect(),
                (4..=6).map(|i| photo_post(&i.to_string(), "someone")).collect(),
            ],
            ..Default::default()
        };

        let result = walk(&feed, &scope().with_max_posts(3)).await.unwrap();

        assert_eq!(result.scanned_posts, 3);
        assert!(result.reached_post_limit);
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_feed_smaller_than_limit_is_exhausted() {
        let feed = FakeFeed {
            pages: vec![
                vec![photo_post("1", "someone"), photo_post("2", "someone")],
                vec![photo_post("3", "someone")],
            ],
            ..Default::default()
        };

        let result = walk(&feed, &scope().with_max_posts(50)).await.unwrap();

        assert_eq!(result.scanned_posts, 3);
        assert!(!result.reached_post_limit);
        assert_eq!(
            *feed.cursors.lock().unwrap(),
            vec![None, Some("1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_page_stops_walk() {
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")], vec![], vec![photo_post("2", "someone")]],
            ..Default::default()
        };

        let result = walk(&feed, &scope()).await.unwrap();

        assert_eq!(result.scanned_posts, 1);
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_dropped() {
        let mut repeated = photo_post("2", "someone");
        repeated.media[0].url = "https://pbs.twimg.com/media/1.jpg".to_string();
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")], vec![repeated]],
            ..Default::default()
        };

        let result = walk(&feed, &scope()).await.unwrap();

        assert_eq!(result.scanned_posts, 2);
        assert_eq!(result.tasks.len(), 1);
        let keys: HashSet<_> = result.tasks.iter().map(|t| t.dedup_key()).collect();
        assert_eq!(keys.len(), result.tasks.len());
    }

    #[tokio::test]
    async fn test_category_filters() {
        let feed = FakeFeed {
            pages: vec![vec![
                photo_post("1", "someone"),
                video_post("2", "someone", "https://video.twimg.com/a.mp4"),
            ]],
            ..Default::default()
        };

        let result = walk(&feed, &scope().with_photos(false)).await.unwrap();
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].kind(), MediaKind::Video);
        assert_eq!(
            result.tasks[0].destination(),
            std::path::Path::new("/downloads/someone/videos/2_v2.mp4")
        );

        let result = walk(&feed, &scope().with_videos(false)).await.unwrap();
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].kind(), MediaKind::Photo);
    }

    #[tokio::test]
    async fn test_own_posts_only_still_counts_scanned() {
        let feed = FakeFeed {
            pages: vec![vec![
                photo_post("1", "SomeOne"),
                photo_post("2", "someone_else"),
                photo_post("3", "someone"),
            ]],
            ..Default::default()
        };

        let result = walk(&feed, &scope().with_own_posts_only(true))
            .await
            .unwrap();

        assert_eq!(result.scanned_posts, 3);
        let posts: Vec<_> = result.tasks.iter().map(|t| t.post_id()).collect();
        assert_eq!(posts, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_page_error_is_fatal() {
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")], vec![photo_post("2", "someone")]],
            fail_on_page: Some(1),
            ..Default::default()
        };

        let result = walk(&feed, &scope()).await;
        assert!(matches!(result, Err(Error::Api(_))));
    }

    #[tokio::test]
    async fn test_cancelled_walk_returns_cancelled() {
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")]],
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = walk_timeline(&feed, &scope(), Duration::ZERO, &cancel, |_| {}).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_pages_stops_walk() {
        let feed = FakeFeed {
            pages: vec![
                vec![photo_post("1", "someone")],
                vec![photo_post("2", "someone")],
                vec![photo_post("3", "someone")],
            ],
            ..Default::default()
        };
        let cancel = CancellationToken::new();

        let result = walk_timeline(&feed, &scope(), Duration::ZERO, &cancel, |progress| {
            if progress.pages_fetched == 1 {
                cancel.cancel();
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_page_delay() {
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")], vec![photo_post("2", "someone")]],
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result =
            walk_timeline(&feed, &scope(), Duration::from_secs(30), &cancel, |_| {}).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_range_and_saturates() {
        for _ in 0..50 {
            let delay = jittered(Duration::from_millis(100));
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(200));
        }

        let huge = Duration::from_millis(u64::MAX);
        assert!(jittered(huge) >= huge);
    }

    #[tokio::test]
    async fn test_progress_reported_per_page() {
        let feed = FakeFeed {
            pages: vec![vec![photo_post("1", "someone")], vec![photo_post("2", "someone")]],
            ..Default::default()
        };
        let mut reports = Vec::new();

        walk_timeline(
            &feed,
            &scope(),
            Duration::ZERO,
            &CancellationToken::new(),
            |p| reports.push(p),
        )
        .await
        .unwrap();

        assert_eq!(
            reports,
            vec![
                WalkProgress {
                    pages_fetched: 1,
                    scanned_posts: 1,
                    tasks_found: 1
                },
                WalkProgress {
                    pages_fetched: 2,
                    scanned_posts: 2,
                    tasks_found: 2
                },
            ]
        );
    }
}
