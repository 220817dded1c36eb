//! Single post walk.

use tokio_util::sync::CancellationToken;

use crate::api::TimelineSource;
use crate::config::DownloadScope;
use crate::download::state::TimelineMediaResult;
use crate::download::timeline::TaskCollector;
use crate::error::{Error, Result};

/// Build the work list for one post.
///
/// Tasks are built exactly as in a timeline walk. The result always reports one scanned
/// post and never reports the post limit as reached.
pub async fn walk_single_post(
    source: &dyn TimelineSource,
    scope: &DownloadScope,
    post_id: &str,
    cancel: &CancellationToken,
) -> Result<TimelineMediaResult> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tracing::info!("Fetching single post: {}", post_id);

    let post = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        post = source.post(post_id) => post?,
    };

    let mut collector = TaskCollector::new(scope);
    collector.add_post(&post)?;

    if collector.len() == 0 {
        tracing::info!("No media found in post {}", post_id);
    } else {
        tracing::info!("Found {} media items in post", collector.len());
    }

    Ok(TimelineMediaResult {
        tasks: collector.into_tasks(),
        scanned_posts: 1,
        reached_post_limit: false,
    })
}
