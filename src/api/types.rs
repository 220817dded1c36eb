//! API response types and normalization.
//!
//! Timeline responses nest posts several levels deep inside instruction and module
//! wrappers whose shape changes often upstream. Rather than mirror every wrapper, the
//! parsers walk the JSON tree and pick out post objects and the bottom cursor.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::media::MediaKind;

/// A media item attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMedia {
    pub id: String,
    pub kind: MediaKind,
    /// Photo URL, or the selected video variant URL.
    pub url: String,
}

/// A post from the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    /// Screen name of the author, when the response includes it.
    pub author: Option<String>,
    pub media: Vec<PostMedia>,
}

/// One page of a media timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelinePage {
    pub posts: Vec<Post>,
    pub next_cursor: Option<String>,
}

/// The `legacy` section of a post.
#[derive(Debug, Deserialize)]
struct RawLegacy {
    #[serde(default)]
    extended_entities: Option<RawEntities>,
}

#[derive(Debug, Deserialize)]
struct RawEntities {
    #[serde(default)]
    media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    id_str: String,
    #[serde(rename = "type")]
    media_type: String,
    media_url_https: Option<String>,
    video_info: Option<RawVideoInfo>,
}

#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    #[serde(default)]
    variants: Vec<RawVariant>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    content_type: String,
    url: String,
    bitrate: Option<u64>,
}

/// Extract the posts and bottom cursor from a timeline response.
pub fn parse_timeline_page(value: &Value) -> TimelinePage {
    let mut page = TimelinePage::default();
    let mut seen = HashSet::new();
    collect(value, &mut page, &mut seen);
    page
}

/// Extract the first post from a single-post response.
pub fn parse_post(value: &Value) -> Option<Post> {
    parse_timeline_page(value).posts.into_iter().next()
}

/// Extract the numeric user id from a user lookup response.
pub fn parse_user_id(value: &Value) -> Option<String> {
    value
        .pointer("/data/user/result/rest_id")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Collect error messages from a GraphQL `errors` array.
pub fn parse_errors(value: &Value) -> Vec<String> {
    value
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn collect(value: &Value, page: &mut TimelinePage, seen: &mut HashSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(post) = as_post(map) {
                if seen.insert(post.id.clone()) {
                    page.posts.push(post);
                }
                return;
            }

            if map.get("cursorType").and_then(Value::as_str) == Some("Bottom") {
                if let Some(cursor) = map.get("value").and_then(Value::as_str) {
                    page.next_cursor = Some(cursor.to_string());
                }
            }

            for child in map.values() {
                collect(child, page, seen);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, page, seen);
            }
        }
        _ => {}
    }
}

/// Interpret an object as a post if it carries a post id and a post `legacy` section.
fn as_post(map: &Map<String, Value>) -> Option<Post> {
    let id = map.get("rest_id")?.as_str()?;
    let legacy = map.get("legacy")?;

    // Users also have rest_id + legacy; posts are the ones pointing at an author.
    legacy.get("user_id_str")?;

    // A repost carries the original under retweeted_status_result.
    if let Some(original) = legacy
        .pointer("/retweeted_status_result/result")
        .and_then(unwrap_visibility)
        .and_then(Value::as_object)
        .and_then(as_post)
    {
        return Some(original);
    }

    let user = map.get("core").and_then(|core| core.pointer("/user_results/result"));
    let author = user
        .and_then(|user| user.pointer("/legacy/screen_name"))
        .or_else(|| user.and_then(|user| user.pointer("/core/screen_name")))
        .and_then(Value::as_str)
        .map(String::from);

    let media = RawLegacy::deserialize(legacy)
        .ok()
        .and_then(|legacy| legacy.extended_entities)
        .map(|entities| entities.media.into_iter().filter_map(convert_media).collect())
        .unwrap_or_default();

    Some(Post {
        id: id.to_string(),
        author,
        media,
    })
}

/// Posts with limited visibility are wrapped in an extra `tweet` object.
fn unwrap_visibility(value: &Value) -> Option<&Value> {
    match value.get("tweet") {
        Some(inner) if value.get("rest_id").is_none() => Some(inner),
        _ => Some(value),
    }
}

fn convert_media(raw: RawMedia) -> Option<PostMedia> {
    let kind = MediaKind::from_api(&raw.media_type)?;

    let url = match kind {
        MediaKind::Photo => raw.media_url_https?,
        MediaKind::Video | MediaKind::AnimatedImage => select_video_variant(raw.video_info?)?,
    };

    Some(PostMedia {
        id: raw.id_str,
        kind,
        url,
    })
}

/// Pick the highest-bitrate MP4 variant, falling back to the HLS playlist.
fn select_video_variant(info: RawVideoInfo) -> Option<String> {
    let mut best_mp4: Option<RawVariant> = None;
    let mut playlist: Option<String> = None;

    for variant in info.variants {
        if variant.content_type == "video/mp4" {
            let better = best_mp4
                .as_ref()
                .map(|best| variant.bitrate.unwrap_or(0) > best.bitrate.unwrap_or(0))
                .unwrap_or(true);
            if better {
                best_mp4 = Some(variant);
            }
        } else if variant.content_type.to_lowercase().contains("mpegurl") && playlist.is_none() {
            playlist = Some(variant.url);
        }
    }

    best_mp4.map(|v| v.url).or(playlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tweet(id: &str, author: &str, media: Value) -> Value {
        json!({
            "__typename": "Tweet",
            "rest_id": id,
            "core": { "user_results": { "result": {
                "rest_id": "42",
                "legacy": { "screen_name": author }
            }}},
            "legacy": {
                "user_id_str": "42",
                "extended_entities": { "media": media }
            }
        })
    }

    fn photo(id: &str, url: &str) -> Value {
        json!({ "id_str": id, "type": "photo", "media_url_https": url })
    }

    #[test]
    fn test_parse_timeline_page() {
        let response = json!({
            "data": { "user": { "result": { "timeline_v2": { "timeline": { "instructions": [
                { "type": "TimelineAddEntries", "entries": [
                    { "entryId": "tweet-1", "content": { "itemContent": { "tweet_results": {
                        "result": tweet("1", "Someone", json!([photo("11", "https://pbs.twimg.com/media/a.jpg")]))
                    }}}},
                    { "entryId": "tweet-2", "content": { "itemContent": { "tweet_results": {
                        "result": { "__typename": "TweetWithVisibilityResults",
                                    "tweet": tweet("2", "someone", json!([])) }
                    }}}},
                    { "entryId": "cursor-top-1", "content": { "cursorType": "Top", "value": "TOP" } },
                    { "entryId": "cursor-bottom-1", "content": { "cursorType": "Bottom", "value": "NEXT" } }
                ]}
            ]}}}}}
        });

        let page = parse_timeline_page(&response);
        assert_eq!(page.next_cursor.as_deref(), Some("NEXT"));
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.posts[0].id, "1");
        assert_eq!(page.posts[0].author.as_deref(), Some("Someone"));
        assert_eq!(
            page.posts[0].media,
            vec![PostMedia {
                id: "11".into(),
                kind: MediaKind::Photo,
                url: "https://pbs.twimg.com/media/a.jpg".into()
            }]
        );
        assert_eq!(page.posts[1].id, "2");
    }

    #[test]
    fn test_user_objects_are_not_posts() {
        let response = json!({ "user": { "rest_id": "42", "legacy": { "screen_name": "x" } } });
        assert!(parse_timeline_page(&response).posts.is_empty());
    }

    #[test]
    fn test_repost_resolves_to_original() {
        let mut repost = tweet("9", "reposter", json!([]));
        repost["legacy"]["retweeted_status_result"] = json!({
            "result": tweet("5", "original", json!([photo("55", "https://pbs.twimg.com/media/o.jpg")]))
        });

        let post = parse_post(&json!({ "data": { "tweetResult": { "result": repost } } })).unwrap();
        assert_eq!(post.id, "5");
        assert_eq!(post.author.as_deref(), Some("original"));
        assert_eq!(post.media.len(), 1);
    }

    #[test]
    fn test_author_from_newer_user_layout() {
        let mut post = tweet("3", "unused", json!([]));
        post["core"]["user_results"]["result"] = json!({
            "rest_id": "42",
            "core": { "screen_name": "Newer" }
        });
        let page = parse_timeline_page(&json!({ "entries": [post] }));
        assert_eq!(page.posts[0].author.as_deref(), Some("Newer"));

        let mut anonymous = tweet("4", "unused", json!([]));
        anonymous.as_object_mut().unwrap().remove("core");
        let page = parse_timeline_page(&json!({ "entries": [anonymous] }));
        assert_eq!(page.posts[0].author, None);
    }

    #[test]
    fn test_video_variant_selection() {
        let media = json!([{
            "id_str": "77",
            "type": "video",
            "video_info": { "variants": [
                { "content_type": "application/x-mpegURL", "url": "https://video.twimg.com/pl/a.m3u8" },
                { "content_type": "video/mp4", "bitrate": 256000, "url": "https://video.twimg.com/low.mp4" },
                { "content_type": "video/mp4", "bitrate": 2176000, "url": "https://video.twimg.com/high.mp4" }
            ]}
        }, {
            "id_str": "78",
            "type": "animated_gif",
            "video_info": { "variants": [
                { "content_type": "application/x-mpegURL", "url": "https://video.twimg.com/pl/b.m3u8" }
            ]}
        }]);

        let post = parse_post(&tweet("3", "someone", media)).unwrap();
        assert_eq!(post.media[0].url, "https://video.twimg.com/high.mp4");
        assert_eq!(post.media[0].kind, MediaKind::Video);
        assert_eq!(post.media[1].url, "https://video.twimg.com/pl/b.m3u8");
        assert_eq!(post.media[1].kind, MediaKind::AnimatedImage);
    }

    #[test]
    fn test_parse_user_id_and_errors() {
        let response = json!({
            "data": { "user": { "result": { "rest_id": "12345" } } },
            "errors": [ { "message": "Partial failure" } ]
        });
        assert_eq!(parse_user_id(&response).as_deref(), Some("12345"));
        assert_eq!(parse_errors(&response), vec!["Partial failure".to_string()]);
    }
}
