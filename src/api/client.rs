//! GraphQL timeline API HTTP client.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::api::auth::Credential;
use crate::api::types::{parse_errors, parse_post, parse_timeline_page, parse_user_id};
use crate::api::{Post, TimelinePage, TimelineSource};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Fallback wait when a rate-limit response carries no reset header.
const DEFAULT_RATE_LIMIT_WAIT: u64 = 60;

/// Timeline API client with credential-authenticated requests.
pub struct TimelineApi {
    client: Client,
    credential: Credential,
    endpoints: ApiConfig,
    /// Account identity → numeric user id.
    user_ids: RwLock<HashMap<String, String>>,
}

impl TimelineApi {
    /// Create a new API client.
    pub fn new(credential: Credential, user_agent: &str, endpoints: ApiConfig) -> Result<Self> {
        if credential.is_empty() {
            return Err(Error::MissingConfig("credential".to_string()));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credential,
            endpoints,
            user_ids: RwLock::new(HashMap::new()),
        })
    }

    /// Make an authenticated GraphQL GET request and return the decoded body.
    async fn query(&self, operation: &str, variables: Value) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.endpoints.base_url.trim_end_matches('/'),
            operation
        );

        tracing::debug!("GET {} variables={}", url, variables);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("variables", variables.to_string()),
                ("features", features().to_string()),
            ])
            .headers(self.credential.to_headers()?)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: Value = response.json().await?;

        if body.get("data").is_none() {
            let errors = parse_errors(&body);
            return Err(Error::Api(if errors.is_empty() {
                format!("Response from {} has no data", operation)
            } else {
                errors.join("; ")
            }));
        }

        Ok(body)
    }

    /// Resolve an account identity to its numeric user id (cached).
    pub async fn user_id(&self, identity: &str) -> Result<String> {
        if let Some(id) = self.user_ids.read().await.get(identity) {
            return Ok(id.clone());
        }

        let body = self
            .query(
                &self.endpoints.user_by_screen_name_query,
                json!({ "screen_name": identity, "withSafetyModeUserFields": true }),
            )
            .await?;

        let id = parse_user_id(&body).ok_or_else(|| Error::AccountNotFound(identity.to_string()))?;
        tracing::debug!("Resolved {} to user id {}", identity, id);

        self.user_ids
            .write()
            .await
            .insert(identity.to_string(), id.clone());

        Ok(id)
    }
}

#[async_trait]
impl TimelineSource for TimelineApi {
    async fn media_page(
        &self,
        identity: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<TimelinePage> {
        let user_id = self.user_id(identity).await?;

        let mut variables = json!({
            "userId": user_id,
            "count": count,
            "includePromotedContent": false,
            "withClientEventToken": false,
            "withBirdwatchNotes": false,
            "withVoice": true,
            "withV2Timeline": true,
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = Value::String(cursor.to_string());
        }

        let body = self
            .query(&self.endpoints.user_media_query, variables)
            .await?;
        let page = parse_timeline_page(&body);

        tracing::debug!(
            "Media page for {}: {} posts, next cursor {:?}",
            identity,
            page.posts.len(),
            page.next_cursor
        );

        Ok(page)
    }

    async fn post(&self, post_id: &str) -> Result<Post> {
        let body = self
            .query(
                &self.endpoints.post_query,
                json!({
                    "tweetId": post_id,
                    "withCommunity": false,
                    "includePromotedContent": false,
                    "withVoice": false,
                }),
            )
            .await?;

        parse_post(&body).ok_or_else(|| Error::PostNotFound(post_id.to_string()))
    }
}

/// Map error statuses to typed errors.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("Response status: {}", status);

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        return Err(Error::RateLimited(seconds_until(reset)));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Auth error response: {}", body);
        return Err(Error::Authentication(format!(
            "HTTP {}: {}",
            status,
            if body.is_empty() {
                "Authentication failed"
            } else {
                &body
            }
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(500).collect();
        return Err(Error::Api(format!("HTTP {}: {}", status, excerpt)));
    }

    Ok(response)
}

/// Seconds from now until a unix reset timestamp.
fn seconds_until(reset: Option<u64>) -> u64 {
    let Some(reset) = reset else {
        return DEFAULT_RATE_LIMIT_WAIT;
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    reset.saturating_sub(now).max(1)
}

/// Feature switches the GraphQL endpoints require.
fn features() -> Value {
    json!({
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "hidden_profile_likes_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_media_download_video_enabled": false,
        "responsive_web_enhance_cards_enabled": false,
        "user_data_features": true,
    })
}
