//! Upstream API module.
//!
//! This module provides:
//! - The [`TimelineSource`] seam the walker reads posts through
//! - An HTTP client for the GraphQL timeline API
//! - Credential handling and request headers
//! - Response normalization into posts and pages

pub mod auth;
pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use auth::Credential;
pub use client::TimelineApi;
pub use types::{Post, PostMedia, TimelinePage};

/// Source of timeline pages and single posts.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Fetch one page of an account's media timeline.
    ///
    /// `cursor` is `None` for the first page.
    async fn media_page(
        &self,
        identity: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<TimelinePage>;

    /// Fetch a single post by id.
    async fn post(&self, post_id: &str) -> Result<Post>;
}
