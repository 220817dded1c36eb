//! Configuration structures and loading logic.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::api::auth::{Credential, AUTH_COOKIE, CSRF_COOKIE};
use crate::config::modes::SchedulingMode;
use crate::config::scope::{clamp_concurrency, DownloadScope, DEFAULT_CONCURRENCY};
use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub credential: CredentialConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Target account configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// `@name`, bare name, profile URL or post URL.
    #[serde(default)]
    pub account: Option<String>,
}

/// Session credential values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Value of the `auth_token` session cookie.
    #[serde(default)]
    pub auth_token: String,

    /// Value of the `ct0` cookie, echoed as the CSRF header.
    #[serde(default)]
    pub csrf_token: String,

    /// Bearer token sent in the `Authorization` header.
    #[serde(default = "default_bearer_token")]
    pub bearer_token: String,

    /// Additional cookies sent with every API request.
    #[serde(default)]
    pub extra_cookies: BTreeMap<String, String>,

    /// Additional headers sent with every API request.
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            csrf_token: String::new(),
            bearer_token: default_bearer_token(),
            extra_cookies: BTreeMap::new(),
            extra_headers: BTreeMap::new(),
        }
    }
}

/// Download options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Base directory for downloads.
    #[serde(default)]
    pub download_directory: Option<PathBuf>,

    /// Maximum number of posts to scan (clamped to the system maximum).
    #[serde(default)]
    pub max_posts: Option<u32>,

    /// Whether to download photos.
    #[serde(default = "default_true")]
    pub include_photos: bool,

    /// Whether to download videos and animated images.
    #[serde(default = "default_true")]
    pub include_videos: bool,

    /// Only keep posts authored by the target account.
    #[serde(default)]
    pub own_posts_only: bool,

    /// Number of concurrent downloads (1-8).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Download scheduling strategy.
    #[serde(default)]
    pub scheduling: SchedulingMode,

    /// Base delay between timeline pages in milliseconds (jittered up to 2x).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Browser user agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to show download progress.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            download_directory: None,
            max_posts: None,
            include_photos: true,
            include_videos: true,
            own_posts_only: false,
            concurrency: DEFAULT_CONCURRENCY,
            scheduling: SchedulingMode::default(),
            page_delay_ms: default_page_delay(),
            user_agent: default_user_agent(),
            show_progress: true,
        }
    }
}

/// Upstream API endpoints. Query ids rotate upstream, so they are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,

    #[serde(default = "default_user_query")]
    pub user_by_screen_name_query: String,

    #[serde(default = "default_media_query")]
    pub user_media_query: String,

    #[serde(default = "default_post_query")]
    pub post_query: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            user_by_screen_name_query: default_user_query(),
            user_media_query: default_media_query(),
            post_query: default_post_query(),
        }
    }
}

/// Cached values configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When the last successful run finished.
    pub last_run_at: Option<DateTime<Utc>>,

    /// Identity downloaded by the last successful run.
    pub last_target: Option<String>,
}

fn default_bearer_token() -> String {
    "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36".to_string()
}

fn default_api_base() -> String {
    "https://x.com/i/api/graphql".to_string()
}

fn default_user_query() -> String {
    "xmU6X_CKVnQ5lSrCbAmJsg/UserByScreenName".to_string()
}

fn default_media_query() -> String {
    "MOLbHrtk8Ovu7DUNOLcXiA/UserMedia".to_string()
}

fn default_post_query() -> String {
    "Vg2Akr5FzUmF0sTplA5k6g/TweetResultByRestId".to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_page_delay() -> u64 {
    1000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective download directory.
    ///
    /// Falls back to `<Downloads>/timeline-media`, then the current directory.
    pub fn download_directory(&self) -> PathBuf {
        if let Some(dir) = &self.options.download_directory {
            return dir.clone();
        }

        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|d| d.join("timeline-media")))
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Effective concurrency, clamped to the supported range.
    pub fn concurrency(&self) -> usize {
        clamp_concurrency(self.options.concurrency)
    }

    /// Build the credential bundle used by the API client.
    pub fn credential(&self) -> Credential {
        let creds = &self.credential;
        let mut credential = Credential::new();

        if !creds.auth_token.is_empty() {
            credential = credential.with_cookie(AUTH_COOKIE, creds.auth_token.clone());
        }
        if !creds.csrf_token.is_empty() {
            credential = credential.with_cookie(CSRF_COOKIE, creds.csrf_token.clone());
        }
        if !creds.bearer_token.is_empty() {
            credential = credential.with_bearer_token(creds.bearer_token.clone());
        }
        for (name, value) in &creds.extra_cookies {
            credential = credential.with_cookie(name.clone(), value.clone());
        }
        for (name, value) in &creds.extra_headers {
            credential = credential.with_header(name.clone(), value.clone());
        }

        credential
    }

    /// Build the download scope for an account identity.
    pub fn scope(&self, identity: &str) -> DownloadScope {
        let mut scope = DownloadScope::new(identity, self.download_directory())
            .with_photos(self.options.include_photos)
            .with_videos(self.options.include_videos)
            .with_own_posts_only(self.options.own_posts_only);

        if let Some(max_posts) = self.options.max_posts {
            scope = scope.with_max_posts(max_posts);
        }

        scope
    }

    /// Record a finished run and save to file if path provided.
    pub fn update_cache(
        &mut self,
        identity: &str,
        finished_at: DateTime<Utc>,
        path: Option<&Path>,
    ) -> Result<()> {
        self.cache.last_run_at = Some(finished_at);
        self.cache.last_target = Some(identity.to_string());

        if let Some(path) = path {
            self.save(path)?;
        }

        Ok(())
    }
}
