//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, SchedulingMode};

/// Timeline media downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "timeline-media-downloader",
    version,
    about = "Download photos and videos from an account's media timeline",
    long_about = "A CLI tool to download photos, videos, and animated images posted by an account.\n\n\
                  Accepts @name, a bare name, a profile URL, or a single post URL. Files that \
                  already exist are skipped, so an interrupted run can simply be repeated."
)]
pub struct Args {
    /// Account (@name, name, profile URL) or post URL to download.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Account or post URL (alternative to the positional argument).
    #[arg(short, long, conflicts_with = "target")]
    pub user: Option<String>,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory")]
    pub download_directory: Option<PathBuf>,

    /// Maximum number of timeline posts to scan.
    #[arg(short = 'n', long)]
    pub max_posts: Option<u32>,

    /// Don't download photos.
    #[arg(long)]
    pub no_photos: bool,

    /// Don't download videos and animated images.
    #[arg(long)]
    pub no_videos: bool,

    /// Only keep posts authored by the target account (skips reposts).
    #[arg(long)]
    pub own_posts_only: bool,

    /// Number of concurrent downloads (1-8).
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Download scheduling strategy.
    #[arg(long)]
    pub scheduling: Option<SchedulingMode>,

    /// Base delay between timeline pages in milliseconds.
    #[arg(long)]
    pub page_delay: Option<u64>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Value of the `auth_token` session cookie.
    #[arg(long, env = "TMD_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Value of the `ct0` cookie.
    #[arg(long, env = "TMD_CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,

    /// Bearer token for API requests.
    #[arg(long, env = "TMD_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Browser user agent string.
    #[arg(short = 'a', long = "user-agent", env = "TMD_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Hide download progress information.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        // Override target if provided
        if let Some(target) = self.target.or(self.user) {
            config.target.account = Some(target);
        }

        // Override credential settings if provided
        if let Some(token) = self.auth_token {
            config.credential.auth_token = token;
        }

        if let Some(token) = self.csrf_token {
            config.credential.csrf_token = token;
        }

        if let Some(token) = self.bearer_token {
            config.credential.bearer_token = token;
        }

        // Override options if provided
        if let Some(user_agent) = self.user_agent {
            config.options.user_agent = user_agent;
        }

        if let Some(dir) = self.download_directory {
            config.options.download_directory = Some(dir);
        }

        if let Some(max_posts) = self.max_posts {
            config.options.max_posts = Some(max_posts);
        }

        if let Some(concurrency) = self.concurrency {
            config.options.concurrency = concurrency;
        }

        if let Some(scheduling) = self.scheduling {
            config.options.scheduling = scheduling;
        }

        if let Some(delay) = self.page_delay {
            config.options.page_delay_ms = delay;
        }

        // Boolean flags (only override if set to non-default)
        if self.no_photos {
            config.options.include_photos = false;
        }

        if self.no_videos {
            config.options.include_videos = false;
        }

        if self.own_posts_only {
            config.options.own_posts_only = true;
        }

        if self.quiet {
            config.options.show_progress = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["timeline-media-downloader"];
        argv.extend_from_slice(args);
        Args::parse_from(argv)
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        parse(&[
            "@someone",
            "-n",
            "40",
            "--no-videos",
            "-j",
            "5",
            "--scheduling",
            "pool",
            "--quiet",
        ])
        .merge_into_config(&mut config);

        assert_eq!(config.target.account.as_deref(), Some("@someone"));
        assert_eq!(config.options.max_posts, Some(40));
        assert!(config.options.include_photos);
        assert!(!config.options.include_videos);
        assert_eq!(config.options.concurrency, 5);
        assert_eq!(config.options.scheduling, SchedulingMode::Pool);
        assert!(!config.options.show_progress);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = Config::default();
        config.target.account = Some("from_file".into());
        config.options.max_posts = Some(10);

        parse(&["--config", "other.toml"]).merge_into_config(&mut config);

        assert_eq!(config.target.account.as_deref(), Some("from_file"));
        assert_eq!(config.options.max_posts, Some(10));
        assert!(config.options.include_videos);
    }

    #[test]
    fn test_user_flag_sets_target() {
        let mut config = Config::default();
        parse(&["-u", "https://x.com/someone/status/123"]).merge_into_config(&mut config);
        assert_eq!(
            config.target.account.as_deref(),
            Some("https://x.com/someone/status/123")
        );
    }
}
