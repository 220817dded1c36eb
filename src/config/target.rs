//! Resolution of the user-supplied target string.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::scope::normalize_identity;
use crate::config::validation::validate_identity;
use crate::error::{Error, Result};

/// What a run downloads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The media timeline of an account.
    Timeline { identity: String },
    /// A single post. The identity is the author segment of the post URL.
    Post { identity: String, post_id: String },
}

impl Target {
    pub fn identity(&self) -> &str {
        match self {
            Target::Timeline { identity } | Target::Post { identity, .. } => identity,
        }
    }
}

fn post_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.|mobile\.)?(?:x|twitter)\.com/([^/?#]+)/status(?:es)?/(\d+)")
            .expect("valid post URL pattern")
    })
}

fn profile_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.|mobile\.)?(?:x|twitter)\.com/([^/?#]+)/?(?:media/?)?(?:[?#].*)?$")
            .expect("valid profile URL pattern")
    })
}

/// Parse `@name`, `name`, a profile URL, or a post URL into a [`Target`].
pub fn parse_target(input: &str) -> Result<Target> {
    let input = input.trim();

    if input.is_empty() {
        return Err(Error::MissingConfig("target account".to_string()));
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        if let Some(captures) = post_url_pattern().captures(input) {
            let identity = normalize_identity(&captures[1]);
            validate_identity(&identity)?;
            return Ok(Target::Post {
                identity,
                post_id: captures[2].to_string(),
            });
        }

        if let Some(captures) = profile_url_pattern().captures(input) {
            let identity = normalize_identity(&captures[1]);
            validate_identity(&identity)?;
            return Ok(Target::Timeline { identity });
        }

        return Err(Error::ConfigValidation {
            field: "target".to_string(),
            message: format!("Could not extract an account or post from URL: {}", input),
        });
    }

    let identity = normalize_identity(input);
    validate_identity(&identity)?;
    Ok(Target::Timeline { identity })
}
