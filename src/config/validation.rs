//! Configuration validation logic.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Minimum length for the session token.
const MIN_TOKEN_LENGTH: usize = 20;

/// Minimum length for user agent.
const MIN_USER_AGENT_LENGTH: usize = 40;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_token("auth_token", &config.credential.auth_token)?;
    validate_token("csrf_token", &config.credential.csrf_token)?;
    validate_user_agent(&config.options.user_agent)?;

    Ok(())
}

/// Validate a credential token value.
pub fn validate_token(field: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::MissingConfig(field.to_string()));
    }

    if token.len() < MIN_TOKEN_LENGTH {
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message: format!(
                "Token must be at least {} characters (got {})",
                MIN_TOKEN_LENGTH,
                token.len()
            ),
        });
    }

    // Check for placeholder values
    let token_lower = token.to_lowercase();
    if token_lower.contains("replaceme") || token_lower.contains("your_token") {
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message: "Token appears to be a placeholder. Please provide your actual session cookie."
                .to_string(),
        });
    }

    Ok(())
}

/// Validate the user agent string.
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    if user_agent.is_empty() {
        return Err(Error::MissingConfig("user_agent".to_string()));
    }

    if user_agent.len() < MIN_USER_AGENT_LENGTH {
        return Err(Error::ConfigValidation {
            field: "user_agent".to_string(),
            message: format!(
                "User agent must be at least {} characters (got {})",
                MIN_USER_AGENT_LENGTH,
                user_agent.len()
            ),
        });
    }

    Ok(())
}

fn identity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Account names: 1-15 chars, alphanumeric and underscores
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]{1,15}$").expect("valid identity pattern"))
}

/// Validate a normalized account identity.
pub fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(Error::MissingConfig("target account".to_string()));
    }

    if !identity_pattern().is_match(identity) {
        return Err(Error::ConfigValidation {
            field: "target".to_string(),
            message: format!(
                "Account '{}' is invalid. Only 1-15 letters, digits and underscores allowed.",
                identity
            ),
        });
    }

    if identity == "replaceme" || identity == "username" {
        return Err(Error::ConfigValidation {
            field: "target".to_string(),
            message: format!(
                "Account '{}' appears to be a placeholder. Please provide an actual account.",
                identity
            ),
        });
    }

    Ok(())
}
