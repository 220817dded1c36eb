//! Session credential and request header construction.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Cookie carrying the session token.
pub const AUTH_COOKIE: &str = "auth_token";

/// Cookie whose value must be echoed in the CSRF header.
pub const CSRF_COOKIE: &str = "ct0";

/// Opaque bundle of cookie, header and token values that authenticates requests.
///
/// Capturing and storing these values is the caller's concern; this type only knows
/// how to turn them into request headers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    bearer_token: Option<String>,
}

impl Credential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.cookie(CSRF_COOKIE)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.headers.is_empty() && self.bearer_token.is_none()
    }

    /// Render the cookie jar as a `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Build the authentication headers for an API request.
    pub fn to_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.bearer_token {
            headers.insert(
                header::AUTHORIZATION,
                header_value(&format!("Bearer {}", token))?,
            );
        }

        if let Some(cookies) = self.cookie_header() {
            headers.insert(header::COOKIE, header_value(&cookies)?);
        }

        if let Some(csrf) = self.csrf_token() {
            headers.insert("x-csrf-token", header_value(csrf)?);
        }

        if self.cookie(AUTH_COOKIE).is_some() {
            headers.insert("x-twitter-auth-type", HeaderValue::from_static("OAuth2Session"));
            headers.insert("x-twitter-active-user", HeaderValue::from_static("yes"));
        }

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::Config(format!("Invalid credential header name '{}': {}", name, e))
            })?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("Invalid credential header value: {}", e)))
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
