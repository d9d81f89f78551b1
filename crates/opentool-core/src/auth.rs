//! Call-scoped credentials for outbound API requests.
//!
//! Credentials are resolved once per call and travel with the
//! [`ToolContext`](crate::ToolContext). Nothing in the engine reads or writes
//! process-wide state while a call is in flight, so concurrent calls with
//! different credentials never observe each other.
//!
//! Three forms are supported:
//! - API key (`OPENTOOL_API_KEY`)
//! - Bearer token (`OPENTOOL_BEARER_TOKEN`)
//! - Basic credentials as `user:pass` (`OPENTOOL_BASIC_AUTH`)

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENTOOL_API_KEY";
/// Environment variable holding the bearer token.
pub const BEARER_TOKEN_ENV: &str = "OPENTOOL_BEARER_TOKEN";
/// Environment variable holding `user:pass` basic credentials.
pub const BASIC_AUTH_ENV: &str = "OPENTOOL_BASIC_AUTH";

/// Inbound header carrying an API key when credentials come from a transport.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Credentials available to a single tool call.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    /// Basic credentials in `user:pass` form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("bearer_token", &redact(&self.bearer_token))
            .field("basic_auth", &redact(&self.basic_auth))
            .finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the credential environment variables.
    ///
    /// This is read once, typically at startup, and the resulting value is
    /// handed to each call context.
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_key: read(API_KEY_ENV),
            bearer_token: read(BEARER_TOKEN_ENV),
            basic_auth: read(BASIC_AUTH_ENV),
        }
    }

    /// Extract credentials from the headers of an inbound transport request.
    ///
    /// Recognizes `X-API-Key`, `Authorization: Bearer <token>` and
    /// `Authorization: Basic <base64(user:pass)>`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut creds = Self::default();

        if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            if !key.is_empty() {
                creds.api_key = Some(key.to_string());
            }
        }

        if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            let auth = auth.trim();
            if let Some(token) = strip_scheme(auth, "bearer") {
                creds.bearer_token = Some(token.to_string());
            } else if let Some(encoded) = strip_scheme(auth, "basic") {
                match STANDARD.decode(encoded) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(pair) if pair.contains(':') => creds.basic_auth = Some(pair),
                        _ => tracing::debug!("Ignoring malformed basic credentials header"),
                    },
                    Err(_) => tracing::debug!("Ignoring undecodable basic credentials header"),
                }
            }
        }

        creds
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_basic_auth(mut self, user: impl AsRef<str>, pass: impl AsRef<str>) -> Self {
        self.basic_auth = Some(format!("{}:{}", user.as_ref(), pass.as_ref()));
        self
    }

    /// Fill any missing value from `fallback`, keeping values already set.
    pub fn or(self, fallback: Credentials) -> Self {
        Self {
            api_key: self.api_key.or(fallback.api_key),
            bearer_token: self.bearer_token.or(fallback.bearer_token),
            basic_auth: self.basic_auth.or(fallback.basic_auth),
        }
    }

    /// Split basic credentials into user and password.
    ///
    /// A value without `:` is treated as a bare user name.
    pub fn basic_pair(&self) -> Option<(&str, Option<&str>)> {
        let raw = self.basic_auth.as_deref()?;
        Some(match raw.split_once(':') {
            Some((user, pass)) => (user, Some(pass)),
            None => (raw, None),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer_token.is_none() && self.basic_auth.is_none()
    }
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = value.split_once(' ')?;
    head.eq_ignore_ascii_case(scheme).then(|| rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_from_headers_bearer_and_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("k-123"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok-456"));

        let creds = Credentials::from_headers(&headers);
        assert_eq!(creds.api_key.as_deref(), Some("k-123"));
        assert_eq!(creds.bearer_token.as_deref(), Some("tok-456"));
        assert!(creds.basic_auth.is_none());
    }

    #[test]
    fn test_from_headers_basic() {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("alice:s3cret");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
        );

        let creds = Credentials::from_headers(&headers);
        assert_eq!(creds.basic_pair(), Some(("alice", Some("s3cret"))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new().with_api_key("super-secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_or_keeps_call_values() {
        let call = Credentials::new().with_bearer_token("call-token");
        let fallback = Credentials::new()
            .with_bearer_token("env-token")
            .with_api_key("env-key");

        let merged = call.or(fallback);
        assert_eq!(merged.bearer_token.as_deref(), Some("call-token"));
        assert_eq!(merged.api_key.as_deref(), Some("env-key"));
    }
}
