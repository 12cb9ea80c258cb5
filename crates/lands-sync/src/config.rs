//! Sync configuration and authentication schemes

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// How requests to the remote authority authenticate
///
/// Exactly one scheme is active. In TOML:
///
/// ```toml
/// [sync.auth]
/// type = "basic"
/// username = "lands"
/// password = "secret"
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// `Authorization: Basic <base64(username:password)>`
    Basic { username: String, password: String },
    /// Arbitrary header, e.g. `X-API-Key: <value>`
    Header { header: String, value: String },
}

impl AuthScheme {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn header(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            header: header.into(),
            value: value.into(),
        }
    }

    /// Header name and value to attach to every request
    pub fn header_pair(&self) -> (String, String) {
        match self {
            Self::Bearer { token } => ("Authorization".to_string(), format!("Bearer {token}")),
            Self::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                ("Authorization".to_string(), format!("Basic {encoded}"))
            }
            Self::Header { header, value } => (header.clone(), value.clone()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bearer { .. } => "bearer",
            Self::Basic { .. } => "basic",
            Self::Header { .. } => "header",
        }
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header { header, .. } => f
                .debug_struct("Header")
                .field("header", header)
                .finish_non_exhaustive(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Sync section of the node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Base URL; `/status` and `/regions` are appended
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthScheme>,
    pub refresh_interval_secs: u64,
    /// Connect and request timeout
    pub timeout_secs: u64,
    /// Attempts per request within one cycle
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8000".to_string(),
            auth: None,
            refresh_interval_secs: 60,
            timeout_secs: 30,
            max_attempts: 1,
            retry_delay_ms: 1000,
        }
    }
}

impl SyncConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthScheme) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_secs = interval.as_secs();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Poll period, at least one second
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = SyncConfig::new("http://x").with_refresh_interval(Duration::ZERO);
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_base_url_trims_slash() {
        assert_eq!(SyncConfig::new("http://x:8000/api/").base_url(), "http://x:8000/api");
    }

    #[test]
    fn test_header_pairs() {
        assert_eq!(
            AuthScheme::bearer("t0k").header_pair(),
            ("Authorization".to_string(), "Bearer t0k".to_string())
        );
        assert_eq!(
            AuthScheme::basic("user", "pass").header_pair(),
            ("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())
        );
        assert_eq!(
            AuthScheme::header("X-API-Key", "k").header_pair(),
            ("X-API-Key".to_string(), "k".to_string())
        );
    }

    #[test]
    fn test_debug_hides_credentials() {
        let debug = format!("{:?}", AuthScheme::basic("user", "hunter2"));
        assert!(!debug.contains("hunter2"));

        let debug = format!("{:?}", AuthScheme::header("X-API-Key", "secret"));
        assert!(debug.contains("X-API-Key"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_auth_from_json_tagged() {
        let auth: AuthScheme =
            serde_json::from_str(r#"{"type":"header","header":"X-API-Key","value":"v"}"#).unwrap();
        assert_eq!(auth, AuthScheme::header("X-API-Key", "v"));
    }
}
