//! Editor sessions
//!
//! Tokens are 32 random bytes, hex-encoded, mapped to their lifetime in a
//! concurrent map. Expired entries are evicted lazily on validation and in
//! bulk by a periodic cleanup task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Length of a session token before hex encoding
const TOKEN_BYTES: usize = 32;

/// Credentials accepted by the editor
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorCredentials {
    /// `{"username": ..., "password": ...}`
    Basic { username: String, password: String },
    /// `{"token": ...}`
    Bearer { token: String },
}

impl Default for EditorCredentials {
    fn default() -> Self {
        Self::Basic {
            username: "admin".to_string(),
            password: "changeme".to_string(),
        }
    }
}

impl EditorCredentials {
    fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }

    /// Compare submitted credentials against the configured ones
    ///
    /// Every field is compared so the outcome does not reveal which one was wrong.
    fn matches(&self, submitted: &HashMap<String, String>) -> bool {
        match self {
            Self::Basic { username, password } => {
                let user_ok = submitted.get("username") == Some(username);
                let pass_ok = submitted.get("password") == Some(password);
                user_ok & pass_ok
            }
            Self::Bearer { token } => submitted.get("token") == Some(token),
        }
    }
}

impl std::fmt::Debug for EditorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Authentication settings for the editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorAuthConfig {
    /// When off, every authentication attempt gets a session
    pub enable: bool,
    pub credentials: EditorCredentials,
}

/// Editor section of the node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub auth: EditorAuthConfig,
    pub session_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            auth: EditorAuthConfig::default(),
            session_timeout_secs: 3600,
            cleanup_interval_secs: 300,
        }
    }
}

impl EditorConfig {
    pub fn with_auth(mut self, credentials: EditorCredentials) -> Self {
        self.auth = EditorAuthConfig {
            enable: true,
            credentials,
        };
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_secs = timeout.as_secs();
        self
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Cleanup period, at least one second
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Lifetime of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Issues and checks editor session tokens
pub struct SessionManager {
    auth: EditorAuthConfig,
    timeout: chrono::Duration,
    sessions: DashMap<String, Session>,
}

impl SessionManager {
    pub fn new(config: &EditorConfig) -> Self {
        let timeout =
            chrono::Duration::from_std(config.session_timeout()).unwrap_or(chrono::Duration::MAX);
        Self {
            auth: config.auth.clone(),
            timeout,
            sessions: DashMap::new(),
        }
    }

    /// Issue a session token if the credentials are accepted
    pub fn authenticate(&self, credentials: &HashMap<String, String>) -> Option<String> {
        if !self.auth.enable {
            return Some(self.create_session());
        }

        if self.auth.credentials.matches(credentials) {
            let token = self.create_session();
            info!(auth_type = self.auth.credentials.kind(), "New session created");
            Some(token)
        } else {
            warn!(auth_type = self.auth.credentials.kind(), "Authentication failed");
            None
        }
    }

    /// Whether the token names a live session; expired sessions are removed
    pub fn validate_session(&self, token: &str) -> bool {
        let Some(session) = self.sessions.get(token).map(|entry| *entry) else {
            return false;
        };

        if session.is_expired() {
            self.sessions.remove(token);
            debug!("Session expired and removed");
            return false;
        }
        true
    }

    /// Remove a session; returns whether it existed
    pub fn invalidate_session(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            info!("Session invalidated");
        }
        removed
    }

    /// Remove every expired session, returning how many were removed
    pub fn cleanup_expired_sessions(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            info!(removed, "Cleaned up expired sessions");
        }
        removed
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth.enable
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|entry| *entry)
    }

    fn create_session(&self) -> String {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.timeout).unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.sessions.insert(
            token.clone(),
            Session {
                created_at: now,
                expires_at,
            },
        );
        token
    }

    /// Spawn the periodic cleanup task, stopped by `shutdown_rx`
    pub fn spawn_cleanup(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Session cleanup task started");

            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; nothing can have expired yet
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Session cleanup task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        manager.cleanup_expired_sessions();
                    }
                }
            }
        })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn basic_manager(timeout: Duration) -> SessionManager {
        SessionManager::new(
            &EditorConfig::default()
                .with_auth(EditorCredentials::Basic {
                    username: "admin".into(),
                    password: "pw".into(),
                })
                .with_session_timeout(timeout),
        )
    }

    #[test]
    fn test_disabled_auth_always_issues_token() {
        let manager = SessionManager::new(&EditorConfig::default());
        let token = manager.authenticate(&HashMap::new()).unwrap();

        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(manager.validate_session(&token));
    }

    #[test]
    fn test_tokens_are_unique() {
        let manager = SessionManager::new(&EditorConfig::default());
        let a = manager.authenticate(&HashMap::new()).unwrap();
        let b = manager.authenticate(&HashMap::new()).unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.active_sessions(), 2);
    }

    #[test]
    fn test_basic_credentials() {
        let manager = basic_manager(Duration::from_secs(60));

        assert!(manager
            .authenticate(&creds(&[("username", "admin"), ("password", "pw")]))
            .is_some());
        assert!(manager
            .authenticate(&creds(&[("username", "admin"), ("password", "nope")]))
            .is_none());
        assert!(manager.authenticate(&creds(&[("username", "admin")])).is_none());
        assert_eq!(manager.active_sessions(), 1);
    }

    #[test]
    fn test_bearer_credentials() {
        let manager = SessionManager::new(
            &EditorConfig::default().with_auth(EditorCredentials::Bearer {
                token: "static".into(),
            }),
        );

        assert!(manager.authenticate(&creds(&[("token", "static")])).is_some());
        assert!(manager.authenticate(&creds(&[("token", "other")])).is_none());
    }

    #[test]
    fn test_expired_session_is_invalid_and_evicted() {
        let manager = basic_manager(Duration::ZERO);
        let token = manager
            .authenticate(&creds(&[("username", "admin"), ("password", "pw")]))
            .unwrap();
        assert_eq!(manager.active_sessions(), 1);

        assert!(!manager.validate_session(&token));
        assert_eq!(manager.active_sessions(), 0);
    }

    #[test]
    fn test_invalidate_session() {
        let manager = SessionManager::new(&EditorConfig::default());
        let token = manager.authenticate(&HashMap::new()).unwrap();

        assert!(manager.invalidate_session(&token));
        assert!(!manager.validate_session(&token));
        assert!(!manager.invalidate_session(&token));
    }

    #[test]
    fn test_unknown_token_is_invalid() {
        let manager = SessionManager::new(&EditorConfig::default());
        assert!(!manager.validate_session("deadbeef"));
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let expired = basic_manager(Duration::ZERO);
        let ok = creds(&[("username", "admin"), ("password", "pw")]);
        expired.authenticate(&ok).unwrap();
        expired.authenticate(&ok).unwrap();
        assert_eq!(expired.cleanup_expired_sessions(), 2);
        assert_eq!(expired.active_sessions(), 0);

        let live = basic_manager(Duration::from_secs(3600));
        let token = live.authenticate(&ok).unwrap();
        assert_eq!(live.cleanup_expired_sessions(), 0);
        assert!(live.validate_session(&token));
    }

    #[test]
    fn test_session_lifetime_matches_timeout() {
        let manager = basic_manager(Duration::from_secs(3600));
        let token = manager
            .authenticate(&creds(&[("username", "admin"), ("password", "pw")]))
            .unwrap();

        let session = manager.session(&token).unwrap();
        assert_eq!(session.expires_at - session.created_at, chrono::Duration::hours(1));
    }

    #[test]
    fn test_concurrent_authenticate_and_validate() {
        let manager = Arc::new(SessionManager::new(&EditorConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let token = manager.authenticate(&HashMap::new()).unwrap();
                        assert!(manager.validate_session(&token));
                        manager.invalidate_session(&token);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_runs_periodically() {
        let manager = Arc::new(basic_manager(Duration::ZERO));
        manager
            .authenticate(&creds(&[("username", "admin"), ("password", "pw")]))
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = manager.spawn_cleanup(Duration::from_secs(300), shutdown_rx);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(manager.active_sessions(), 0);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
