//! Error types for lands-sync

use lands_storage::StoreError;
use thiserror::Error;

/// Errors that can occur during a sync cycle
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection, timeout or other network failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote answered with an unexpected status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Installing the fetched manifest failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid sync configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::transport("connection refused").is_retryable());
        assert!(
            SyncError::Http {
                status: 503,
                url: "http://remote/status".to_string()
            }
            .is_retryable()
        );
        assert!(!SyncError::decode("bad json").is_retryable());
        assert!(!SyncError::Store(StoreError::decode("bad magic")).is_retryable());
    }

    #[test]
    fn test_http_error_display() {
        let err = SyncError::Http {
            status: 404,
            url: "http://remote/regions".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://remote/regions");
    }
}
