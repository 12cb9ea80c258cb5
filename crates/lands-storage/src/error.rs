//! Error types for lands-storage
//!
//! Region-level failures (validation, missing id, duplicate id) are
//! recoverable and reported back to the caller. Decode failures mean the
//! persisted envelope is corrupt or from a newer format.

use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Region violates one or more validation rules
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// No region with the requested id
    #[error("Region with ID '{0}' not found")]
    NotFound(String),

    /// A region with the same id already exists
    #[error("Region with ID '{0}' already exists")]
    Conflict(String),

    /// Persisted data is corrupt or version-incompatible
    #[error("Decode error: {0}")]
    Decode(String),

    /// Manifest could not be encoded for persistence
    #[error("Encode error: {0}")]
    Encode(String),

    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict(id.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Whether the failure is about the request rather than the medium
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_)
        )
    }

    /// Violated rules, if this is a validation failure
    pub fn validation_errors(&self) -> &[String] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_all_rules() {
        let err = StoreError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Validation failed: a; b");
        assert_eq!(err.validation_errors().len(), 2);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_not_found_error() {
        let err = StoreError::not_found("spawn");
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(err.to_string().contains("spawn"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_decode_is_not_recoverable() {
        assert!(!StoreError::decode("bad magic").is_recoverable());
    }
}
