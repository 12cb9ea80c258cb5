//! Error types for lands-editor

use lands_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in editor operations
#[derive(Debug, Error)]
pub enum EditorError {
    /// Missing, unknown or expired session token
    #[error("Unauthorized")]
    Unauthorized,

    /// Credentials did not match; which field was wrong is not revealed
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Region id in the body differs from the one addressed
    #[error("Region ID mismatch: path '{path}', body '{body}'")]
    IdMismatch { path: String, body: String },

    /// Region violates validation rules
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Request body could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Store rejected or failed the operation
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EditorError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP-style status code for this failure
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => 401,
            Self::IdMismatch { .. } | Self::Validation(_) | Self::BadRequest(_) => 400,
            Self::Store(StoreError::Validation(_)) | Self::Store(StoreError::Conflict(_)) => 400,
            Self::Store(StoreError::NotFound(_)) => 404,
            Self::Store(_) => 500,
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}
