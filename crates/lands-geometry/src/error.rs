//! Error types for lands-geometry

use lands_storage::StoreError;
use thiserror::Error;

/// Errors that can occur while building map geometry
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Configured color is not `#RRGGBB`
    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// Regions could not be read from the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeometryError::InvalidColor("blue".to_string());
        assert_eq!(err.to_string(), "Invalid color 'blue', expected #RRGGBB");

        let err: GeometryError = StoreError::decode("bad magic").into();
        assert!(err.to_string().contains("bad magic"));
    }
}
