//! Error types for the node coordinator

use thiserror::Error;

/// Errors that can occur in the node coordinator
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Store(#[from] lands_storage::StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] lands_sync::SyncError),

    #[error("Rendering error: {0}")]
    Geometry(#[from] lands_geometry::GeometryError),

    #[error("Node not started")]
    NotStarted,

    #[error("Node already started")]
    AlreadyStarted,
}

impl From<toml::de::Error> for NodeError {
    fn from(e: toml::de::Error) -> Self {
        NodeError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for NodeError {
    fn from(e: toml::ser::Error) -> Self {
        NodeError::Config(e.to_string())
    }
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
