//! # Lands Sync
//!
//! Keeps the local region manifest in step with a remote authority.
//!
//! Each cycle asks the authority for its manifest hash and downloads the
//! full manifest only when the hash differs from the local one. The
//! scheduler polls on a fixed interval, starting immediately.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lands_sync::{AuthScheme, SyncConfig, SyncManager};
//!
//! let config = SyncConfig::new("https://lands.example.com/api")
//!     .with_auth(AuthScheme::bearer("api-token"));
//! let manager = Arc::new(SyncManager::with_http(config, store, map_layer)?);
//! manager.start();
//! // ...
//! manager.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod remote;

pub use config::{AuthScheme, SyncConfig};
pub use error::SyncError;
pub use manager::{SyncManager, SyncOutcome, SyncState};
pub use remote::{HttpRemote, RemoteSource, RemoteStatus};
