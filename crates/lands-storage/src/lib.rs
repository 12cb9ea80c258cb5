//! # Lands Storage
//!
//! Persistent region store for land claims.
//!
//! One manifest holds every region. It is cached in memory, mutated
//! atomically, and persisted wholesale to one of three media.
//!
//! ## Features
//!
//! - **RegionStore trait**: The operations every store provides
//! - **ManifestStore**: Cached store generic over a [`ManifestBackend`]
//! - **JsonFileBackend**: Pretty-printed JSON document
//! - **BinaryFileBackend**: Gzip-compressed, big-endian binary format
//! - **RedbBackend**: Single-row record in a redb database
//!
//! ## Example
//!
//! ```rust,ignore
//! use lands_core::Region;
//! use lands_storage::{StorageConfig, StoreOptions, open_store};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = open_store(&StorageConfig::default(), StoreOptions::default()).unwrap();
//!     store.load(false).await.unwrap();
//!
//!     let spawn = Region::new("spawn", "Spawn", "admin", "world").with_tiles([(0, 0)]);
//!     store.add_region(spawn).await.unwrap();
//!     store.save(None).await.unwrap();
//! }
//! ```

pub mod atomic;
pub mod backend;
pub mod binary;
pub mod error;
pub mod json;
pub mod redb_backend;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lands_core::{Region, RegionManifest};
use serde::{Deserialize, Serialize};

// Re-exports
pub use backend::{DecodedManifest, ManifestBackend};
pub use binary::{BinaryFileBackend, decode_manifest_binary, encode_manifest_binary};
pub use error::StoreError;
pub use json::{JsonFileBackend, decode_manifest_json, encode_manifest_json};
pub use redb_backend::RedbBackend;
pub use store::{LoadReport, ManifestStore, RegionChange, StoreOptions};

pub type JsonFileStore = ManifestStore<JsonFileBackend>;
pub type BinaryFileStore = ManifestStore<BinaryFileBackend>;
pub type RedbStore = ManifestStore<RedbBackend>;

/// Cached, persistent collection of regions
///
/// Mutations change only the in-memory manifest and bump its timestamp;
/// [`RegionStore::save`] persists. The manifest hash is never recomputed
/// locally, it only changes when a whole manifest is installed via `save`.
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Human-readable description of the backing medium
    fn describe(&self) -> String;

    /// Load the manifest
    ///
    /// Returns the cached manifest unless `fresh` is set or nothing is cached.
    /// When the medium holds nothing, an empty manifest is seeded, persisted
    /// and `None` returned. On a decode or I/O failure the cache is left as
    /// it was and the error returned.
    async fn load(&self, fresh: bool) -> Result<Option<RegionManifest>, StoreError>;

    /// Persist the manifest
    ///
    /// With `Some`, the given manifest is written and then replaces the cache
    /// wholesale; if the write fails the cache keeps the previous manifest.
    /// Mutations wait for an in-flight save. With `None` and no cached
    /// manifest this is a no-op.
    async fn save(&self, manifest: Option<RegionManifest>) -> Result<(), StoreError>;

    /// Apply one change to a copy of the manifest and persist it
    ///
    /// The cache only takes the change once the write succeeded, so a failure
    /// leaves both the cache and the medium as they were.
    async fn apply_and_save(&self, change: RegionChange) -> Result<(), StoreError>;

    /// Add a new region; fails with `Conflict` on a duplicate id
    async fn add_region(&self, region: Region) -> Result<(), StoreError>;

    /// Replace an existing region in place; fails with `NotFound`
    async fn update_region(&self, region: Region) -> Result<(), StoreError>;

    /// Remove a region; fails with `NotFound`
    async fn delete_region(&self, id: &str) -> Result<(), StoreError>;

    async fn get_region(&self, id: &str) -> Result<Option<Region>, StoreError>;

    /// Snapshot of all regions, safe to iterate while the store changes
    async fn get_all_regions(&self) -> Result<Vec<Region>, StoreError>;

    /// Hash of the cached manifest, empty if nothing is loaded
    async fn local_hash(&self) -> Result<String, StoreError>;

    /// Counts from the last load from the medium
    async fn load_report(&self) -> Option<LoadReport>;
}

/// Which medium backs the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Json,
    Binary,
    #[default]
    Redb,
}

/// Storage section of the node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: PathBuf,
    /// Enforce validation on add and update
    pub validate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            path: PathBuf::from("lands.redb"),
            validate: true,
        }
    }
}

impl StorageConfig {
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StorageKind::Json,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StorageKind::Binary,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn redb(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StorageKind::Redb,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// Open the store described by `config`
///
/// Validation is dropped from `options` when the config disables it.
pub fn open_store(
    config: &StorageConfig,
    mut options: StoreOptions,
) -> Result<Arc<dyn RegionStore>, StoreError> {
    if !config.validate {
        options.validator = None;
    }

    let store: Arc<dyn RegionStore> = match config.kind {
        StorageKind::Json => Arc::new(ManifestStore::new(
            JsonFileBackend::new(&config.path),
            options,
        )),
        StorageKind::Binary => Arc::new(ManifestStore::new(
            BinaryFileBackend::new(&config.path),
            options,
        )),
        StorageKind::Redb => Arc::new(ManifestStore::new(RedbBackend::open(&config.path)?, options)),
    };

    tracing::info!(store = %store.describe(), "Opened region store");
    Ok(store)
}
