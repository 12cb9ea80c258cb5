//! Persistence media for a region manifest

use async_trait::async_trait;
use lands_core::RegionManifest;

use crate::error::StoreError;

/// A manifest decoded from a backing medium
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedManifest {
    pub manifest: RegionManifest,
    /// Region entries that could not be decoded and were skipped
    pub malformed: usize,
}

impl DecodedManifest {
    pub fn new(manifest: RegionManifest) -> Self {
        Self {
            manifest,
            malformed: 0,
        }
    }
}

/// Reads and writes one whole manifest on a medium
///
/// Writes must be atomic: a failed or interrupted write leaves the previous
/// manifest readable.
#[async_trait]
pub trait ManifestBackend: Send + Sync + 'static {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Read the manifest, `None` if the medium holds no manifest yet
    async fn read(&self) -> Result<Option<DecodedManifest>, StoreError>;

    /// Replace the persisted manifest, returning the number of bytes written
    async fn write(&self, manifest: &RegionManifest) -> Result<u64, StoreError>;
}
