//! JSON-encoded manifest file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lands_core::{Region, RegionManifest};
use serde::Deserialize;
use tracing::warn;

use crate::atomic::{read_if_exists, write_atomic};
use crate::backend::{DecodedManifest, ManifestBackend};
use crate::error::StoreError;

/// Manifest envelope with regions left undecoded
#[derive(Deserialize)]
struct RawManifest {
    hash: String,
    timestamp: i64,
    regions: Vec<serde_json::Value>,
}

/// Decode a JSON manifest document
///
/// The envelope (`hash`, `timestamp`, `regions` array) must be well formed.
/// Individual regions that fail to decode are skipped and counted.
pub fn decode_manifest_json(bytes: &[u8]) -> Result<DecodedManifest, StoreError> {
    let raw: RawManifest = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::decode(format!("invalid manifest envelope: {e}")))?;

    let mut regions = Vec::with_capacity(raw.regions.len());
    let mut malformed = 0;

    for (index, value) in raw.regions.into_iter().enumerate() {
        let id_hint = value
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        match serde_json::from_value::<Region>(value) {
            Ok(region) => regions.push(region),
            Err(e) => {
                warn!(index, region_id = %id_hint, error = %e, "Skipping malformed region");
                malformed += 1;
            }
        }
    }

    Ok(DecodedManifest {
        manifest: RegionManifest::new(raw.hash, raw.timestamp, regions),
        malformed,
    })
}

/// Encode a manifest as a pretty-printed JSON document
pub fn encode_manifest_json(manifest: &RegionManifest) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(manifest).map_err(|e| StoreError::encode(e.to_string()))
}

/// Manifest stored as one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ManifestBackend for JsonFileBackend {
    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }

    async fn read(&self) -> Result<Option<DecodedManifest>, StoreError> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => decode_manifest_json(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, manifest: &RegionManifest) -> Result<u64, StoreError> {
        let bytes = encode_manifest_json(manifest)?;
        write_atomic(&self.path, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_malformed_region_is_skipped() {
        let json = br#"{
            "hash": "xyz",
            "timestamp": 7,
            "regions": [
                {"id":"a","name":"A","owner":"o","world":"w","chunks":[0]},
                {"id":"b","name":42},
                {"id":"c","name":"C","owner":"o","world":"w","chunks":[1,2]}
            ]
        }"#;

        let decoded = decode_manifest_json(json).unwrap();
        assert_eq!(decoded.malformed, 1);
        assert_eq!(decoded.manifest.hash, "xyz");
        assert_eq!(decoded.manifest.regions.len(), 2);
        assert_eq!(decoded.manifest.regions[1].id, "c");
    }

    #[test]
    fn test_corrupt_envelope_is_decode_error() {
        let err = decode_manifest_json(b"{\"regions\": 5").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));

        let err = decode_manifest_json(br#"{"hash":"h","regions":[]}"#).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("lands.json"));
        assert!(backend.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("lands.json"));
        let manifest = RegionManifest::new(
            "abc",
            123,
            vec![Region::new("a", "A", "o", "w").with_tiles([(-16, 32)])],
        );

        let written = backend.write(&manifest).await.unwrap();
        assert!(written > 0);

        let decoded = backend.read().await.unwrap().unwrap();
        assert_eq!(decoded.manifest, manifest);
        assert_eq!(decoded.malformed, 0);
    }
}
