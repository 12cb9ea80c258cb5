//! redb-backed manifest storage
//!
//! The whole manifest lives in a single row as a JSON blob, alongside its
//! hash so the hash can be inspected without decoding the regions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lands_core::RegionManifest;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info, instrument};

use crate::backend::{DecodedManifest, ManifestBackend};
use crate::error::StoreError;
use crate::json::{decode_manifest_json, encode_manifest_json};

// Key: manifest row key, Value: JSON-encoded RegionManifest
const MANIFESTS: TableDefinition<&str, &[u8]> = TableDefinition::new("manifests");

// Key: manifest row key, Value: manifest hash
const MANIFEST_HASHES: TableDefinition<&str, &str> = TableDefinition::new("manifest_hashes");

const GLOBAL_MANIFEST: &str = "global_manifest";

/// Manifest stored as a single row in a redb database
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create the database and its tables
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(&path).map_err(|e| StoreError::database(e.to_string()))?;
        info!("Opened redb database");

        let backend = Self {
            db: Arc::new(db),
            path,
        };
        backend.init_tables()?;
        Ok(backend)
    }

    fn init_tables(&self) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::database(e.to_string()))?;

        write_txn
            .open_table(MANIFESTS)
            .map_err(|e| StoreError::database(e.to_string()))?;
        write_txn
            .open_table(MANIFEST_HASHES)
            .map_err(|e| StoreError::database(e.to_string()))?;

        write_txn
            .commit()
            .map_err(|e| StoreError::database(e.to_string()))?;

        debug!("Initialized redb tables");
        Ok(())
    }

    /// Hash of the stored manifest, without decoding it
    pub fn stored_hash(&self) -> Result<Option<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::database(e.to_string()))?;
        let table = read_txn
            .open_table(MANIFEST_HASHES)
            .map_err(|e| StoreError::database(e.to_string()))?;

        let hash = table
            .get(GLOBAL_MANIFEST)
            .map_err(|e| StoreError::database(e.to_string()))?
            .map(|v| v.value().to_string());
        Ok(hash)
    }

    fn read_blob(db: &Database) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = db
            .begin_read()
            .map_err(|e| StoreError::database(e.to_string()))?;
        let table = read_txn
            .open_table(MANIFESTS)
            .map_err(|e| StoreError::database(e.to_string()))?;

        let value = table
            .get(GLOBAL_MANIFEST)
            .map_err(|e| StoreError::database(e.to_string()))?
            .map(|v| v.value().to_vec());
        Ok(value)
    }

    /// Both rows change in one transaction, so hash and blob never disagree
    fn write_blob(db: &Database, blob: &[u8], hash: &str) -> Result<(), StoreError> {
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::database(e.to_string()))?;

        {
            let mut manifests = write_txn
                .open_table(MANIFESTS)
                .map_err(|e| StoreError::database(e.to_string()))?;
            manifests
                .insert(GLOBAL_MANIFEST, blob)
                .map_err(|e| StoreError::database(e.to_string()))?;

            let mut hashes = write_txn
                .open_table(MANIFEST_HASHES)
                .map_err(|e| StoreError::database(e.to_string()))?;
            hashes
                .insert(GLOBAL_MANIFEST, hash)
                .map_err(|e| StoreError::database(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| StoreError::database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ManifestBackend for RedbBackend {
    fn describe(&self) -> String {
        format!("redb database {}", self.path.display())
    }

    async fn read(&self) -> Result<Option<DecodedManifest>, StoreError> {
        let db = Arc::clone(&self.db);
        let blob = tokio::task::spawn_blocking(move || Self::read_blob(&db))
            .await
            .map_err(|e| StoreError::database(e.to_string()))??;

        match blob {
            Some(bytes) => decode_manifest_json(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, manifest: &RegionManifest) -> Result<u64, StoreError> {
        let blob = encode_manifest_json(manifest)?;
        let len = blob.len() as u64;
        let hash = manifest.hash.clone();
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || Self::write_blob(&db, &blob, &hash))
            .await
            .map_err(|e| StoreError::database(e.to_string()))??;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lands_core::Region;
    use tempfile::TempDir;

    fn create_backend() -> (RedbBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::open(temp_dir.path().join("lands.redb")).unwrap();
        (backend, temp_dir)
    }

    #[tokio::test]
    async fn test_empty_database_reads_none() {
        let (backend, _temp) = create_backend();
        assert!(backend.read().await.unwrap().is_none());
        assert!(backend.stored_hash().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_single_row() {
        let (backend, _temp) = create_backend();

        let first = RegionManifest::new("one", 1, vec![Region::new("a", "A", "o", "w")]);
        let second = RegionManifest::new("two", 2, vec![]);

        backend.write(&first).await.unwrap();
        backend.write(&second).await.unwrap();

        let decoded = backend.read().await.unwrap().unwrap();
        assert_eq!(decoded.manifest, second);
        assert_eq!(backend.stored_hash().unwrap().as_deref(), Some("two"));
    }
}
