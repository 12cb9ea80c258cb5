//! Cached region store over any manifest backend
//!
//! The in-memory manifest sits behind a write-preferring `RwLock`: readers
//! share it and only ever clone a complete manifest. Every writer (mutation,
//! load, save) first takes a separate persist mutex, so writers are mutually
//! exclusive. Disk I/O holds only that mutex; a manifest is swapped into the
//! cache after its write succeeded, so readers never see one that failed to
//! persist.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lands_core::{
    Blake3Fingerprint, Fingerprint, NO_DATA_HASH, Region, RegionManifest, RegionValidator,
    ValidationResult,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::RegionStore;
use crate::backend::{DecodedManifest, ManifestBackend};
use crate::error::StoreError;

/// Counts gathered while loading a manifest from its medium
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub regions: usize,
    /// Entries that could not be decoded and were dropped
    pub malformed: usize,
    /// Entries kept despite failing validation
    pub invalid: usize,
    /// Local diagnostic fingerprint of the loaded regions
    pub fingerprint: String,
}

/// A single-region change applied by [`RegionStore::apply_and_save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionChange {
    Add(Region),
    Update(Region),
    Delete(String),
}

impl RegionChange {
    pub fn region_id(&self) -> &str {
        match self {
            Self::Add(region) | Self::Update(region) => &region.id,
            Self::Delete(id) => id,
        }
    }
}

/// Validation settings applied by a store
#[derive(Clone)]
pub struct StoreOptions {
    /// Enforce validation on add/update and report invalid entries on load
    pub validator: Option<RegionValidator>,
    pub allowed_worlds: HashSet<String>,
    pub fingerprint: Arc<dyn Fingerprint>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            validator: Some(RegionValidator::default()),
            allowed_worlds: HashSet::new(),
            fingerprint: Arc::new(Blake3Fingerprint),
        }
    }
}

impl StoreOptions {
    /// Options with validation turned off
    pub fn unvalidated() -> Self {
        Self {
            validator: None,
            ..Default::default()
        }
    }

    pub fn with_validator(mut self, validator: RegionValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_allowed_worlds(mut self, worlds: impl IntoIterator<Item = String>) -> Self {
        self.allowed_worlds = worlds.into_iter().collect();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Arc<dyn Fingerprint>) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}

/// Region store caching one manifest from a [`ManifestBackend`]
pub struct ManifestStore<B: ManifestBackend> {
    backend: B,
    options: StoreOptions,
    manifest: RwLock<Option<RegionManifest>>,
    /// Held by every writer, across disk I/O
    persist: Mutex<()>,
    last_report: RwLock<Option<LoadReport>>,
}

impl<B: ManifestBackend> ManifestStore<B> {
    pub fn new(backend: B, options: StoreOptions) -> Self {
        Self {
            backend,
            options,
            manifest: RwLock::new(None),
            persist: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Report from the most recent successful load from the medium
    pub async fn last_report(&self) -> Option<LoadReport> {
        self.last_report.read().await.clone()
    }

    fn validate(&self, region: &Region) -> Result<(), StoreError> {
        let Some(validator) = &self.options.validator else {
            return Ok(());
        };
        match validator.validate(region, &self.options.allowed_worlds) {
            ValidationResult::Success => Ok(()),
            ValidationResult::Failure(errors) => Err(StoreError::Validation(errors)),
        }
    }

    fn report_for(&self, decoded: &DecodedManifest) -> LoadReport {
        let regions = &decoded.manifest.regions;
        let mut invalid = 0;

        if let Some(validator) = &self.options.validator {
            for region in regions {
                if let ValidationResult::Failure(errors) =
                    validator.validate(region, &self.options.allowed_worlds)
                {
                    warn!(region_id = %region.id, errors = %errors.join("; "), "Invalid region in stored manifest");
                    invalid += 1;
                }
            }
        }

        LoadReport {
            regions: regions.len(),
            malformed: decoded.malformed,
            invalid,
            fingerprint: self.options.fingerprint.fingerprint(regions),
        }
    }

    async fn ensure_loaded(&self) -> Result<(), StoreError> {
        if self.manifest.read().await.is_none() {
            self.load(false).await?;
        }
        Ok(())
    }

    async fn with_manifest<T>(
        &self,
        f: impl FnOnce(&mut RegionManifest) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.ensure_loaded().await?;
        let _persist = self.persist.lock().await;
        let mut guard = self.manifest.write().await;
        let manifest = guard.get_or_insert_with(RegionManifest::empty);
        f(manifest)
    }

    fn apply(&self, manifest: &mut RegionManifest, change: RegionChange) -> Result<(), StoreError> {
        match change {
            RegionChange::Add(region) => {
                if manifest.contains(&region.id) {
                    return Err(StoreError::conflict(&region.id));
                }
                self.validate(&region)?;

                info!(region_id = %region.id, chunks = region.chunks.len(), "Added region");
                manifest.regions.push(region);
            }
            RegionChange::Update(region) => {
                let index = manifest
                    .position(&region.id)
                    .ok_or_else(|| StoreError::not_found(&region.id))?;
                self.validate(&region)?;

                info!(region_id = %region.id, "Updated region");
                manifest.regions[index] = region;
            }
            RegionChange::Delete(id) => {
                let index = manifest
                    .position(&id)
                    .ok_or_else(|| StoreError::not_found(&id))?;

                manifest.regions.remove(index);
                info!(region_id = %id, "Deleted region");
            }
        }
        manifest.touch();
        Ok(())
    }

    /// Write `snapshot` to the medium; the caller holds `persist`
    async fn write_snapshot(&self, snapshot: &RegionManifest) -> Result<(), StoreError> {
        match self.backend.write(snapshot).await {
            Ok(bytes) => {
                info!(regions = snapshot.regions.len(), bytes, "Saved manifest");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to save manifest");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<B: ManifestBackend> RegionStore for ManifestStore<B> {
    fn describe(&self) -> String {
        self.backend.describe()
    }

    #[instrument(skip(self), fields(store = %self.backend.describe()))]
    async fn load(&self, fresh: bool) -> Result<Option<RegionManifest>, StoreError> {
        if !fresh {
            if let Some(manifest) = self.manifest.read().await.as_ref() {
                return Ok(Some(manifest.clone()));
            }
        }

        let _persist = self.persist.lock().await;

        // Another caller may have loaded while we waited
        if !fresh {
            if let Some(manifest) = self.manifest.read().await.as_ref() {
                return Ok(Some(manifest.clone()));
            }
        }

        let decoded = match self.backend.read().await {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(error = %e, "Failed to load manifest; keeping previous state");
                return Err(e);
            }
        };

        let Some(decoded) = decoded else {
            let seed = self
                .manifest
                .read()
                .await
                .clone()
                .unwrap_or_else(RegionManifest::empty);
            info!("No existing manifest found, seeding an empty one");
            self.backend.write(&seed).await?;
            *self.manifest.write().await = Some(seed);
            return Ok(None);
        };

        let report = self.report_for(&decoded);
        if report.malformed > 0 || report.invalid > 0 {
            warn!(
                malformed = report.malformed,
                invalid = report.invalid,
                total = report.regions,
                "Stored manifest contains bad regions"
            );
        }
        info!(
            regions = report.regions,
            hash = %decoded.manifest.hash,
            fingerprint = %report.fingerprint,
            "Loaded manifest"
        );

        *self.manifest.write().await = Some(decoded.manifest.clone());
        *self.last_report.write().await = Some(report);
        Ok(Some(decoded.manifest))
    }

    #[instrument(skip(self, manifest), fields(store = %self.backend.describe()))]
    async fn save(&self, manifest: Option<RegionManifest>) -> Result<(), StoreError> {
        let _persist = self.persist.lock().await;

        let snapshot = match manifest {
            Some(replacement) => replacement,
            None => {
                let Some(current) = self.manifest.read().await.clone() else {
                    warn!("Attempted to save with no manifest loaded");
                    return Ok(());
                };
                current
            }
        };

        self.write_snapshot(&snapshot).await?;
        *self.manifest.write().await = Some(snapshot);
        Ok(())
    }

    #[instrument(skip(self, change), fields(store = %self.backend.describe(), region_id = %change.region_id()))]
    async fn apply_and_save(&self, change: RegionChange) -> Result<(), StoreError> {
        self.ensure_loaded().await?;
        let _persist = self.persist.lock().await;

        let mut next = self
            .manifest
            .read()
            .await
            .clone()
            .unwrap_or_else(RegionManifest::empty);
        self.apply(&mut next, change)?;

        self.write_snapshot(&next).await?;
        *self.manifest.write().await = Some(next);
        Ok(())
    }

    async fn add_region(&self, region: Region) -> Result<(), StoreError> {
        self.with_manifest(|manifest| self.apply(manifest, RegionChange::Add(region)))
            .await
    }

    async fn update_region(&self, region: Region) -> Result<(), StoreError> {
        self.with_manifest(|manifest| self.apply(manifest, RegionChange::Update(region)))
            .await
    }

    async fn delete_region(&self, id: &str) -> Result<(), StoreError> {
        self.with_manifest(|manifest| self.apply(manifest, RegionChange::Delete(id.to_string())))
            .await
    }

    async fn get_region(&self, id: &str) -> Result<Option<Region>, StoreError> {
        self.ensure_loaded().await?;
        Ok(self
            .manifest
            .read()
            .await
            .as_ref()
            .and_then(|m| m.get(id).cloned()))
    }

    async fn get_all_regions(&self) -> Result<Vec<Region>, StoreError> {
        self.ensure_loaded().await?;
        let regions = self
            .manifest
            .read()
            .await
            .as_ref()
            .map(|m| m.regions.clone())
            .unwrap_or_default();
        debug!(count = regions.len(), "Snapshot of all regions");
        Ok(regions)
    }

    async fn local_hash(&self) -> Result<String, StoreError> {
        self.ensure_loaded().await?;
        Ok(self
            .manifest
            .read()
            .await
            .as_ref()
            .map(|m| m.hash.clone())
            .unwrap_or_else(|| NO_DATA_HASH.to_string()))
    }

    async fn load_report(&self) -> Option<LoadReport> {
        self.last_report().await
    }
}
