//! Periodic hash-diff sync with the remote authority
//!
//! A cycle compares the local manifest hash with the remote status hash and
//! only downloads the manifest when they differ. The fetched manifest
//! replaces the local one wholesale through the store's atomic `save`, then
//! the map is rebuilt. Failures leave local state untouched; the next tick
//! is the retry.

use std::future::Future;
use std::sync::Arc;

use lands_core::{MapUpdater, NO_DATA_HASH};
use lands_storage::RegionStore;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::remote::{HttpRemote, RemoteSource};

/// Whether a cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Result of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Hashes matched, nothing downloaded
    UpToDate,
    /// A new manifest was installed
    Updated { hash: String, regions: usize },
}

/// Drives sync cycles, on demand or on a fixed interval
pub struct SyncManager {
    config: SyncConfig,
    store: Arc<dyn RegionStore>,
    remote: Arc<dyn RemoteSource>,
    map_updater: Arc<dyn MapUpdater>,
    state: RwLock<SyncState>,
    /// One cycle at a time, whether scheduled or manual
    cycle_lock: tokio::sync::Mutex<()>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Returns the manager to `Idle` even if the cycle future is dropped
struct SyncingGuard<'a>(&'a RwLock<SyncState>);

impl<'a> SyncingGuard<'a> {
    fn enter(state: &'a RwLock<SyncState>) -> Self {
        *state.write() = SyncState::Syncing;
        Self(state)
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        *self.0.write() = SyncState::Idle;
    }
}

impl SyncManager {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RegionStore>,
        remote: Arc<dyn RemoteSource>,
        map_updater: Arc<dyn MapUpdater>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            store,
            remote,
            map_updater,
            state: RwLock::new(SyncState::Idle),
            cycle_lock: tokio::sync::Mutex::new(()),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Manager talking to the configured HTTP authority
    pub fn with_http(
        config: SyncConfig,
        store: Arc<dyn RegionStore>,
        map_updater: Arc<dyn MapUpdater>,
    ) -> Result<Self, SyncError> {
        let remote = Arc::new(HttpRemote::new(&config)?);
        Ok(Self::new(config, store, remote, map_updater))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one sync cycle now
    #[instrument(skip(self), fields(url = %self.config.base_url()))]
    pub async fn sync_once(&self) -> Result<SyncOutcome, SyncError> {
        let _cycle = self.cycle_lock.lock().await;
        let _syncing = SyncingGuard::enter(&self.state);

        let local_hash = match self.store.local_hash().await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "Local manifest unreadable, treating as empty");
                NO_DATA_HASH.to_string()
            }
        };

        let status = self
            .with_retry("status", || self.remote.fetch_status())
            .await?;

        if status.hash == local_hash {
            info!(hash = %local_hash, "Local data is up to date");
            return Ok(SyncOutcome::UpToDate);
        }

        info!(
            local_hash = %local_hash,
            remote_hash = %status.hash,
            "Update detected, downloading"
        );

        let decoded = self
            .with_retry("regions", || self.remote.fetch_manifest())
            .await?;
        if decoded.malformed > 0 {
            warn!(
                malformed = decoded.malformed,
                "Remote manifest contained malformed regions"
            );
        }

        let hash = decoded.manifest.hash.clone();
        let regions = decoded.manifest.regions.len();
        self.store.save(Some(decoded.manifest)).await?;
        info!(regions, hash = %hash, "Regions updated");

        self.map_updater.update_map().await;
        Ok(SyncOutcome::Updated { hash, regions })
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    debug!(what, attempt, error = %e, "Request failed, retrying");
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Start the periodic scheduler; the first cycle runs immediately
    ///
    /// Calling this while the scheduler is already running does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Sync scheduler already running");
            return;
        }

        let manager = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.config.refresh_interval();

        *task = Some(tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Sync task started");

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sync task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = manager.sync_once().await {
                            warn!(error = %e, "Sync failed");
                        }
                    }
                }
            }
        }));
    }

    /// Stop the scheduler, letting an in-flight cycle finish
    ///
    /// Safe to call repeatedly or when the scheduler never started.
    pub async fn shutdown(&self) {
        let handle = self.task.lock().take();
        let Some(handle) = handle else {
            return;
        };

        let _ = self.shutdown_tx.send(());
        if let Err(e) = handle.await {
            warn!(error = %e, "Sync task ended abnormally");
        }
    }
}
