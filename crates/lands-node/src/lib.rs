//! # Lands Node
//!
//! Host-side coordinator for land claim regions.
//!
//! [`LandsNode`] ties together:
//! - the region store selected by configuration
//! - the per-world map layer, rebuilt after every change
//! - the remote authority sync scheduler (when enabled)
//! - the editor service and its session cleanup task
//!
//! ## Example
//!
//! ```rust,ignore
//! use lands_node::{LandsConfig, LandsNode};
//!
//! let config = LandsConfig::load_or_init("lands.toml".as_ref())?;
//! let node = LandsNode::new(config)?;
//! node.start().await?;
//! node.register_world("world").await;
//!
//! let response = node.editor().list_regions(None).await;
//! println!("{}", response.to_json());
//!
//! node.stop().await?;
//! ```

pub mod cli;
mod config;
mod error;

pub use config::{LandsConfig, ValidationConfig};
pub use error::{NodeError, NodeResult};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lands_core::{MapUpdater, WorldDirectory, WorldHook};
use lands_editor::{EditorService, SessionManager};
use lands_geometry::MapLayer;
use lands_storage::{RegionStore, open_store};
use lands_sync::SyncManager;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// A running land claim node
pub struct LandsNode {
    config: LandsConfig,
    store: Arc<dyn RegionStore>,
    map: Arc<MapLayer>,
    /// None while sync is disabled
    sync: Option<Arc<SyncManager>>,
    sessions: Arc<SessionManager>,
    editor: Arc<EditorService>,
    shutdown_tx: broadcast::Sender<()>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl LandsNode {
    /// Build every component from `config`; nothing runs until [`start`](Self::start)
    pub fn new(config: LandsConfig) -> NodeResult<Self> {
        let store = open_store(&config.storage, config.validation.store_options())?;
        let map = Arc::new(MapLayer::new(Arc::clone(&store), config.rendering.clone())?);

        let sync = if config.sync.enabled {
            let manager = SyncManager::with_http(
                config.sync.clone(),
                Arc::clone(&store),
                Arc::clone(&map) as Arc<dyn MapUpdater>,
            )?;
            Some(Arc::new(manager))
        } else {
            None
        };

        let sessions = Arc::new(SessionManager::new(&config.editor));
        let editor = EditorService::new(
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&map) as Arc<dyn MapUpdater>,
            Arc::clone(&map) as Arc<dyn WorldDirectory>,
        )
        .with_validator(
            config.validation.validator(),
            config.validation.allowed_worlds(),
        );

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            store,
            map,
            sync,
            sessions,
            editor: Arc::new(editor),
            shutdown_tx,
            cleanup_task: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }

    /// Load the store, render the map and start background tasks
    #[instrument(skip(self))]
    pub async fn start(&self) -> NodeResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NodeError::AlreadyStarted);
        }

        // A failed load leaves the store empty; sync can still repair it
        match self.store.load(false).await {
            Ok(Some(manifest)) => info!(regions = manifest.len(), "Loaded regions"),
            Ok(None) => info!("No stored regions, starting empty"),
            Err(e) => error!(error = %e, "Failed to load regions"),
        }
        self.map.update_map().await;

        if let Some(sync) = &self.sync {
            sync.start();
        }

        let cleanup = self
            .sessions
            .spawn_cleanup(self.config.editor.cleanup_interval(), self.shutdown_tx.subscribe());
        *self.cleanup_task.lock() = Some(cleanup);

        info!(store = %self.store.describe(), sync = self.sync.is_some(), "Node started");
        Ok(())
    }

    /// Stop background tasks and persist the current manifest
    pub async fn stop(&self) -> NodeResult<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(NodeError::NotStarted);
        }

        let _ = self.shutdown_tx.send(());
        if let Some(sync) = &self.sync {
            sync.shutdown().await;
        }

        let cleanup = self.cleanup_task.lock().take();
        if let Some(handle) = cleanup {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session cleanup task ended abnormally");
            }
        }

        self.store.save(None).await?;
        info!("Node stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Host notification that a world finished loading
    pub async fn register_world(&self, world: &str) {
        self.map.register(world).await;
    }

    /// Host notification that a world was unloaded
    pub async fn unregister_world(&self, world: &str) {
        self.map.unregister(world).await;
    }

    pub fn config(&self) -> &LandsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RegionStore> {
        &self.store
    }

    pub fn map(&self) -> &Arc<MapLayer> {
        &self.map
    }

    pub fn sync(&self) -> Option<&Arc<SyncManager>> {
        self.sync.as_ref()
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn editor(&self) -> &Arc<EditorService> {
        &self.editor
    }
}
