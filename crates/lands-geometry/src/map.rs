//! Per-world marker layer built from the region store
//!
//! A rebuild computes a complete new snapshot and swaps it in, so readers
//! holding the previous snapshot keep a consistent view while it runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use lands_core::{MapUpdater, Region, WorldDirectory, WorldHook};
use lands_storage::RegionStore;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::GeometryError;
use crate::polygon::{MultiPolygon, region_geometry};
use crate::style::{MarkerStyle, RenderConfig};

/// One region rendered on a world map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub id: String,
    pub region_id: String,
    pub world: String,
    pub geometry: MultiPolygon,
    pub style: MarkerStyle,
}

impl Marker {
    pub fn id_for(region_id: &str) -> String {
        format!("lands_region_{region_id}")
    }

    fn build(region: &Region, config: &RenderConfig, fixed_rgb: u32) -> Self {
        Self {
            id: Self::id_for(&region.id),
            region_id: region.id.clone(),
            world: region.world.clone(),
            geometry: region_geometry(region),
            style: MarkerStyle::for_region(config, fixed_rgb, region),
        }
    }

    /// Ids for the individual rings, `<marker id>_<index>`
    pub fn ring_ids(&self) -> Vec<String> {
        (0..self.geometry.ring_count())
            .map(|index| format!("{}_{index}", self.id))
            .collect()
    }
}

/// Counts from one rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub loaded: usize,
    /// Regions that could not be rendered, such as those without tiles
    pub failed: usize,
}

/// Immutable result of one rebuild
#[derive(Debug, Clone, Default)]
pub struct MarkerSnapshot {
    by_world: HashMap<String, Vec<Marker>>,
    report: RebuildReport,
}

impl MarkerSnapshot {
    pub fn markers(&self, world: &str) -> &[Marker] {
        self.by_world.get(world).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn worlds(&self) -> impl Iterator<Item = &str> {
        self.by_world.keys().map(String::as_str)
    }

    pub fn report(&self) -> RebuildReport {
        self.report
    }
}

/// Marker layer serving registered worlds
pub struct MapLayer {
    store: Arc<dyn RegionStore>,
    config: RenderConfig,
    fixed_rgb: u32,
    snapshot: RwLock<Arc<MarkerSnapshot>>,
    worlds: DashSet<String>,
    /// Keeps an older rebuild from publishing over a newer one
    rebuild_lock: Mutex<()>,
}

impl MapLayer {
    pub fn new(store: Arc<dyn RegionStore>, config: RenderConfig) -> Result<Self, GeometryError> {
        let fixed_rgb = config.fixed_rgb()?;
        Ok(Self {
            store,
            config,
            fixed_rgb,
            snapshot: RwLock::new(Arc::new(MarkerSnapshot::default())),
            worlds: DashSet::new(),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Rebuild all markers from the store and publish them
    ///
    /// On a store failure the previous snapshot stays visible.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<RebuildReport, GeometryError> {
        let _guard = self.rebuild_lock.lock().await;

        let regions = self.store.get_all_regions().await?;
        let mut by_world: HashMap<String, Vec<Marker>> = HashMap::new();
        let mut report = RebuildReport::default();

        for region in &regions {
            if region.chunks.is_empty() {
                warn!(region_id = %region.id, "Region has no tiles, skipping");
                report.failed += 1;
                continue;
            }

            let marker = Marker::build(region, &self.config, self.fixed_rgb);
            by_world
                .entry(region.world.clone())
                .or_default()
                .push(marker);
            report.loaded += 1;
        }

        info!(
            loaded = report.loaded,
            failed = report.failed,
            "Map update complete"
        );
        for (world, markers) in &by_world {
            debug!(world = %world, regions = markers.len(), "World markers");
        }

        *self.snapshot.write() = Arc::new(MarkerSnapshot { by_world, report });
        Ok(report)
    }

    /// Current snapshot; unaffected by later rebuilds
    pub fn snapshot(&self) -> Arc<MarkerSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Markers for a world, empty unless the world is registered
    pub fn markers_for_world(&self, world: &str) -> Vec<Marker> {
        if !self.worlds.contains(world) {
            return Vec::new();
        }
        self.snapshot().markers(world).to_vec()
    }

    /// Markers for every world that has regions, registered or not
    pub fn all_markers(&self) -> HashMap<String, Vec<Marker>> {
        self.snapshot().by_world.clone()
    }

    pub fn is_registered(&self, world: &str) -> bool {
        self.worlds.contains(world)
    }

    pub fn registered_worlds(&self) -> Vec<String> {
        let mut worlds: Vec<String> = self.worlds.iter().map(|w| w.key().clone()).collect();
        worlds.sort();
        worlds
    }
}

#[async_trait]
impl MapUpdater for MapLayer {
    async fn update_map(&self) {
        if let Err(e) = self.rebuild().await {
            error!(error = %e, "Map update failed; keeping previous markers");
        }
    }
}

#[async_trait]
impl WorldHook for MapLayer {
    async fn register(&self, world: &str) {
        if self.worlds.insert(world.to_string()) {
            info!(world = %world, "Registered world layer");
        }
        self.update_map().await;
    }

    async fn unregister(&self, world: &str) {
        if self.worlds.remove(world).is_some() {
            info!(world = %world, "Unregistered world layer");
        }
    }
}

impl WorldDirectory for MapLayer {
    fn world_names(&self) -> Vec<String> {
        self.registered_worlds()
    }
}
