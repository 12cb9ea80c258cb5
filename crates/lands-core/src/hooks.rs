//! Callbacks between the core and the host runtime

use async_trait::async_trait;

/// Rebuilds rendered geometry after the region set changed
///
/// Invoked after editor mutations, after a successful sync, and when a world
/// is registered. Implementations must be idempotent.
#[async_trait]
pub trait MapUpdater: Send + Sync {
    async fn update_map(&self);
}

/// World load/unload notifications, decoupled from any host event bus
#[async_trait]
pub trait WorldHook: Send + Sync {
    async fn register(&self, world: &str);

    async fn unregister(&self, world: &str);
}

/// Names of the worlds the host currently has loaded
pub trait WorldDirectory: Send + Sync {
    fn world_names(&self) -> Vec<String>;
}

/// Updater that does nothing, for headless nodes and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMapUpdater;

#[async_trait]
impl MapUpdater for NoopMapUpdater {
    async fn update_map(&self) {}
}
