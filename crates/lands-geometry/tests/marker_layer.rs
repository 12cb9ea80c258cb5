//! Map layer driven through the store and hook traits

use std::sync::Arc;

use lands_core::{MapUpdater, Region, WorldHook};
use lands_geometry::{MapLayer, Point, RenderConfig};
use lands_storage::{RegionStore, StorageConfig, StoreOptions, open_store};
use tempfile::TempDir;

#[tokio::test]
async fn test_markers_follow_store_changes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(
        &StorageConfig::binary(dir.path().join("lands.dat")),
        StoreOptions::default(),
    )
    .unwrap();
    let layer = Arc::new(MapLayer::new(Arc::clone(&store), RenderConfig::default()).unwrap());
    layer.register("world").await;
    assert!(layer.markers_for_world("world").is_empty());

    let spawn = Region::new("spawn", "Spawn", "admin", "world")
        .with_description("<b>bold</b>")
        .with_tiles([(0, 0), (16, 0), (0, 16), (16, 16)]);
    store.add_region(spawn).await.unwrap();
    layer.update_map().await;

    let markers = layer.markers_for_world("world");
    assert_eq!(markers.len(), 1);
    assert_eq!(
        markers[0].geometry.rings,
        vec![vec![
            Point::new(0, 0),
            Point::new(32, 0),
            Point::new(32, 32),
            Point::new(0, 32),
            Point::new(0, 0),
        ]]
    );
    let popup = markers[0].style.popup.as_deref().unwrap();
    assert!(popup.contains("&lt;b&gt;bold&lt;&#x2f;b&gt;"));

    store.delete_region("spawn").await.unwrap();
    layer.update_map().await;
    assert!(layer.markers_for_world("world").is_empty());
}

#[tokio::test]
async fn test_markers_serialize_for_renderer() {
    let dir = TempDir::new().unwrap();
    let store = open_store(
        &StorageConfig::json(dir.path().join("lands.json")),
        StoreOptions::default(),
    )
    .unwrap();
    store
        .add_region(Region::new("a", "A", "o", "world").with_tiles([(0, 0)]))
        .await
        .unwrap();

    let layer = MapLayer::new(store, RenderConfig::default()).unwrap();
    layer.register("world").await;

    let json = serde_json::to_value(layer.markers_for_world("world")).unwrap();
    assert_eq!(json[0]["id"], "lands_region_a");
    assert_eq!(json[0]["geometry"]["rings"][0][1]["x"], 16);
    assert_eq!(json[0]["style"]["stroke_weight"], 2);
}
