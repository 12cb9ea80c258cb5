//! Editor operations end to end against a file-backed store

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lands_core::{MapUpdater, Region, WorldDirectory};
use lands_editor::{EditorConfig, EditorCredentials, EditorService, SessionManager};
use lands_storage::{RegionStore, StorageConfig, StoreOptions, open_store};
use tempfile::TempDir;

#[derive(Default)]
struct CountingUpdater(AtomicUsize);

#[async_trait]
impl MapUpdater for CountingUpdater {
    async fn update_map(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct StaticWorlds(Vec<String>);

impl WorldDirectory for StaticWorlds {
    fn world_names(&self) -> Vec<String> {
        self.0.clone()
    }
}

struct Fixture {
    dir: TempDir,
    store: Arc<dyn RegionStore>,
    updater: Arc<CountingUpdater>,
    editor: EditorService,
}

fn fixture(config: EditorConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = open_store(
        &StorageConfig::json(dir.path().join("lands.json")),
        StoreOptions::default(),
    )
    .unwrap();
    let updater = Arc::new(CountingUpdater::default());
    let editor = EditorService::new(
        Arc::clone(&store),
        Arc::new(SessionManager::new(&config)),
        updater.clone(),
        Arc::new(StaticWorlds(vec!["world".to_string(), "world_nether".to_string()])),
    );
    Fixture {
        dir,
        store,
        updater,
        editor,
    }
}

fn region(id: &str) -> Region {
    Region::new(id, format!("Region {id}"), "owner", "world").with_tiles([(0, 0), (16, 0)])
}

fn login() -> HashMap<String, String> {
    [("username", "admin"), ("password", "pw")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn secured() -> EditorConfig {
    EditorConfig::default().with_auth(EditorCredentials::Basic {
        username: "admin".into(),
        password: "pw".into(),
    })
}

#[tokio::test]
async fn test_open_editor_create_persists_and_rebuilds() {
    let f = fixture(EditorConfig::default());

    let response = f.editor.create_region(None, region("spawn")).await;
    assert_eq!(response.status, 201);
    assert_eq!(response.region, Some(region("spawn")));
    assert_eq!(f.updater.0.load(Ordering::SeqCst), 1);

    // Saved to disk, visible to a fresh store
    let reopened = open_store(
        &StorageConfig::json(f.dir.path().join("lands.json")),
        StoreOptions::default(),
    )
    .unwrap();
    assert_eq!(reopened.get_region("spawn").await.unwrap(), Some(region("spawn")));
}

#[tokio::test]
async fn test_secured_editor_requires_session() {
    let f = fixture(secured());

    assert_eq!(f.editor.list_regions(None).await.status, 401);
    assert_eq!(f.editor.list_regions(Some("forged")).await.status, 401);

    let mut wrong = login();
    wrong.insert("password".to_string(), "nope".to_string());
    let denied = f.editor.auth(&wrong).await;
    assert_eq!(denied.status, 401);
    assert_eq!(denied.error.as_deref(), Some("Invalid credentials"));
    assert!(denied.token.is_none());

    let granted = f.editor.auth(&login()).await;
    assert_eq!(granted.status, 200);
    let token = granted.token.unwrap();

    let created = f.editor.create_region(Some(token.as_str()), region("spawn")).await;
    assert_eq!(created.status, 201);

    let listed = f.editor.list_regions(Some(token.as_str())).await;
    assert_eq!(listed.regions.map(|r| r.len()), Some(1));

    assert_eq!(f.editor.logout(Some(token.as_str())).await.status, 200);
    assert_eq!(f.editor.list_regions(Some(token.as_str())).await.status, 401);
}

#[tokio::test]
async fn test_failures_are_structured() {
    let f = fixture(EditorConfig::default());
    f.editor.create_region(None, region("spawn")).await;
    let saves_after_create = f.updater.0.load(Ordering::SeqCst);

    let duplicate = f.editor.create_region(None, region("spawn")).await;
    assert_eq!(duplicate.status, 400);
    assert!(duplicate.error.unwrap().contains("already exists"));

    let mut invalid = region("bad id");
    invalid.chunks.clear();
    let rejected = f.editor.create_region(None, invalid).await;
    assert_eq!(rejected.status, 400);
    assert_eq!(rejected.error.as_deref(), Some("Validation failed"));
    assert_eq!(rejected.errors.map(|e| e.len()), Some(2));

    let mismatch = f.editor.update_region(None, "other", region("spawn")).await;
    assert_eq!(mismatch.status, 400);
    assert_eq!(mismatch.error.as_deref(), Some("Region ID mismatch"));

    assert_eq!(f.editor.update_region(None, "ghost", region("ghost")).await.status, 404);
    assert_eq!(f.editor.delete_region(None, "ghost").await.status, 404);
    assert_eq!(f.editor.get_region(None, "ghost").await.status, 404);

    // Nothing above mutated the store
    assert_eq!(f.updater.0.load(Ordering::SeqCst), saves_after_create);
    assert_eq!(f.store.get_all_regions().await.unwrap(), vec![region("spawn")]);
}

#[tokio::test]
async fn test_update_then_delete() {
    let f = fixture(EditorConfig::default());
    f.editor.create_region(None, region("spawn")).await;

    let mut renamed = region("spawn");
    renamed.name = "Renamed".to_string();
    let updated = f.editor.update_region(None, "spawn", renamed.clone()).await;
    assert_eq!(updated.status, 200);
    assert_eq!(f.editor.get_region(None, "spawn").await.region, Some(renamed));

    assert_eq!(f.editor.delete_region(None, "spawn").await.status, 200);
    assert_eq!(f.editor.get_region(None, "spawn").await.status, 404);
    assert_eq!(f.updater.0.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_list_worlds() {
    let f = fixture(EditorConfig::default());

    let response = f.editor.list_worlds(None).await;
    assert_eq!(
        response.worlds,
        Some(vec!["world".to_string(), "world_nether".to_string()])
    );
    assert!(response.to_json().contains(r#""worlds":["world","world_nether"]"#));
}

#[tokio::test]
async fn test_failed_write_rolls_back_and_retry_succeeds() {
    let f = fixture(EditorConfig::default());
    f.editor.create_region(None, region("spawn")).await;

    // A directory squatting on the temp path makes every write fail
    let blocker = f.dir.path().join("lands.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    let failed = f.editor.create_region(None, region("market")).await;
    assert_eq!(failed.status, 500);
    assert_eq!(f.editor.get_region(None, "market").await.status, 404);

    let mut renamed = region("spawn");
    renamed.name = "Renamed".to_string();
    assert_eq!(f.editor.update_region(None, "spawn", renamed).await.status, 500);
    assert_eq!(f.editor.delete_region(None, "spawn").await.status, 500);
    assert_eq!(f.editor.get_region(None, "spawn").await.region, Some(region("spawn")));
    assert_eq!(f.updater.0.load(Ordering::SeqCst), 1);

    std::fs::remove_dir(&blocker).unwrap();
    let retried = f.editor.create_region(None, region("market")).await;
    assert_eq!(retried.status, 201);
    assert_eq!(f.store.get_all_regions().await.unwrap().len(), 2);
}
