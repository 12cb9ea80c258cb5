//! Installs the global subscriber, so this binary holds a single test

use lands_logging::{FileConfig, LandsSubscriberBuilder, LogConfig, LogError, RotationStrategy};

#[test]
fn test_file_output_is_jsonl() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = LogConfig {
        default_level: "info".to_string(),
        file: Some(FileConfig {
            directory: dir.path().to_path_buf(),
            prefix: "node".to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        }),
        ..LogConfig::testing()
    };

    let guard = LandsSubscriberBuilder::new().with_config(config).try_init().unwrap();
    assert!(guard.is_some());

    tracing::error!(region_id = "spawn", "Map update failed");
    drop(guard);

    let contents = std::fs::read_to_string(dir.path().join("node.log")).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("Map update failed"))
        .unwrap();
    assert!(line.starts_with('{'));
    assert!(line.contains(r#""region_id":"spawn""#));
    assert!(line.contains(r#""level":"ERROR""#));

    let again = LandsSubscriberBuilder::new().with_console(false).try_init();
    assert!(matches!(again, Err(LogError::Init(_))));
}
