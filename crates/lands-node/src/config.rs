//! Configuration for the node coordinator

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lands_core::{RegionValidator, ValidationLimits};
use lands_editor::EditorConfig;
use lands_geometry::RenderConfig;
use lands_logging::LogConfig;
use lands_storage::{StorageConfig, StoreOptions};
use lands_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NodeResult;

/// Region validation rules shared by the store and the editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub limits: ValidationLimits,
    /// Worlds regions may be placed in; empty allows any world
    pub allowed_worlds: Vec<String>,
}

impl ValidationConfig {
    pub fn validator(&self) -> RegionValidator {
        RegionValidator::new(self.limits.clone())
    }

    pub fn allowed_worlds(&self) -> HashSet<String> {
        self.allowed_worlds.iter().cloned().collect()
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default()
            .with_validator(self.validator())
            .with_allowed_worlds(self.allowed_worlds.iter().cloned())
    }
}

/// Complete node configuration, as stored in `lands.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandsConfig {
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub sync: SyncConfig,
    pub editor: EditorConfig,
    pub rendering: RenderConfig,
    pub logging: LogConfig,
}

impl LandsConfig {
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_editor(mut self, editor: EditorConfig) -> Self {
        self.editor = editor;
        self
    }

    pub fn with_rendering(mut self, rendering: RenderConfig) -> Self {
        self.rendering = rendering;
        self
    }

    pub fn from_toml_str(contents: &str) -> NodeResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> NodeResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read the config at `path`, writing the defaults there first if it is missing
    pub fn load_or_init(path: &Path) -> NodeResult<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, config.to_toml_string()?)?;
            info!(path = %path.display(), "Wrote default configuration");
            return Ok(config);
        }

        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
