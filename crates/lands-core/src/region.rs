//! Region and manifest data model

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tile::{TileCoordinate, TileKey};

/// Hash of a manifest that has never received data from the remote authority
pub const NO_DATA_HASH: &str = "";

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A named claim composed of a set of tiles plus descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Immutable identity, `[a-zA-Z0-9_-]{1,64}`
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    #[serde(default)]
    pub contact: String,
    /// Name of the world this claim lives in
    pub world: String,
    /// Packed tile keys; duplicates are a validation error
    pub chunks: Vec<TileKey>,
}

impl Region {
    /// Create a region with no tiles and empty optional fields
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
        world: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            owner: owner.into(),
            contact: String::new(),
            world: world.into(),
            chunks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    /// Append tiles given by their origin coordinates
    pub fn with_tiles(mut self, tiles: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.chunks
            .extend(tiles.into_iter().map(|(x, z)| TileKey::from_xz(x, z)));
        self
    }

    /// Tiles in stored order, duplicates included
    pub fn tiles(&self) -> impl Iterator<Item = TileCoordinate> + '_ {
        self.chunks.iter().map(|key| key.coordinate())
    }

    /// Distinct tiles, for read paths that must tolerate duplicates
    pub fn distinct_tiles(&self) -> HashSet<TileCoordinate> {
        self.tiles().collect()
    }
}

/// Versioned snapshot of all regions plus a content fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionManifest {
    /// Opaque fingerprint assigned by the remote authority
    pub hash: String,
    /// Last-modified instant, epoch milliseconds
    pub timestamp: i64,
    pub regions: Vec<Region>,
}

impl RegionManifest {
    /// An empty manifest carrying the "no data" hash
    pub fn empty() -> Self {
        Self {
            hash: NO_DATA_HASH.to_string(),
            timestamp: now_millis(),
            regions: Vec::new(),
        }
    }

    pub fn new(hash: impl Into<String>, timestamp: i64, regions: Vec<Region>) -> Self {
        Self {
            hash: hash.into(),
            timestamp,
            regions,
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Mark the manifest as modified now
    pub fn touch(&mut self) {
        self.timestamp = now_millis();
    }
}

impl Default for RegionManifest {
    fn default() -> Self {
        Self::empty()
    }
}
