//! # Lands Core
//!
//! Core types for land claim regions anchored to a tile grid.
//!
//! ## Key Types
//!
//! - [`TileCoordinate`] / [`TileKey`]: a grid cell and its packed 64-bit form
//! - [`Region`]: a named claim made of tiles plus descriptive metadata
//! - [`RegionManifest`]: the full versioned snapshot of all regions
//! - [`RegionValidator`]: stateless rule engine for region fields and tiles
//!
//! ## Key Traits
//!
//! - [`Fingerprint`]: pluggable content fingerprint over a region set
//! - [`MapUpdater`]: callback to rebuild rendered geometry after a change
//! - [`WorldHook`]: world load/unload notifications from the host runtime
//! - [`WorldDirectory`]: the worlds currently loaded by the host

pub mod fingerprint;
pub mod hooks;
pub mod region;
pub mod tile;
pub mod validation;

pub use fingerprint::{Blake3Fingerprint, Fingerprint};
pub use hooks::{MapUpdater, NoopMapUpdater, WorldDirectory, WorldHook};
pub use region::{NO_DATA_HASH, Region, RegionManifest, now_millis};
pub use tile::{TILE_SIZE, TileCoordinate, TileKey, pack, unpack_x, unpack_z};
pub use validation::{RegionValidator, ValidationLimits, ValidationResult};
