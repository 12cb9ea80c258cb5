//! Tile codec
//!
//! A tile is a fixed-size grid cell. Its origin `(x, z)` is packed into a
//! single 64-bit key: the high 32 bits hold `x`, the low 32 bits hold `z`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Side length of one tile in world units
pub const TILE_SIZE: i64 = 16;

/// Pack a tile origin into a 64-bit key
pub const fn pack(x: i32, z: i32) -> u64 {
    (((x as i64) << 32) | (z as u32 as i64)) as u64
}

/// Extract the x coordinate from a packed key
pub const fn unpack_x(key: u64) -> i32 {
    ((key as i64) >> 32) as i32
}

/// Extract the z coordinate from a packed key
pub const fn unpack_z(key: u64) -> i32 {
    key as u32 as i32
}

/// Origin of one tile on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: i32,
    pub z: i32,
}

impl TileCoordinate {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn key(self) -> TileKey {
        TileKey(pack(self.x, self.z))
    }
}

impl From<TileKey> for TileCoordinate {
    fn from(key: TileKey) -> Self {
        key.coordinate()
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Packed tile coordinate as stored in a region
///
/// Serialized as a signed 64-bit integer, which is how the remote authority
/// and the editor exchange chunk lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct TileKey(pub u64);

impl TileKey {
    pub const fn from_xz(x: i32, z: i32) -> Self {
        Self(pack(x, z))
    }

    pub const fn x(self) -> i32 {
        unpack_x(self.0)
    }

    pub const fn z(self) -> i32 {
        unpack_z(self.0)
    }

    pub const fn coordinate(self) -> TileCoordinate {
        TileCoordinate::new(self.x(), self.z())
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<i64> for TileKey {
    fn from(value: i64) -> Self {
        Self(value as u64)
    }
}

impl From<TileKey> for i64 {
    fn from(key: TileKey) -> Self {
        key.0 as i64
    }
}

impl From<TileCoordinate> for TileKey {
    fn from(coord: TileCoordinate) -> Self {
        coord.key()
    }
}
