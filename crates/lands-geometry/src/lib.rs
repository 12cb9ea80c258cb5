//! # Lands Geometry
//!
//! Turns a region's tiles into map geometry.
//!
//! - [`region_to_multipolygon`]: union of tile squares traced into closed rings
//! - [`MapLayer`]: per-world marker snapshots rebuilt from the region store
//! - [`RenderConfig`] / [`MarkerStyle`]: colors, tooltips and popups

pub mod error;
pub mod map;
pub mod polygon;
pub mod style;

pub use error::GeometryError;
pub use map::{MapLayer, Marker, MarkerSnapshot, RebuildReport};
pub use polygon::{MultiPolygon, Point, Ring, region_geometry, region_to_multipolygon};
pub use style::{
    ColorScheme, LayerConfig, MarkerStyle, RenderConfig, color_for_owner, escape_html,
    parse_hex_color, popup_html,
};
