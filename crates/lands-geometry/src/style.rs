//! Marker styling: colors, tooltips and popups

use lands_core::Region;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// How region colors are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    /// Every region uses `fixed_color`
    #[default]
    Fixed,
    /// Hue derived from the owner name
    OwnerHash,
}

/// Map layer presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub label: String,
    pub show_controls: bool,
    pub default_hidden: bool,
    pub update_interval_secs: u64,
    pub priority: i32,
    pub z_index: i32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            label: "Lands".to_string(),
            show_controls: true,
            default_hidden: false,
            update_interval_secs: 15,
            priority: 99,
            z_index: 99,
        }
    }
}

/// Rendering section of the node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub color_scheme: ColorScheme,
    /// `#RRGGBB`
    pub fixed_color: String,
    pub stroke_opacity: u8,
    pub fill_opacity: u8,
    pub stroke_weight: u32,
    pub enable_tooltips: bool,
    pub tooltip_sticky: bool,
    pub layer: LayerConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Fixed,
            fixed_color: "#3388FF".to_string(),
            stroke_opacity: 200,
            fill_opacity: 100,
            stroke_weight: 2,
            enable_tooltips: true,
            tooltip_sticky: false,
            layer: LayerConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn with_color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    pub fn with_fixed_color(mut self, color: impl Into<String>) -> Self {
        self.fixed_color = color.into();
        self
    }

    pub fn with_tooltips(mut self, enabled: bool) -> Self {
        self.enable_tooltips = enabled;
        self
    }

    /// Parsed `fixed_color` as `0x00RRGGBB`
    pub fn fixed_rgb(&self) -> Result<u32, GeometryError> {
        parse_hex_color(&self.fixed_color)
            .ok_or_else(|| GeometryError::InvalidColor(self.fixed_color.clone()))
    }
}

/// Style attached to one marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub stroke_weight: u32,
    /// ARGB
    pub stroke_color: u32,
    /// ARGB
    pub fill_color: u32,
    pub tooltip: Option<String>,
    pub tooltip_sticky: bool,
    pub popup: Option<String>,
}

impl MarkerStyle {
    /// Style for `region`; `fixed_rgb` is the pre-parsed fixed color
    pub fn for_region(config: &RenderConfig, fixed_rgb: u32, region: &Region) -> Self {
        let (stroke_color, fill_color) = match config.color_scheme {
            ColorScheme::Fixed => (
                with_alpha(fixed_rgb, config.stroke_opacity),
                with_alpha(fixed_rgb, config.fill_opacity),
            ),
            ColorScheme::OwnerHash => (
                color_for_owner(&region.owner, config.stroke_opacity),
                color_for_owner(&region.owner, config.fill_opacity),
            ),
        };

        let (tooltip, popup) = if config.enable_tooltips {
            (Some(region.name.clone()), Some(popup_html(region)))
        } else {
            (None, None)
        };

        Self {
            stroke_weight: config.stroke_weight,
            stroke_color,
            fill_color,
            tooltip,
            tooltip_sticky: config.tooltip_sticky,
            popup,
        }
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into `0x00RRGGBB`
pub fn parse_hex_color(text: &str) -> Option<u32> {
    let digits = text.strip_prefix('#').unwrap_or(text);
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

pub fn with_alpha(rgb: u32, alpha: u8) -> u32 {
    (u32::from(alpha) << 24) | (rgb & 0x00FF_FFFF)
}

/// Stable per-owner color with the given alpha
///
/// Hue is the owner-name hash modulo 360 at saturation 0.85 and value 0.95.
/// The hash is the classic 31-multiplier string hash over UTF-16 code units,
/// so colors match those shown by existing map installations.
pub fn color_for_owner(owner: &str, alpha: u8) -> u32 {
    let hash = owner
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    let hue = (hash.unsigned_abs() % 360) as f32;
    hsv_to_argb(alpha, hue, 0.85, 0.95)
}

pub fn hsv_to_argb(alpha: u8, hue: f32, saturation: f32, value: f32) -> u32 {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |v: f32| ((v + m) * 255.0) as u32 & 0xFF;
    (u32::from(alpha) << 24) | (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

pub fn escape_html(text: &str) -> String {
    v_htmlescape::escape(text).to_string()
}

/// Popup body listing the region's descriptive fields
pub fn popup_html(region: &Region) -> String {
    format!(
        "<div style=\"text-align:center;\">\n\
         <b>{}</b><br/>\n\
         <i>{}</i><br/>\n\
         <hr/>\n\
         Owner: {}<br/>\n\
         Contact: {}\n\
         </div>",
        escape_html(&region.name),
        escape_html(&region.description),
        escape_html(&region.owner),
        escape_html(&region.contact),
    )
}
