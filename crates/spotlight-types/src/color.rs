//! Hex color parsing for hotspot styles.
//!
//! Styles travel through the system as the hex strings the hotspot
//! definitions were authored with (`"#FF0000"` or the `"#F00"` shorthand).
//! They are only interpreted when something has to be computed from them, and
//! a malformed value is reported at that point instead of being replaced by a
//! fallback color.

use serde::{Deserialize, Serialize};

use crate::SpotError;

/// An opaque 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Parse `#RGB` or `#RRGGBB` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SpotError::BadColor`] for anything else, including a missing
    /// `#` prefix or a 4/8 digit alpha form.
    pub fn parse(hex: &str) -> Result<Self, SpotError> {
        let bad = || SpotError::BadColor(hex.to_string());

        let digits = hex.strip_prefix('#').ok_or_else(bad)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }

        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(bad()),
        };

        let value = u32::from_str_radix(&expanded, 16).map_err(|_| bad())?;
        Ok(Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        })
    }

    /// CSS `rgba(r,g,b,alpha)` form.
    pub fn rgba(&self, alpha: f32) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, alpha)
    }

    /// Canonical upper-case `#RRGGBB` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Stroke and fill colors of a hotspot marker, kept as authored hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotSpotStyle {
    pub stroke_color: String,
    pub fill_color: String,
}

impl HotSpotStyle {
    pub fn new(stroke_color: impl Into<String>, fill_color: impl Into<String>) -> Self {
        Self {
            stroke_color: stroke_color.into(),
            fill_color: fill_color.into(),
        }
    }

    /// Fail fast if either color is malformed.
    pub fn validate(&self) -> Result<(), SpotError> {
        Color::parse(&self.stroke_color)?;
        Color::parse(&self.fill_color)?;
        Ok(())
    }

    /// Compute the list-item swatch for this style: a translucent fill and a
    /// solid border.
    pub fn swatch(&self, fill_alpha: f32) -> Result<Swatch, SpotError> {
        let fill = Color::parse(&self.fill_color)?;
        let stroke = Color::parse(&self.stroke_color)?;
        Ok(Swatch {
            background: fill.rgba(fill_alpha),
            border: format!("2px solid {}", stroke.to_hex()),
        })
    }
}

/// Precomputed CSS values for rendering a hotspot in a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swatch {
    pub background: String,
    pub border: String,
}

/// The two styles the alert controller switches between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPalette {
    pub alert: HotSpotStyle,
    pub normal: HotSpotStyle,
}

impl AlertPalette {
    /// Build a palette, rejecting malformed colors up front.
    pub fn new(alert: HotSpotStyle, normal: HotSpotStyle) -> Result<Self, SpotError> {
        alert.validate()?;
        normal.validate()?;
        Ok(Self { alert, normal })
    }
}

impl Default for AlertPalette {
    fn default() -> Self {
        Self {
            alert: HotSpotStyle::new("#FF0000", "#FF8888"),
            normal: HotSpotStyle::new("#4CAF50", "#4CAF50"),
        }
    }
}
