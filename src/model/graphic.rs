//! Rendered graphic and its symbology.
//!
//! The rendering surface itself is an external collaborator; what the core
//! owns is the *description* of each graphic — geometry plus symbol — and
//! the style presets the map surface renders. The highlight animator rewrites
//! symbols, never geometry.

use serde::{Deserialize, Serialize};

use super::Geometry;

/// Opaque graphic identifier. Keys the highlight baseline cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphicId(pub u64);

impl std::fmt::Display for GraphicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// RGBA color. Channel values 0–255, alpha 0.0–1.0 (the convention the
/// original symbology used).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same hue, different opacity.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Dash pattern for animated outlines: `dash` units on, `gap` units off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashPattern {
    pub dash: f32,
    pub gap: f32,
}

impl DashPattern {
    /// Total cycle length — the modulus for the offset accumulator.
    pub fn total(&self) -> f32 {
        self.dash + self.gap
    }
}

impl Default for DashPattern {
    fn default() -> Self {
        Self { dash: 8.0, gap: 4.0 }
    }
}

/// A dashed outline at a particular phase of the animation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashStyle {
    pub pattern: DashPattern,
    pub offset: f32,
}

/// Fill + outline symbology for a region graphic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub fill: Rgba,
    pub outline: Rgba,
    pub outline_width: f32,
    /// `None` renders a solid outline.
    pub dash: Option<DashStyle>,
}

/// Accent color of the ad-hoc (editable) region.
pub const ACCENT: Rgba = Rgba::new(86, 193, 255, 1.0);

impl Symbol {
    /// Region symbol in the given accent color: translucent fill, strong
    /// solid outline. With [`ACCENT`] this is the editable look.
    pub fn region(accent: Rgba) -> Self {
        Self {
            fill: accent.with_alpha(0.18),
            outline: accent.with_alpha(0.9),
            outline_width: 2.0,
            dash: None,
        }
    }

    /// The editable (checked-out / ad-hoc) look.
    pub fn editable() -> Self {
        Self::region(ACCENT)
    }

    /// Faint symbology of the dataset layer underlay.
    pub fn dataset_layer() -> Self {
        Self {
            fill: ACCENT.with_alpha(0.05),
            outline: ACCENT.with_alpha(0.15),
            outline_width: 0.5,
            dash: None,
        }
    }
}

/// A region graphic: geometry plus how to draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphic {
    pub id: GraphicId,
    pub geometry: Geometry,
    pub symbol: Symbol,
}

impl Graphic {
    pub fn new(id: GraphicId, geometry: Geometry, symbol: Symbol) -> Self {
        Self { id, geometry, symbol }
    }
}
