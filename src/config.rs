//! Session configuration.
//!
//! Everything tunable lives here so hosts can persist and restore it as one
//! serde document. Defaults target the NZ 250 m population grid
//! (`PopEst2023`), a 1 km starting radius, and a five-color comparison
//! palette.

use serde::{Deserialize, Serialize};

use crate::model::{DashPattern, Rgba};

/// Hard cap on saved comparison queries. Capacity is enforced, never evicted.
pub const MAX_SAVED_QUERIES: usize = 5;

/// Highlight animation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Tick interval in milliseconds.
    pub tick_ms: u64,
    /// Offset advance per tick, in dash-pattern units.
    pub step: f32,
    pub dash: DashPattern,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { tick_ms: 60, step: 1.0, dash: DashPattern::default() }
    }
}

/// Top-level session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Radius used for the first buffer placement, before the user touches
    /// the radius control.
    pub default_radius_km: f64,
    /// Numeric attribute summed by every aggregate query.
    pub population_field: String,
    /// Output alias the aggregate is reported under.
    pub stat_alias: String,
    /// Fixed total used for the percent-of-reference readout.
    pub reference_population: f64,
    /// Saved-query colors, cycled by insertion order.
    pub palette: Vec<Rgba>,
    pub highlight: HighlightConfig,
    /// Host-persisted flag: the intro panel has been dismissed once and the
    /// core must never re-trigger it.
    pub intro_dismissed: bool,
}

impl SessionConfig {
    pub fn palette_color(&self, insertion_ordinal: u64) -> Rgba {
        self.palette[(insertion_ordinal as usize) % self.palette.len()]
    }

    /// Load a persisted configuration.
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Persist the configuration (including the intro-dismissed flag).
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 1.0,
            population_field: "PopEst2023".to_string(),
            stat_alias: "totalPop".to_string(),
            // 2023 estimated resident population of the full dataset.
            reference_population: 5_223_100.0,
            palette: vec![
                Rgba::new(86, 193, 255, 1.0),
                Rgba::new(255, 170, 51, 1.0),
                Rgba::new(115, 217, 121, 1.0),
                Rgba::new(255, 105, 180, 1.0),
                Rgba::new(178, 132, 255, 1.0),
            ],
            highlight: HighlightConfig::default(),
            intro_dismissed: false,
        }
    }
}
