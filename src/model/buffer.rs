//! Circular geodesic buffer specification.

use geo::Point;
use serde::{Deserialize, Serialize};

/// Center + radius of a circular region. Regenerating the geometry from a
/// spec is idempotent and deterministic for fixed inputs — the spec, not
/// the ring, is the source of truth for a buffer region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub center: Point<f64>,
    pub radius_km: f64,
}

impl BufferSpec {
    pub fn new(center: Point<f64>, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Same circle, new center. Used when a drag moves the buffer.
    pub fn recentered(&self, center: Point<f64>) -> Self {
        Self { center, radius_km: self.radius_km }
    }

    /// Same center, new radius. Used by the radius slider.
    pub fn with_radius(&self, radius_km: f64) -> Self {
        Self { center: self.center, radius_km }
    }
}
