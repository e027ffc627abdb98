//! Region-of-interest geometry.
//!
//! A `Geometry` is a simple, closed exterior ring in a known spatial
//! reference. Construction with validation lives in [`crate::geom`]; this
//! type only guarantees that whatever it wraps stays immutable and that
//! cloning it produces a fully independent deep copy of the boundary.

use geo::{Centroid, Coord, Intersects, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Spatial reference of a geometry. Everything in this crate is WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialRef {
    Wgs84,
}

impl SpatialRef {
    /// Well-known id, as used by Esri JSON (`{"wkid": 4326}`).
    pub fn wkid(&self) -> i32 {
        match self {
            SpatialRef::Wgs84 => 4326,
        }
    }
}

impl Default for SpatialRef {
    fn default() -> Self {
        SpatialRef::Wgs84
    }
}

/// Monotonic version of the query geometry. A population result is only
/// valid for display while its version is still the latest issued.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GeometryVersion(pub u64);

impl std::fmt::Display for GeometryVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A region-of-interest boundary: one simple, closed exterior ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    polygon: Polygon<f64>,
    spatial_ref: SpatialRef,
}

impl Geometry {
    /// Wrap an already-validated polygon. Callers go through
    /// [`crate::geom::from_ring`] or [`crate::geom::geodesic_buffer`].
    pub(crate) fn new_unchecked(polygon: Polygon<f64>) -> Self {
        Self { polygon, spatial_ref: SpatialRef::Wgs84 }
    }

    pub fn spatial_ref(&self) -> SpatialRef {
        self.spatial_ref
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Exterior ring coordinates, closed (first == last).
    pub fn ring(&self) -> &[Coord<f64>] {
        &self.polygon.exterior().0
    }

    /// Number of distinct boundary vertices (the closing vertex not counted).
    pub fn vertex_count(&self) -> usize {
        self.ring().len().saturating_sub(1)
    }

    /// Centroid of the boundary. A dragged buffer derives its new center
    /// from this.
    pub fn centroid(&self) -> Option<Point<f64>> {
        self.polygon.centroid()
    }

    /// Spatial predicate used by every aggregate query.
    pub fn intersects(&self, other: &Geometry) -> bool {
        self.polygon.intersects(&other.polygon)
    }

    pub fn intersects_polygon(&self, other: &Polygon<f64>) -> bool {
        self.polygon.intersects(other)
    }
}
