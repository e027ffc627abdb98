//! Geometry construction.
//!
//! Pure functions that turn user input into validated [`Geometry`] values:
//! a geodesic buffer from a center + radius, or a drawn ring from traced
//! coordinates. Nothing here touches the query layer or holds state —
//! input → geometry is a pure function, same inputs, same boundary.

use geo::{Coord, HaversineDestination, Line, LineString, Point, Polygon};
use geo::Intersects;

use crate::model::{BufferSpec, Geometry};
use crate::{Error, Result};

/// Perimeter vertices of a generated buffer ring. Fixed so regeneration is
/// deterministic for fixed inputs.
pub const BUFFER_VERTICES: usize = 72;

/// Build the geodesic buffer ring for a circle spec.
///
/// Vertices are haversine destinations from the center at evenly spaced
/// bearings, clockwise from north. Deterministic and idempotent: the same
/// spec always yields the same ring.
pub fn geodesic_buffer(center: Point<f64>, radius_km: f64) -> Geometry {
    let radius_m = radius_km * 1000.0;
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(BUFFER_VERTICES + 1);
    for i in 0..BUFFER_VERTICES {
        let bearing = i as f64 * (360.0 / BUFFER_VERTICES as f64);
        let vertex = center.haversine_destination(bearing, radius_m);
        ring.push(Coord { x: vertex.x(), y: vertex.y() });
    }
    ring.push(ring[0]);
    Geometry::new_unchecked(Polygon::new(LineString::new(ring), vec![]))
}

/// Buffer geometry for a spec. See [`geodesic_buffer`].
pub fn buffer(spec: &BufferSpec) -> Geometry {
    geodesic_buffer(spec.center, spec.radius_km)
}

/// Validate a freehand-drawn boundary and build its geometry.
///
/// Requirements: at least 3 distinct vertices and a non-self-intersecting
/// ring. The ring is closed here if the caller left it open. Anything
/// malformed is an [`Error::InvalidGeometry`] — rejected before any query
/// is issued, no geometry change emitted.
pub fn from_ring(coords: impl IntoIterator<Item = Coord<f64>>) -> Result<Geometry> {
    let mut ring: Vec<Coord<f64>> = coords.into_iter().collect();
    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "ring needs at least 3 distinct vertices, got {}",
            ring.len()
        )));
    }

    let first = ring[0];
    let mut closed = ring;
    closed.push(first);
    let exterior = LineString::new(closed);

    reject_self_intersection(&exterior)?;

    Ok(Geometry::new_unchecked(Polygon::new(exterior, vec![])))
}

/// Pairwise segment test over the closed ring. Adjacent segments share a
/// vertex and are skipped; the closing segment is adjacent to the first.
fn reject_self_intersection(exterior: &LineString<f64>) -> Result<()> {
    let segments: Vec<Line<f64>> = exterior.lines().collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return Err(Error::InvalidGeometry(
                    "self-intersecting ring".to_string(),
                ));
            }
        }
    }
    Ok(())
}
