//! In-memory grid index source.
//!
//! This is the reference implementation of `AggregateSource`: population
//! grid cells held in a hash map behind an `RwLock`, summed by a linear
//! intersection scan.
//!
//! ## Role
//!
//! - The fast client-side path of the coordinator's fallback strategy. The
//!   `refreshing` flag models an index that is mid-refresh and must not be
//!   treated as authoritative.
//! - The test double for everything above the source boundary.
//!
//! ## Limitations
//!
//! - No spatial partitioning: every aggregate scans all cells. Fine for the
//!   cell counts a client view holds at once.
//! - Cells present in the index are assumed fully loaded; an index holding
//!   a partial extent can legitimately report zero for a nonempty region,
//!   which is exactly the ambiguity the coordinator's zero-fallback covers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use geo::{Coord, HaversineDestination, LineString, Point, Polygon};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::{AggregateRequest, AggregateResponse};
use crate::token::QueryToken;
use crate::{Error, Result};
use super::AggregateSource;

/// Opaque grid cell identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u64);

/// One dataset record: a cell boundary and its population estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub geometry: Polygon<f64>,
    pub population: f64,
}

impl GridCell {
    pub fn new(geometry: Polygon<f64>, population: f64) -> Self {
        Self { geometry, population }
    }

    /// An axis-aligned square cell of `size_m` meters centered on a point.
    /// Matches the shape of the 250 m population grid this system queries.
    pub fn square(center: Point<f64>, size_m: f64, population: f64) -> Self {
        let half = size_m / 2.0;
        let east = center.haversine_destination(90.0, half).x() - center.x();
        let north = center.haversine_destination(0.0, half).y() - center.y();
        let (x, y) = (center.x(), center.y());
        let ring = vec![
            Coord { x: x - east, y: y - north },
            Coord { x: x + east, y: y - north },
            Coord { x: x + east, y: y + north },
            Coord { x: x - east, y: y + north },
            Coord { x: x - east, y: y - north },
        ];
        Self { geometry: Polygon::new(LineString::new(ring), vec![]), population }
    }
}

/// In-memory population grid index.
pub struct GridIndex {
    inner: Arc<GridInner>,
}

struct GridInner {
    cells: RwLock<HashMap<CellId, GridCell>>,
    refreshing: AtomicBool,
    next_cell_id: AtomicU64,
}

impl GridIndex {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GridInner {
                cells: RwLock::new(HashMap::new()),
                refreshing: AtomicBool::new(false),
                next_cell_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn insert(&self, cell: GridCell) -> CellId {
        let id = CellId(self.inner.next_cell_id.fetch_add(1, Ordering::Relaxed));
        self.inner.cells.write().insert(id, cell);
        id
    }

    pub fn remove(&self, id: CellId) -> bool {
        self.inner.cells.write().remove(&id).is_some()
    }

    /// Swap the entire cell set, as a view-extent change would.
    pub fn replace_all(&self, cells: impl IntoIterator<Item = GridCell>) {
        let mut map = self.inner.cells.write();
        map.clear();
        for cell in cells {
            let id = CellId(self.inner.next_cell_id.fetch_add(1, Ordering::Relaxed));
            map.insert(id, cell);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cells.read().is_empty()
    }

    /// Mark the index as mid-refresh. While set, `is_ready()` is false and
    /// the coordinator will not trust this source.
    pub fn begin_refresh(&self) {
        self.inner.refreshing.store(true, Ordering::SeqCst);
    }

    pub fn finish_refresh(&self) {
        self.inner.refreshing.store(false, Ordering::SeqCst);
    }
}

impl Default for GridIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GridIndex {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[async_trait]
impl AggregateSource for GridIndex {
    fn name(&self) -> &str {
        "grid-index"
    }

    fn is_ready(&self) -> bool {
        !self.inner.refreshing.load(Ordering::SeqCst)
    }

    async fn aggregate(
        &self,
        request: &AggregateRequest,
        token: &QueryToken,
    ) -> Result<AggregateResponse> {
        if !token.is_current() {
            return Err(Error::Cancelled);
        }

        let cells = self.inner.cells.read();
        let sum: f64 = cells
            .values()
            .filter(|cell| request.geometry.intersects_polygon(&cell.geometry))
            .map(|cell| cell.population)
            .sum();

        Ok(AggregateResponse::of(sum))
    }
}

// ============================================================================
// Tests
// ============================================================================
