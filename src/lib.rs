//! # popscope — Interactive Population Query Engine
//!
//! Define a geographic region — a geodesic buffer around a point or a
//! freehand polygon — drag it around, and watch a live population aggregate
//! for whatever it currently covers. Keep up to five regions as saved
//! queries for side-by-side comparison, each independently re-editable.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `AggregateSource` is the contract between the query
//!    coordinator and any dataset
//! 2. **Clean DTOs**: `Geometry`, `Graphic`, `SavedQuery` cross all boundaries
//! 3. **The reducer owns nothing**: gesture event → new state + effects is a
//!    pure function; the `Session` driver executes the effects
//! 4. **Cancellation is a token, not an abort**: a monotonic sequence number
//!    checked at completion time, decoupled from any transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geo::Point;
//! use popscope::source::GridIndex;
//! use popscope::{DisplayReading, DisplaySink, QueryCoordinator, Session, SessionConfig};
//!
//! struct Readout;
//! impl DisplaySink for Readout {
//!     fn show(&mut self, reading: DisplayReading) {
//!         println!("{} {}", reading.population, reading.percent_of_reference);
//!     }
//! }
//!
//! # async fn example() -> popscope::Result<()> {
//! let index = GridIndex::new();
//! let coordinator = QueryCoordinator::new(Arc::new(index.clone()), "PopEst2023", "totalPop")
//!     .with_fast(Arc::new(index));
//! let mut session = Session::new(SessionConfig::default(), coordinator, Readout);
//!
//! // Click places a default-radius buffer and queries its population
//! session.click(Point::new(174.7633, -36.8485)).await?;
//!
//! // Keep it for comparison
//! let id = session.save_current()?;
//! session.relabel_saved(id, "City centre");
//! # Ok(())
//! # }
//! ```
//!
//! ## Aggregate Sources
//!
//! | Source | Feature | Description |
//! |--------|---------|-------------|
//! | GridIndex | (default) | In-memory client-side index — fast path and test double |
//! | FeatureServiceSource | `rest` | Remote FeatureServer statistics endpoint |

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod display;
pub mod geom;
pub mod highlight;
pub mod model;
pub mod query;
pub mod saved;
pub mod session;
pub mod source;
pub mod token;

use geo::{Coord, Point};
use tracing::{debug, warn};

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{HighlightConfig, SessionConfig, MAX_SAVED_QUERIES};
pub use display::{DisplayReading, DisplaySink};
pub use highlight::{HighlightAnimator, HighlightBaseline};
pub use model::{
    BufferSpec, Geometry, GeometryVersion, Graphic, GraphicId, PopulationResult, Rgba,
    SavedMethod, SavedQuery, SavedQueryId, SavedQuerySummary, Symbol,
};
pub use query::QueryCoordinator;
pub use saved::SavedQuerySet;
pub use session::{drawn_ring, EditState, EditTarget, Effect, SessionEvent};
pub use token::{QueryToken, TokenCounter};

use session::SessionEvent as Event;

// ============================================================================
// Top-level Session driver
// ============================================================================

/// The primary entry point. Wires the edit-state reducer, the query
/// coordinator, the saved set, and the highlight animator together, and
/// executes the effects each transition produces.
///
/// All saved-set mutations happen synchronously inside the gesture
/// handlers; the only suspension point is the population query itself, so
/// the session never races against its own state.
pub struct Session<D: DisplaySink> {
    config: SessionConfig,
    state: EditState,
    coordinator: QueryCoordinator,
    saved: SavedQuerySet,
    animator: HighlightAnimator,
    sink: D,
    /// Graphic of the live edit target (ad-hoc region or checked-out
    /// query), if one exists.
    ad_hoc: Option<Graphic>,
    /// Last result that passed the token check. Transport failures leave
    /// it untouched — worst case is a stale number until the next success.
    displayed: Option<PopulationResult>,
    next_graphic_id: u64,
}

impl<D: DisplaySink> Session<D> {
    pub fn new(config: SessionConfig, coordinator: QueryCoordinator, sink: D) -> Self {
        Self {
            state: EditState::new(config.default_radius_km),
            saved: SavedQuerySet::new(config.palette.clone()),
            animator: HighlightAnimator::new(&config.highlight),
            config,
            coordinator,
            sink,
            ad_hoc: None,
            displayed: None,
            next_graphic_id: 1,
        }
    }

    // ========================================================================
    // Gesture handlers
    // ========================================================================

    /// Map click: place (or re-place) the ad-hoc buffer at the clicked
    /// point with the remembered radius.
    pub async fn click(&mut self, point: Point<f64>) -> Result<()> {
        self.dispatch(Event::SurfaceClicked(point)).await
    }

    /// Radius slider moved.
    pub async fn set_radius(&mut self, km: f64) -> Result<()> {
        self.dispatch(Event::RadiusChanged(km)).await
    }

    /// A freehand draw finished. The boundary is validated here — malformed
    /// rings are rejected before any query is issued.
    pub async fn complete_draw(
        &mut self,
        coords: impl IntoIterator<Item = Coord<f64>>,
    ) -> Result<()> {
        let geometry = geom::from_ring(coords)?;
        self.dispatch(Event::DrawCompleted(geometry)).await
    }

    /// Check a saved query out for comparison editing. Unknown or already
    /// checked-out ids are ignored.
    pub async fn select_saved(&mut self, id: SavedQueryId) -> Result<()> {
        let Some(geometry) = self.saved.check_out(id) else {
            debug!(%id, "select ignored: unknown or already checked out");
            return Ok(());
        };
        self.dispatch(Event::SavedSelected { id, geometry }).await
    }

    /// Drag begins on the current target.
    pub async fn begin_drag(&mut self) -> Result<()> {
        self.dispatch(Event::EditStart).await
    }

    /// Drag moved the target. Every call re-queries, so the display is
    /// live throughout the drag.
    pub async fn drag_to(&mut self, geometry: Geometry) -> Result<()> {
        self.dispatch(Event::GeometryChanged(geometry)).await
    }

    /// Drag finished or was cancelled.
    pub async fn end_drag(&mut self, committed: bool) -> Result<()> {
        self.dispatch(Event::EditEnd { committed }).await
    }

    // ========================================================================
    // Saved-set operations (synchronous, gesture-handler scope)
    // ========================================================================

    /// Persist the current ad-hoc region with the last displayed
    /// population. Fails with [`Error::CapacityExceeded`] at five entries
    /// and [`Error::NothingToSave`] when no ad-hoc region exists.
    pub fn save_current(&mut self) -> Result<SavedQueryId> {
        let (geometry, method) = match self.state.target() {
            EditTarget::Buffer { spec, geometry } => (
                geometry.clone(),
                SavedMethod::Buffer { radius_km: spec.radius_km },
            ),
            EditTarget::Drawn(geometry) => (geometry.clone(), SavedMethod::Polygon),
            _ => return Err(Error::NothingToSave),
        };
        let population = self.displayed.map_or(0.0, |r| r.value);
        let graphic_id = self.alloc_graphic_id();
        let entry = self.saved.save(&geometry, method, population, graphic_id)?;
        Ok(entry.id)
    }

    /// Remove a saved query. The entry currently checked out for editing
    /// cannot be removed; unknown ids are a no-op.
    pub fn remove_saved(&mut self, id: SavedQueryId) -> bool {
        if let EditTarget::CheckedOutSaved { id: active, .. } = self.state.target() {
            if *active == id {
                debug!(%id, "remove ignored: entry is checked out");
                return false;
            }
        }
        let Some(graphic_id) = self.saved.get(id).map(|e| e.graphic.id) else {
            return false;
        };
        let removed = self.saved.remove(id);
        if removed {
            self.animator.forget(graphic_id);
        }
        removed
    }

    /// Rename a saved query in place. Empty labels are a no-op.
    pub fn relabel_saved(&mut self, id: SavedQueryId, label: &str) -> bool {
        self.saved.relabel(id, label)
    }

    // ========================================================================
    // Highlight timer
    // ========================================================================

    /// One highlight tick: the drawn-region graphic (when a drawn polygon
    /// is the target) and every rendered saved graphic get the marching
    /// dashed outline. Call on the interval from
    /// [`HighlightConfig::tick_ms`].
    pub fn tick(&mut self) {
        let mut graphics: Vec<&mut Graphic> = Vec::new();
        if matches!(self.state.target(), EditTarget::Drawn(_)) {
            if let Some(graphic) = self.ad_hoc.as_mut() {
                graphics.push(graphic);
            }
        }
        graphics.extend(self.saved.render_graphics_mut());
        self.animator.tick(graphics);
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn saved(&self) -> &SavedQuerySet {
        &self.saved
    }

    pub fn animator(&self) -> &HighlightAnimator {
        &self.animator
    }

    /// Last result that passed the token check.
    pub fn displayed(&self) -> Option<PopulationResult> {
        self.displayed
    }

    /// Graphic of the live edit target, if any.
    pub fn ad_hoc_graphic(&self) -> Option<&Graphic> {
        self.ad_hoc.as_ref()
    }

    // ========================================================================
    // Reducer plumbing
    // ========================================================================

    async fn dispatch(&mut self, event: SessionEvent) -> Result<()> {
        let (state, effects) = self.state.clone().reduce(event);
        if effects.is_empty() && state == self.state {
            debug!("event rejected by edit state machine");
        }
        self.state = state;
        for effect in effects {
            self.run_effect(effect).await;
        }
        self.sync_ad_hoc_graphic();
        Ok(())
    }

    async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::IssueQuery(geometry) => match self.coordinator.query(&geometry).await {
                Ok(Some(result)) => {
                    self.displayed = Some(result);
                    self.sink.show(display::reading(
                        result.value,
                        self.config.reference_population,
                    ));
                }
                Ok(None) => {} // superseded mid-flight, silently discarded
                Err(e) => {
                    warn!(error = %e, "population query failed; keeping previous value");
                }
            },
            Effect::CheckIn { id, geometry } => {
                self.saved.check_in(id, &geometry);
                if let Some(result) = self.displayed {
                    self.saved.set_population(id, result.value);
                }
            }
            Effect::DiscardAdHoc => {
                if let Some(graphic) = self.ad_hoc.take() {
                    self.animator.forget(graphic.id);
                }
            }
        }
    }

    /// Project the edit target into its on-surface graphic.
    fn sync_ad_hoc_graphic(&mut self) {
        let geometry = self.state.target().geometry().cloned();
        match geometry {
            Some(geometry) => {
                if let Some(graphic) = self.ad_hoc.as_mut() {
                    graphic.geometry = geometry;
                } else {
                    let id = self.alloc_graphic_id();
                    self.ad_hoc = Some(Graphic::new(id, geometry, Symbol::editable()));
                }
            }
            None => {
                if let Some(graphic) = self.ad_hoc.take() {
                    self.animator.forget(graphic.id);
                }
            }
        }
    }

    fn alloc_graphic_id(&mut self) -> GraphicId {
        let id = GraphicId(self.next_graphic_id);
        self.next_graphic_id += 1;
        id
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("saved query capacity reached ({limit})")]
    CapacityExceeded { limit: usize },

    /// A request noticed it was superseded. Absorbed by the coordinator,
    /// never an observable failure.
    #[error("query superseded")]
    Cancelled,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("no ad-hoc region to save")]
    NothingToSave,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
