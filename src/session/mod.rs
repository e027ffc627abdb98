//! Interactive edit session state machine.
//!
//! The active edit target is an explicit state value, not ambient state: a
//! tagged union with a pure transition function
//! `reduce(state, event) -> (state', effects)`. The reducer owns the live
//! geometry of whatever is being edited and decides *what* must happen;
//! the [`crate::Session`] driver executes the effects (queries, check-ins,
//! graphic bookkeeping). Nothing here touches I/O, which is what makes
//! every transition testable without a rendering surface.

use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::geom;
use crate::model::{BufferSpec, Geometry, SavedQueryId};

/// What is currently being edited. At most one non-`None` variant exists,
/// and at most one drag may be active on it — this is the system's only
/// lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditTarget {
    None,
    /// Ad-hoc circular buffer. The spec is the source of truth for
    /// regeneration; the geometry is the live (possibly dragged) ring.
    Buffer { spec: BufferSpec, geometry: Geometry },
    /// Ad-hoc freehand polygon.
    Drawn(Geometry),
    /// A saved query lent out by the saved set for comparison editing.
    CheckedOutSaved { id: SavedQueryId, geometry: Geometry },
}

impl EditTarget {
    pub fn is_none(&self) -> bool {
        matches!(self, EditTarget::None)
    }

    /// Live geometry of the target, if any.
    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            EditTarget::None => None,
            EditTarget::Buffer { geometry, .. } => Some(geometry),
            EditTarget::Drawn(geometry) => Some(geometry),
            EditTarget::CheckedOutSaved { geometry, .. } => Some(geometry),
        }
    }

    /// True for the ad-hoc (buffer or drawn) region kinds.
    pub fn is_ad_hoc(&self) -> bool {
        matches!(self, EditTarget::Buffer { .. } | EditTarget::Drawn(_))
    }
}

/// Discrete inputs from the gesture collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Click on the map surface with no drag in progress.
    SurfaceClicked(Point<f64>),
    /// Radius slider moved (kilometers).
    RadiusChanged(f64),
    /// A freehand draw finished with an already-validated boundary.
    DrawCompleted(Geometry),
    /// A saved query was selected for comparison editing; the driver has
    /// checked it out and hands the snapshot over.
    SavedSelected { id: SavedQueryId, geometry: Geometry },
    /// Drag begins on the current target.
    EditStart,
    /// Drag in progress moved the target's geometry.
    GeometryChanged(Geometry),
    /// Drag finished (`committed`) or was cancelled.
    EditEnd { committed: bool },
}

/// What the driver must do after a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Re-run the population aggregate for the target's current geometry.
    IssueQuery(Geometry),
    /// Return a checked-out saved query with its edited geometry.
    CheckIn { id: SavedQueryId, geometry: Geometry },
    /// Remove the ad-hoc region graphic.
    DiscardAdHoc,
}

/// The session's explicit state value.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    target: EditTarget,
    /// Pre-drag image of the target, kept for cancel.
    drag: Option<EditTarget>,
    /// Radius the next buffer placement will use; survives across regions
    /// so a re-placed buffer keeps the chosen radius.
    last_radius_km: f64,
}

impl EditState {
    pub fn new(default_radius_km: f64) -> Self {
        Self { target: EditTarget::None, drag: None, last_radius_km: default_radius_km }
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn last_radius_km(&self) -> f64 {
        self.last_radius_km
    }

    /// Pure transition function. Illegal events are total-function no-ops:
    /// unchanged state, no effects. The driver logs them.
    pub fn reduce(self, event: SessionEvent) -> (EditState, Vec<Effect>) {
        match event {
            SessionEvent::SurfaceClicked(point) => self.on_click(point),
            SessionEvent::RadiusChanged(km) => self.on_radius(km),
            SessionEvent::DrawCompleted(geometry) => self.on_draw(geometry),
            SessionEvent::SavedSelected { id, geometry } => self.on_saved_selected(id, geometry),
            SessionEvent::EditStart => self.on_edit_start(),
            SessionEvent::GeometryChanged(geometry) => self.on_geometry_changed(geometry),
            SessionEvent::EditEnd { committed } => self.on_edit_end(committed),
        }
    }

    /// Force the current edit to completion: an active drag commits, a
    /// checked-out query goes back to the saved set. Ad-hoc targets survive
    /// (the caller decides whether to discard them).
    fn force_complete(mut self, effects: &mut Vec<Effect>) -> EditState {
        self.drag = None;
        if matches!(self.target, EditTarget::CheckedOutSaved { .. }) {
            if let EditTarget::CheckedOutSaved { id, geometry } =
                std::mem::replace(&mut self.target, EditTarget::None)
            {
                effects.push(Effect::CheckIn { id, geometry });
            }
        }
        self
    }

    fn on_click(self, point: Point<f64>) -> (EditState, Vec<Effect>) {
        // a click mid-drag would fight the drag tool; ignore it
        if self.is_dragging() {
            return (self, Vec::new());
        }
        let mut effects = Vec::new();
        let mut state = self.force_complete(&mut effects);
        effects.push(Effect::DiscardAdHoc);

        let spec = BufferSpec::new(point, state.last_radius_km);
        let geometry = geom::buffer(&spec);
        effects.push(Effect::IssueQuery(geometry.clone()));
        state.target = EditTarget::Buffer { spec, geometry };
        (state, effects)
    }

    fn on_radius(mut self, km: f64) -> (EditState, Vec<Effect>) {
        if !km.is_finite() || km <= 0.0 {
            return (self, Vec::new());
        }
        self.last_radius_km = km;
        if let EditTarget::Buffer { spec, geometry } = &mut self.target {
            *spec = spec.with_radius(km);
            *geometry = geom::buffer(spec);
            let effect = Effect::IssueQuery(geometry.clone());
            return (self, vec![effect]);
        }
        (self, Vec::new())
    }

    fn on_draw(self, geometry: Geometry) -> (EditState, Vec<Effect>) {
        if self.is_dragging() {
            return (self, Vec::new());
        }
        let mut effects = Vec::new();
        let mut state = self.force_complete(&mut effects);
        // only one ad-hoc region may exist: a finished draw replaces any
        // buffer outright
        effects.push(Effect::DiscardAdHoc);
        effects.push(Effect::IssueQuery(geometry.clone()));
        state.target = EditTarget::Drawn(geometry);
        (state, effects)
    }

    fn on_saved_selected(self, id: SavedQueryId, geometry: Geometry) -> (EditState, Vec<Effect>) {
        let mut effects = Vec::new();
        let mut state = self.force_complete(&mut effects);
        effects.push(Effect::DiscardAdHoc);
        effects.push(Effect::IssueQuery(geometry.clone()));
        state.target = EditTarget::CheckedOutSaved { id, geometry };
        (state, effects)
    }

    fn on_edit_start(mut self) -> (EditState, Vec<Effect>) {
        if self.target.is_none() || self.is_dragging() {
            return (self, Vec::new());
        }
        self.drag = Some(self.target.clone());
        (self, Vec::new())
    }

    fn on_geometry_changed(mut self, geometry: Geometry) -> (EditState, Vec<Effect>) {
        if !self.is_dragging() {
            return (self, Vec::new());
        }
        match &mut self.target {
            EditTarget::Buffer { spec, geometry: live } => {
                // the dragged ring is authoritative; the spec follows its
                // centroid so regeneration lands where the user left it
                if let Some(center) = geometry.centroid() {
                    *spec = spec.recentered(center);
                }
                *live = geometry.clone();
            }
            EditTarget::Drawn(live) => *live = geometry.clone(),
            EditTarget::CheckedOutSaved { geometry: live, .. } => *live = geometry.clone(),
            EditTarget::None => return (self, Vec::new()),
        }
        let effect = Effect::IssueQuery(geometry);
        (self, vec![effect])
    }

    fn on_edit_end(mut self, committed: bool) -> (EditState, Vec<Effect>) {
        let Some(pre_drag) = self.drag.take() else {
            return (self, Vec::new());
        };

        if committed {
            // buffer keeps its updated spec and stays; drawn polygon stays;
            // a checked-out query goes back to the saved set
            let mut effects = Vec::new();
            if matches!(self.target, EditTarget::CheckedOutSaved { .. }) {
                if let EditTarget::CheckedOutSaved { id, geometry } =
                    std::mem::replace(&mut self.target, EditTarget::None)
                {
                    effects.push(Effect::CheckIn { id, geometry });
                    effects.push(Effect::DiscardAdHoc);
                }
            }
            return (self, effects);
        }

        // cancelled: everything reverts to the pre-drag image and the
        // display resyncs to it
        let effects = pre_drag
            .geometry()
            .map(|g| vec![Effect::IssueQuery(g.clone())])
            .unwrap_or_default();
        self.target = pre_drag;
        (self, effects)
    }
}

/// Convenience for hosts and tests: a drawn ring from raw coordinates,
/// validated the same way a live draw is.
pub fn drawn_ring(coords: impl IntoIterator<Item = Coord<f64>>) -> crate::Result<Geometry> {
    geom::from_ring(coords)
}

// ============================================================================
// Tests — pure transitions, no driver, no rendering surface
// ============================================================================
