//! # Core Data Model
//!
//! Clean DTOs that cross every boundary: geometry construction ↔ query
//! coordination ↔ session ↔ saved set ↔ display.
//!
//! Design rule: NO transport types, NO rendering-surface types here.
//! This module is pure data — no I/O, no state, no async.

pub mod buffer;
pub mod geometry;
pub mod graphic;
pub mod result;
pub mod saved;

pub use buffer::BufferSpec;
pub use geometry::{Geometry, GeometryVersion, SpatialRef};
pub use graphic::{DashPattern, DashStyle, Graphic, GraphicId, Rgba, Symbol};
pub use result::{
    AggregateOp, AggregateRequest, AggregateResponse, Aggregation, PopulationResult,
    SpatialRel, StatRecord,
};
pub use saved::{SavedMethod, SavedQuery, SavedQueryId, SavedQuerySummary};
