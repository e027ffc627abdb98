//! Aggregate query wire DTOs and the population result.

use serde::{Deserialize, Serialize};

use super::{Geometry, GeometryVersion};

/// Spatial predicate of an aggregate request. Only intersection is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpatialRel {
    Intersects,
}

/// Aggregation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOp {
    Sum,
}

/// A statistic definition: `op` over `field`, reported under `alias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub op: AggregateOp,
    pub field: String,
    pub alias: String,
}

impl Aggregation {
    pub fn sum(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { op: AggregateOp::Sum, field: field.into(), alias: alias.into() }
    }
}

/// A population aggregate request, shaped like the upstream service expects:
/// geometry, spatial relationship, one out-statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub geometry: Geometry,
    pub spatial_relationship: SpatialRel,
    pub aggregation: Aggregation,
}

impl AggregateRequest {
    /// The one request shape this system issues: sum of `field` over all
    /// records intersecting `geometry`.
    pub fn sum_intersecting(geometry: Geometry, field: &str, alias: &str) -> Self {
        Self {
            geometry,
            spatial_relationship: SpatialRel::Intersects,
            aggregation: Aggregation::sum(field, alias),
        }
    }
}

/// One statistics record. The upstream service returns the aggregate under
/// the alias `totalPop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(rename = "totalPop")]
    pub total_pop: f64,
}

/// Aggregate response: zero or one statistics record. No records means no
/// intersecting features — population 0, not an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub records: Vec<StatRecord>,
}

impl AggregateResponse {
    pub fn of(total_pop: f64) -> Self {
        Self { records: vec![StatRecord { total_pop }] }
    }

    pub fn empty() -> Self {
        Self { records: Vec::new() }
    }

    /// The aggregate value; absence of records reads as 0.
    pub fn population(&self) -> f64 {
        self.records.first().map_or(0.0, |r| r.total_pop)
    }
}

/// A delivered population aggregate, tagged with the geometry version it
/// was computed for. Only valid for display while the version is current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationResult {
    pub value: f64,
    pub version: GeometryVersion,
}
