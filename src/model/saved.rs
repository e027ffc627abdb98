//! Saved query entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Geometry, Graphic, Rgba};

/// Opaque saved-query identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SavedQueryId(pub u64);

impl std::fmt::Display for SavedQueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// How the saved region was defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SavedMethod {
    Buffer { radius_km: f64 },
    Polygon,
}

impl SavedMethod {
    /// Human-readable method line for the saved-query list.
    pub fn description(&self) -> String {
        match self {
            SavedMethod::Buffer { radius_km } => format!("Buffer · {radius_km:.1} km"),
            SavedMethod::Polygon => "Drawn polygon".to_string(),
        }
    }
}

/// A persisted comparison query. The geometry is an immutable snapshot —
/// it only changes through an explicit check-out/check-in cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: SavedQueryId,
    /// User-editable; defaults to `"Query N"`.
    pub label: String,
    /// Palette color assigned at insertion time, never reassigned.
    pub color: Rgba,
    pub method: SavedMethod,
    pub geometry: Geometry,
    pub population: f64,
    pub graphic: Graphic,
    /// True while the entry is lent to the edit session. A checked-out
    /// entry keeps its capacity slot but leaves the render set.
    pub checked_out: bool,
    pub created_at: DateTime<Utc>,
}

/// Row of the saved-query list projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuerySummary {
    pub id: SavedQueryId,
    pub label: String,
    pub color: Rgba,
    pub population: f64,
    pub method_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_description() {
        assert_eq!(
            SavedMethod::Buffer { radius_km: 2.0 }.description(),
            "Buffer · 2.0 km"
        );
        assert_eq!(SavedMethod::Polygon.description(), "Drawn polygon");
    }
}
