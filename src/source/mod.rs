//! # Aggregate Source Trait
//!
//! This is THE contract between the query coordinator and any dataset that
//! can answer a population aggregate.
//!
//! ## Implementations
//!
//! | Source | Module | Description |
//! |--------|--------|-------------|
//! | `GridIndex` | `grid` | In-memory client-side index (fast path, test double) |
//! | `FeatureServiceSource` | `rest` (feature `rest`) | Remote FeatureServer over HTTP |

pub mod grid;
#[cfg(feature = "rest")]
pub mod rest;

use async_trait::async_trait;

use crate::model::{AggregateRequest, AggregateResponse};
use crate::token::QueryToken;
use crate::Result;

pub use grid::{CellId, GridCell, GridIndex};
#[cfg(feature = "rest")]
pub use rest::FeatureServiceSource;

/// A dataset that can sum a numeric attribute over every record whose
/// geometry intersects a query geometry.
///
/// Sources are cancellation-aware but cooperative: they may check the token
/// and return [`crate::Error::Cancelled`] early, and the coordinator always
/// re-checks the token before a result is applied, so a source that ignores
/// the token is merely wasteful, never incorrect.
#[async_trait]
pub trait AggregateSource: Send + Sync + 'static {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// False while the source cannot answer authoritatively (for example
    /// an index mid-refresh). The coordinator skips a not-ready fast source
    /// and goes straight to the fallback.
    fn is_ready(&self) -> bool {
        true
    }

    /// Run the aggregate. Empty record set means population 0.
    async fn aggregate(
        &self,
        request: &AggregateRequest,
        token: &QueryToken,
    ) -> Result<AggregateResponse>;
}
