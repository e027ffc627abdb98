//! Query coordination.
//!
//! Owns the single-flight cancellation token and the client-fast /
//! server-fallback strategy. The coordinator keeps no other state: for a
//! rapid sequence of geometry edits producing queries Q1…Qn, only the
//! result of the latest issued, non-superseded query ever comes back as
//! `Some` — ordering is enforced by the token check at completion time,
//! not by serializing requests.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{AggregateRequest, Geometry, GeometryVersion, PopulationResult};
use crate::source::AggregateSource;
use crate::token::{QueryToken, TokenCounter};
use crate::{Error, Result};

/// Issues population aggregate queries with a fast client-side path and an
/// authoritative server-side fallback.
pub struct QueryCoordinator {
    fast: Option<Arc<dyn AggregateSource>>,
    authoritative: Arc<dyn AggregateSource>,
    field: String,
    alias: String,
    tokens: TokenCounter,
}

impl QueryCoordinator {
    pub fn new(
        authoritative: Arc<dyn AggregateSource>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            fast: None,
            authoritative,
            field: field.into(),
            alias: alias.into(),
            tokens: TokenCounter::new(),
        }
    }

    /// Attach a fast client-side source, tried before the authoritative one.
    pub fn with_fast(mut self, fast: Arc<dyn AggregateSource>) -> Self {
        self.fast = Some(fast);
        self
    }

    /// Version a result must carry to be current right now.
    pub fn current_version(&self) -> GeometryVersion {
        GeometryVersion(self.tokens.current_seq())
    }

    /// Run a population aggregate for `geometry`.
    ///
    /// `Ok(None)` means the query was superseded by a newer one while in
    /// flight — not an error, the result is simply never displayed.
    /// `Err(Transport)` is a genuine failure; the caller keeps whatever it
    /// was displaying.
    pub async fn query(&self, geometry: &Geometry) -> Result<Option<PopulationResult>> {
        let token = self.tokens.issue();
        debug!(seq = token.seq(), "population query issued");

        let request =
            AggregateRequest::sum_intersecting(geometry.clone(), &self.field, &self.alias);

        let value = match self.try_fast(&request, &token).await {
            Some(value) => value,
            None => match self.authoritative.aggregate(&request, &token).await {
                Ok(response) => response.population(),
                Err(Error::Cancelled) => {
                    debug!(seq = token.seq(), "query cancelled in flight");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            },
        };

        if !token.is_current() {
            debug!(seq = token.seq(), "query superseded, discarding result");
            return Ok(None);
        }

        Ok(Some(PopulationResult { value, version: token.version() }))
    }

    /// Client-side attempt. `Some(value)` is authoritative; `None` falls
    /// through to the server.
    ///
    /// A zero from the fast path is deliberately NOT authoritative: the
    /// index cannot tell a truly empty region from an extent it has not
    /// loaded yet, so zero always re-asks the full dataset.
    async fn try_fast(&self, request: &AggregateRequest, token: &QueryToken) -> Option<f64> {
        let fast = self.fast.as_ref()?;
        if !fast.is_ready() {
            debug!(source = fast.name(), "fast source mid-refresh, falling back");
            return None;
        }
        match fast.aggregate(request, token).await {
            Ok(response) => {
                let value = response.population();
                if value > 0.0 {
                    Some(value)
                } else {
                    debug!(source = fast.name(), "fast source returned zero, falling back");
                    None
                }
            }
            Err(Error::Cancelled) => {
                debug!(source = fast.name(), "fast source cancelled, falling back");
                None
            }
            Err(e) => {
                warn!(source = fast.name(), error = %e, "fast source failed, falling back");
                None
            }
        }
    }
}
