//! End-to-end tests for query coordination: single-flight cancellation,
//! result ordering, and the client-fast / server-fallback strategy.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geo::Point;
use parking_lot::Mutex;

use popscope::geom;
use popscope::model::{AggregateRequest, AggregateResponse};
use popscope::source::{AggregateSource, GridCell, GridIndex};
use popscope::token::QueryToken;
use popscope::{Error, QueryCoordinator, Result};

// ============================================================================
// Test sources
// ============================================================================

/// Wraps a grid index and sleeps for a scripted duration before each
/// aggregate, so tests can overlap in-flight queries deterministically.
struct DelayedGrid {
    index: GridIndex,
    delays_ms: Mutex<VecDeque<u64>>,
}

impl DelayedGrid {
    fn new(index: GridIndex, delays_ms: impl IntoIterator<Item = u64>) -> Self {
        Self { index, delays_ms: Mutex::new(delays_ms.into_iter().collect()) }
    }
}

#[async_trait]
impl AggregateSource for DelayedGrid {
    fn name(&self) -> &str {
        "delayed-grid"
    }

    async fn aggregate(
        &self,
        request: &AggregateRequest,
        token: &QueryToken,
    ) -> Result<AggregateResponse> {
        let delay = self.delays_ms.lock().pop_front().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.index.aggregate(request, token).await
    }
}

/// Always answers with the same total, ignoring the geometry.
struct FixedSource(f64);

#[async_trait]
impl AggregateSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn aggregate(
        &self,
        _request: &AggregateRequest,
        _token: &QueryToken,
    ) -> Result<AggregateResponse> {
        Ok(AggregateResponse::of(self.0))
    }
}

/// Always fails with a transport error.
struct FailingSource;

#[async_trait]
impl AggregateSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn aggregate(
        &self,
        _request: &AggregateRequest,
        _token: &QueryToken,
    ) -> Result<AggregateResponse> {
        Err(Error::Transport("connection reset".into()))
    }
}

fn populated_index(center: Point<f64>, population: f64) -> GridIndex {
    let index = GridIndex::new();
    index.insert(GridCell::square(center, 250.0, population));
    index
}

// ============================================================================
// 1. Ordering: only the last-issued query's result survives
// ============================================================================

#[tokio::test]
async fn test_last_issued_query_wins_even_if_earlier_resolves_later() {
    let a = Point::new(174.70, -36.85);
    let b = Point::new(174.90, -36.85);
    let index = GridIndex::new();
    index.insert(GridCell::square(a, 250.0, 100.0));
    index.insert(GridCell::square(b, 250.0, 250.0));

    // first query stalls 40 ms, second answers immediately
    let source = Arc::new(DelayedGrid::new(index, [40, 0]));
    let coordinator = QueryCoordinator::new(source, "PopEst2023", "totalPop");

    let buf_a = geom::geodesic_buffer(a, 1.0);
    let buf_b = geom::geodesic_buffer(b, 1.0);
    let q1 = coordinator.query(&buf_a);
    let q2 = coordinator.query(&buf_b);
    let (r1, r2) = tokio::join!(q1, q2);

    // the earlier query was superseded while asleep
    assert!(matches!(r1, Ok(None)));
    let result = r2.unwrap().expect("latest query must deliver");
    assert_eq!(result.value, 250.0);
    assert_eq!(result.version, coordinator.current_version());
}

#[tokio::test]
async fn test_sequential_queries_each_deliver() {
    let p = Point::new(174.70, -36.85);
    let source = Arc::new(populated_index(p, 300.0));
    let coordinator = QueryCoordinator::new(source, "PopEst2023", "totalPop");

    let first = coordinator.query(&geom::geodesic_buffer(p, 1.0)).await.unwrap();
    let second = coordinator.query(&geom::geodesic_buffer(p, 2.0)).await.unwrap();
    assert_eq!(first.unwrap().value, 300.0);
    assert_eq!(second.unwrap().value, 300.0);
    assert!(second.unwrap().version > first.unwrap().version);
}

// ============================================================================
// 2. Fast path: a nonzero client-side sum is authoritative
// ============================================================================

#[tokio::test]
async fn test_fast_nonzero_skips_server() {
    let p = Point::new(174.70, -36.85);
    let coordinator = QueryCoordinator::new(
        Arc::new(FixedSource(9999.0)),
        "PopEst2023",
        "totalPop",
    )
    .with_fast(Arc::new(populated_index(p, 77.0)));

    let result = coordinator
        .query(&geom::geodesic_buffer(p, 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, 77.0, "client-side sum should be authoritative");
}

// ============================================================================
// 3. Zero fallback: a client-side zero re-asks the full dataset
// ============================================================================

#[tokio::test]
async fn test_fast_zero_falls_back_to_server() {
    // empty index is ready but knows nothing about this extent
    let coordinator = QueryCoordinator::new(
        Arc::new(FixedSource(4321.0)),
        "PopEst2023",
        "totalPop",
    )
    .with_fast(Arc::new(GridIndex::new()));

    let result = coordinator
        .query(&geom::geodesic_buffer(Point::new(174.7, -36.8), 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, 4321.0, "zero must be double-checked server-side");
}

#[tokio::test]
async fn test_zero_from_both_paths_displays_zero() {
    let coordinator = QueryCoordinator::new(
        Arc::new(FixedSource(0.0)),
        "PopEst2023",
        "totalPop",
    )
    .with_fast(Arc::new(GridIndex::new()));

    let result = coordinator
        .query(&geom::geodesic_buffer(Point::new(170.0, -44.0), 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, 0.0);
}

// ============================================================================
// 4. Readiness: a mid-refresh index is not consulted
// ============================================================================

#[tokio::test]
async fn test_refreshing_fast_source_is_skipped() {
    let p = Point::new(174.70, -36.85);
    let fast = populated_index(p, 100.0);
    fast.begin_refresh();

    let coordinator = QueryCoordinator::new(
        Arc::new(FixedSource(555.0)),
        "PopEst2023",
        "totalPop",
    )
    .with_fast(Arc::new(fast.clone()));

    let mid_refresh = coordinator
        .query(&geom::geodesic_buffer(p, 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mid_refresh.value, 555.0);

    fast.finish_refresh();
    let after = coordinator
        .query(&geom::geodesic_buffer(p, 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.value, 100.0);
}

// ============================================================================
// 5. Failures: fast failure falls back, server failure surfaces
// ============================================================================

#[tokio::test]
async fn test_fast_failure_falls_back_to_server() {
    let coordinator = QueryCoordinator::new(
        Arc::new(FixedSource(42.0)),
        "PopEst2023",
        "totalPop",
    )
    .with_fast(Arc::new(FailingSource));

    let result = coordinator
        .query(&geom::geodesic_buffer(Point::new(174.7, -36.8), 1.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.value, 42.0);
}

#[tokio::test]
async fn test_server_failure_is_a_transport_error() {
    let coordinator =
        QueryCoordinator::new(Arc::new(FailingSource), "PopEst2023", "totalPop");

    let err = coordinator
        .query(&geom::geodesic_buffer(Point::new(174.7, -36.8), 1.0))
        .await;
    assert!(matches!(err, Err(Error::Transport(_))));
}
