//! Cooperative query cancellation.
//!
//! Cancellation is a monotonically increasing sequence number, not a
//! transport abort: issuing a new token invalidates every earlier one, and
//! each completion checks its own token before its result may be applied.
//! Sources may also poll the token mid-flight to bail out early, but they
//! are never preempted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::GeometryVersion;

/// Issues query tokens. One counter per coordinator.
#[derive(Debug, Default)]
pub struct TokenCounter {
    latest: Arc<AtomicU64>,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token. Every previously issued token stops being
    /// current the moment this returns.
    pub fn issue(&self) -> QueryToken {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        QueryToken { seq, latest: Arc::clone(&self.latest) }
    }

    pub fn current_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// The token carried by one in-flight aggregate request.
#[derive(Debug, Clone)]
pub struct QueryToken {
    seq: u64,
    latest: Arc<AtomicU64>,
}

impl QueryToken {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// True while no newer token has been issued.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.seq
    }

    /// The geometry version a result computed under this token belongs to.
    pub fn version(&self) -> GeometryVersion {
        GeometryVersion(self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_supersedes_old() {
        let counter = TokenCounter::new();
        let first = counter.issue();
        assert!(first.is_current());

        let second = counter.issue();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.seq() > first.seq());
    }

    #[test]
    fn test_version_tracks_seq() {
        let counter = TokenCounter::new();
        let token = counter.issue();
        assert_eq!(token.version().0, token.seq());
    }
}
