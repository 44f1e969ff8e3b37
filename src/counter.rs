//! Session liveness counters (spec §6 statistics, SPEC_FULL ambient
//! observability).
//!
//! Grounded on the teacher's habit of injecting a shared atomic counter
//! into long-lived components rather than polling collection sizes: a
//! `SessionCounter` tracks concurrently-live sessions plus a
//! monotonically-increasing cumulative count, both lock-free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared session-liveness counter, handed to every session on creation.
#[derive(Debug, Default)]
pub struct SessionCounter {
    live: AtomicU64,
    cumulative: AtomicU64,
}

impl SessionCounter {
    /// A fresh counter at zero.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a new session starting; returns its 1-based cumulative
    /// ordinal.
    pub fn session_started(&self) -> u64 {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.cumulative.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a session ending.
    pub fn session_ended(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current number of live sessions.
    pub fn live(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    /// Total sessions ever started.
    pub fn cumulative(&self) -> u64 {
        self.cumulative.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_and_ended_track_live_and_cumulative_separately() {
        let counter = SessionCounter::new();
        counter.session_started();
        counter.session_started();
        assert_eq!(counter.live(), 2);
        assert_eq!(counter.cumulative(), 2);
        counter.session_ended();
        assert_eq!(counter.live(), 1);
        assert_eq!(counter.cumulative(), 2);
    }
}
