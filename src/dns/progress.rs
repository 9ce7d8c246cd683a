//! Run progress counter.

use crate::dns::types::ProgressSnapshot;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free completed/total counter shared by every worker of a run.
///
/// `total` is fixed at construction and `completed` never exceeds it.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressTracker {
    /// Create a tracker for a run of `total` probes.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Count one settled probe and return the updated snapshot.
    ///
    /// Calls past `total` leave the counter unchanged.
    pub fn advance(&self) -> ProgressSnapshot {
        let total = self.total;
        let completed = match self
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c < total).then_some(c + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => {
                tracing::warn!(completed = current, total, "progress advanced past total");
                current
            }
        };
        ProgressSnapshot { completed, total }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_advance_stops_at_total() {
        let tracker = ProgressTracker::new(2);
        assert_eq!(tracker.advance().completed, 1);
        assert!(tracker.advance().is_complete());
        assert_eq!(tracker.advance().completed, 2);
        assert_eq!(tracker.snapshot().completed, 2);
    }

    #[test]
    fn test_concurrent_advance_reaches_total_once() {
        let tracker = Arc::new(ProgressTracker::new(1000));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| tracker.advance())
                        .filter(ProgressSnapshot::is_complete)
                        .count()
                })
            })
            .collect();

        let completions: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(completions, 1);
        assert_eq!(tracker.snapshot().completed, 1000);
    }

    #[test]
    fn test_empty_run() {
        let tracker = ProgressTracker::new(0);
        assert!(tracker.snapshot().is_complete());
        assert_eq!(tracker.advance().completed, 0);
    }
}
