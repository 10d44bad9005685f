use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

/// Point-in-time view of a run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.processed, self.total)
    }
}

/// Called synchronously, from the task running the check, after every
/// recorded step. A panicking listener is logged and otherwise ignored.
pub type ProgressListener = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Counter of processed addresses for one run. `processed` only grows and
/// never exceeds `total`.
pub(crate) struct ProgressTracker {
    processed: AtomicUsize,
    total: usize,
    listeners: Vec<ProgressListener>,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, listeners: Vec<ProgressListener>) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            total,
            listeners,
        }
    }

    /// Adds `count` processed addresses and notifies every listener. Never
    /// panics, whatever the listeners do.
    pub(crate) fn record(&self, count: usize) -> ProgressSnapshot {
        let total = self.total;
        let previous = self
            .processed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |done| {
                Some(done.saturating_add(count).min(total))
            })
            .unwrap_or(total);
        let snapshot = ProgressSnapshot {
            processed: previous.saturating_add(count).min(total),
            total,
        };
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
                warn!(progress = %snapshot, "progress listener panicked");
            }
        }
        snapshot
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::SeqCst),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn records_are_clamped_to_total() {
        let seen = Arc::new(Mutex::new(Vec::<ProgressSnapshot>::new()));
        let sink = seen.clone();
        let listener: ProgressListener =
            Arc::new(move |snap: ProgressSnapshot| sink.lock().expect("lock").push(snap));
        let tracker = ProgressTracker::new(5, vec![listener]);

        tracker.record(2);
        tracker.record(2);
        let last = tracker.record(4);

        assert_eq!(last, ProgressSnapshot { processed: 5, total: 5 });
        assert!(last.is_complete());
        assert_eq!(tracker.snapshot(), last);
        let processed: Vec<usize> = seen
            .lock()
            .expect("lock")
            .iter()
            .map(|s| s.processed)
            .collect();
        assert_eq!(processed, vec![2, 4, 5]);
    }

    #[test]
    fn every_listener_is_notified() {
        let calls = Arc::new(AtomicUsize::new(0));
        let listeners: Vec<ProgressListener> = (0..3)
            .map(|_| {
                let calls = calls.clone();
                Arc::new(move |_: ProgressSnapshot| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }) as ProgressListener
            })
            .collect();
        let tracker = ProgressTracker::new(1, listeners);
        tracker.record(1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.snapshot().to_string(), "1/1");
    }

    #[test]
    fn panicking_listener_does_not_stop_the_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let listeners: Vec<ProgressListener> = vec![
            Arc::new(|_: ProgressSnapshot| panic!("listener boom")),
            Arc::new(move |_: ProgressSnapshot| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ];
        let tracker = ProgressTracker::new(4, listeners);

        assert_eq!(tracker.record(1), ProgressSnapshot { processed: 1, total: 4 });
        assert_eq!(tracker.record(3), ProgressSnapshot { processed: 4, total: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
