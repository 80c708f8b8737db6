//! # Backoff Calculation
//!
//! Fibonacci backoff for failed reconciliation passes.
//!
//! Each managed resource keeps its own [`BackoffState`]; a successful pass
//! drops it so the next failure starts from the minimum again.
//! With the driver's bounds the sequence is 1s, 1s, 2s, 3s, 5s, 8s, 13s, 21s,
//! 34s, 55s, then capped at 60s.

/// Smallest retry delay after a failed pass
pub const MIN_BACKOFF_SECS: u64 = 1;
/// Largest retry delay after a failed pass
pub const MAX_BACKOFF_SECS: u64 = 60;

/// Fibonacci sequence of retry delays, bounded by `max_secs`
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: min_secs,
        }
    }

    /// Next delay in the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self.current.min(self.max_secs);
        let next = self.previous.saturating_add(self.current);
        self.previous = self.current;
        self.current = next;
        delay
    }
}

/// Per-resource retry state
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self {
            backoff: FibonacciBackoff::new(MIN_BACKOFF_SECS, MAX_BACKOFF_SECS),
            error_count: 0,
        }
    }
}

impl BackoffState {
    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}
