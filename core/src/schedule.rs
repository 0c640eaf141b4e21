//! Fixed-interval bookkeeping on a millisecond tick
//!
//! No timers and no backoff: an action is due once `period_ms` has elapsed
//! since it was last marked. Arithmetic wraps so a narrow tick counter
//! rolling over does not stall the loop.

/// Last-action instant plus the period that gates the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last_ms: u64,
}

impl Interval {
    /// New interval whose first deadline is one period after tick 0
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: 0,
        }
    }

    /// At least one period has elapsed since the last mark
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.wrapping_sub(self.last_ms) >= self.period_ms
    }

    /// Record that the action ran at `now_ms`
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }
}
