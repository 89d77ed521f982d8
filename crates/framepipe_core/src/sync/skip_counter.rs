//! Monotonic count of frames that were produced but never presented.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Session-wide skipped frame counter. Cloning shares the count.
///
/// Never reset; only read for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct FrameSkipCounter {
    total: Arc<AtomicU64>,
}

impl FrameSkipCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one skipped frame and returns the new total.
    #[inline]
    pub fn record(&self) -> u64 {
        self.total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Frames skipped so far.
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_monotonic() {
        let counter = FrameSkipCounter::new();
        let mut last = counter.total();
        for expected in 1..=5 {
            let now = counter.record();
            assert_eq!(now, expected);
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn test_clones_share_total() {
        let counter = FrameSkipCounter::new();
        let other = counter.clone();
        other.record();
        other.record();
        assert_eq!(counter.total(), 2);
    }
}
