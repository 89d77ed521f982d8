//! Presentation counters and the frame rate meter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Per-session presentation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    /// Calls to `did_execute_frame`.
    pub frames_seen: u64,
    /// Frames submitted with a present.
    pub presented: u64,
    /// Frames dropped because a frame was in flight.
    pub skipped_budget: u64,
    /// Frames abandoned because no drawable was free.
    pub skipped_no_drawable: u64,
    /// Frames dropped for unusable core data.
    pub invalid_frames: u64,
    /// Frames not presented because the core was paused.
    pub paused: u64,
    /// Buffer-size reconfigurations.
    pub reconfigurations: u64,
    /// Source rect / aspect updates pushed to the filter chain.
    pub source_rect_updates: u64,
    /// Alternate-thread waits that expired.
    pub handshake_timeouts: u64,
}

impl PresentStats {
    /// Every frame that was not presented for any reason but pause.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped_budget + self.skipped_no_drawable + self.invalid_frames
    }
}

const METER_WINDOW: usize = 32;

/// Frame rate from GPU completion times, over the last 32 completions.
///
/// Clones share one window; completion handlers record into it.
#[derive(Debug, Clone, Default)]
pub struct FrameRateMeter {
    samples: Arc<Mutex<VecDeque<Instant>>>,
}

impl FrameRateMeter {
    /// Creates an empty meter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completion now.
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    /// Records a completion at `at`.
    pub fn record_at(&self, at: Instant) {
        let mut samples = self.samples.lock();
        if samples.len() == METER_WINDOW {
            samples.pop_front();
        }
        samples.push_back(at);
    }

    /// Completions per second, or 0 with fewer than two samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fps(&self) -> f64 {
        let samples = self.samples.lock();
        let (Some(first), Some(last)) = (samples.front(), samples.back()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f64();
        if samples.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (samples.len() - 1) as f64 / span
    }

    /// Forgets every sample.
    pub fn reset(&self) {
        self.samples.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fps_from_completions() {
        let meter = FrameRateMeter::new();
        assert_eq!(meter.fps(), 0.0);

        let start = Instant::now();
        for i in 0..11 {
            meter.record_at(start + Duration::from_millis(20 * i));
        }
        assert!((meter.fps() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let meter = FrameRateMeter::new();
        let start = Instant::now();
        // 100 slow samples followed by 32 fast ones: only the fast ones count.
        for i in 0..100 {
            meter.record_at(start + Duration::from_secs(i));
        }
        let fast = start + Duration::from_secs(100);
        for i in 0..32 {
            meter.record_at(fast + Duration::from_millis(10 * i));
        }
        assert!((meter.fps() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_skipped_total() {
        let stats = PresentStats {
            skipped_budget: 3,
            skipped_no_drawable: 1,
            invalid_frames: 2,
            paused: 7,
            ..PresentStats::default()
        };
        assert_eq!(stats.skipped(), 6);
    }
}
