//! # Presentation Constants
//!
//! Values baked into the pipeline. Tunables that differ per deployment live
//! in `PipelineConfig` instead.

// =============================================================================
// FRAME PACING
// =============================================================================

/// Frame rate assumed when a core reports an unusable frame interval.
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 60;

/// Core frame intervals below this are treated as bogus and replaced by
/// [`DEFAULT_FRAMES_PER_SECOND`].
pub const MIN_SUPPORTED_FRAME_INTERVAL: f64 = 10.0;

// =============================================================================
// BUFFERS
// =============================================================================

/// Number of staging buffers cycled by the 2D upload path.
pub const UPLOAD_RING_SIZE: usize = 3;

/// Bytes per pixel of the shared interop surface (always 32-bit BGRA).
pub const INTEROP_BYTES_PER_PIXEL: u32 = 4;

/// Largest width or height, in pixels, of any buffer or texture. Larger
/// core-reported sizes are treated as invalid geometry.
pub const MAX_BUFFER_DIMENSION: u32 = 16_384;

/// Returns the display refresh rate to request for a core frame interval.
///
/// Cores occasionally report nonsense intervals (0, or single digits while
/// booting); those fall back to 60.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn preferred_frames_per_second(frame_interval: f64) -> u32 {
    if !frame_interval.is_finite() || frame_interval < MIN_SUPPORTED_FRAME_INTERVAL {
        return DEFAULT_FRAMES_PER_SECOND;
    }
    frame_interval.round().min(f64::from(u16::MAX)) as u32
}
