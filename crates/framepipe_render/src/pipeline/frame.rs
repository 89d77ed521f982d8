//! What happened to a frame, and captured images.

use framepipe_shared::IntSize;

use crate::gpu::TextureFormat;

/// Why a frame was not presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The previous frame was still in flight.
    BudgetExhausted,
    /// No swapchain image was free; the frame was abandoned.
    NoDrawable,
    /// The core's geometry or pixels were unusable.
    InvalidFrame,
}

/// Result of one `did_execute_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Submitted for display.
    Presented {
        /// Coordinator frame index.
        frame: u64,
    },
    /// Dropped.
    Skipped(SkipReason),
    /// Core paused and effects are not displayed while paused.
    Paused,
}

impl FrameOutcome {
    /// True for [`FrameOutcome::Presented`].
    #[inline]
    #[must_use]
    pub const fn is_presented(&self) -> bool {
        matches!(self, Self::Presented { .. })
    }

    /// True for [`FrameOutcome::Skipped`].
    #[inline]
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Pixels read back from a texture, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Dimensions.
    pub size: IntSize,
    /// Texel format of `bytes`.
    pub format: TextureFormat,
    /// Tightly packed rows.
    pub bytes: Vec<u8>,
}

impl CapturedImage {
    /// Bytes per row.
    #[must_use]
    pub fn bytes_per_row(&self) -> usize {
        self.size.width as usize * self.format.bytes_per_pixel() as usize
    }

    /// Pixel at `(x, y)` as `[r, g, b, a]`.
    #[must_use]
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel() as usize;
        let start = y as usize * self.bytes_per_row() + x as usize * bpp;
        self.bytes
            .get(start..start + bpp)
            .map(|texel| self.format.decode_rgba(texel))
    }

    /// Reverses row order in place.
    pub fn flip_rows(&mut self) {
        let stride = self.bytes_per_row();
        if stride == 0 {
            return;
        }
        let rows = self.bytes.len() / stride;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (head, tail) = self.bytes.split_at_mut(bottom * stride);
            head[top * stride..(top + 1) * stride].swap_with_slice(&mut tail[..stride]);
        }
    }
}
