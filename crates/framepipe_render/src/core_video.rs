//! # Emulation Core Interface
//!
//! What the pipeline reads from a running core. The core is an external
//! collaborator; only this boundary is defined here.

use framepipe_shared::{IntRect, IntSize, PixelFormat, PixelType, RenderingApi};

/// Video description reported by a core, sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreVideoState {
    /// Size of the core's video buffer.
    pub buffer_size: IntSize,
    /// Visible part of the buffer.
    pub screen_rect: IntRect,
    /// Display aspect ratio, as a size.
    pub aspect_size: IntSize,
    /// Channel layout of the CPU buffer (2D cores).
    pub pixel_format: PixelFormat,
    /// Component packing of the CPU buffer (2D cores).
    pub pixel_type: PixelType,
    /// Drawing API declared at load time.
    pub rendering_api: RenderingApi,
    /// Core is paused.
    pub paused: bool,
    /// Emulated frames per second.
    pub frame_interval: f64,
    /// Core draws on its own private render thread.
    pub has_alternate_render_thread: bool,
}

impl CoreVideoState {
    /// Row pitch of the 2D buffer, or `None` for an invalid pixel layout.
    #[must_use]
    pub fn bytes_per_row(&self) -> Option<usize> {
        self.pixel_format
            .bytes_per_pixel(self.pixel_type)
            .map(|bpp| self.buffer_size.width as usize * bpp as usize)
    }
}

/// Source of video state and frame memory.
///
/// Implementations must be cheap to query: `video_state` runs once per
/// frame on the core's thread.
pub trait CoreVideoSource: Send + Sync {
    /// Current video description.
    fn video_state(&self) -> CoreVideoState;

    /// Lends the CPU video buffer to `reader` as `(bytes, bytes_per_row)`.
    ///
    /// Returns false if no frame memory is available.
    fn read_video_buffer(&self, reader: &mut dyn FnMut(&[u8], usize)) -> bool;

    /// Asks the core to render at `size` from its next frame on.
    ///
    /// Returns true if the core accepted.
    fn try_resize_video(&self, size: IntSize) -> bool {
        let _ = size;
        false
    }
}
