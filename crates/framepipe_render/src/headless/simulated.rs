//! A scriptable stand-in for an emulation core.

use framepipe_shared::{IntPoint, IntRect, IntSize, PixelFormat, PixelType, RenderingApi};
use parking_lot::Mutex;

use crate::core_video::{CoreVideoSource, CoreVideoState};

struct SimulatedState {
    video: CoreVideoState,
    pixels: Vec<u8>,
    bytes_per_pixel: usize,
    unreadable: bool,
    accepts_resize: bool,
    resize_requests: Vec<IntSize>,
}

impl SimulatedState {
    fn reallocate(&mut self) {
        self.bytes_per_pixel = self
            .video
            .pixel_format
            .bytes_per_pixel(self.video.pixel_type)
            .unwrap_or(4) as usize;
        self.pixels = vec![0; self.video.buffer_size.area() as usize * self.bytes_per_pixel];
    }

    fn bytes_per_row(&self) -> usize {
        self.video.buffer_size.width as usize * self.bytes_per_pixel
    }
}

/// Core whose video state is set by the test.
///
/// Starts as a 60 Hz BGRA core whose screen rect and aspect cover the
/// whole buffer.
pub struct SimulatedCore {
    state: Mutex<SimulatedState>,
}

impl SimulatedCore {
    /// Creates a core with a zeroed buffer of `size`.
    #[must_use]
    pub fn new(size: IntSize, rendering_api: RenderingApi) -> Self {
        let mut state = SimulatedState {
            video: CoreVideoState {
                buffer_size: size,
                screen_rect: IntRect::from_size(size),
                aspect_size: size,
                pixel_format: PixelFormat::Bgra,
                pixel_type: PixelType::UnsignedByte,
                rendering_api,
                paused: false,
                frame_interval: 60.0,
                has_alternate_render_thread: false,
            },
            pixels: Vec::new(),
            bytes_per_pixel: 4,
            unreadable: false,
            accepts_resize: false,
            resize_requests: Vec::new(),
        };
        state.reallocate();
        Self {
            state: Mutex::new(state),
        }
    }

    /// Changes the buffer size. Screen rect and aspect follow it.
    pub fn set_buffer_size(&self, size: IntSize) {
        let mut state = self.state.lock();
        state.video.buffer_size = size;
        state.video.screen_rect = IntRect::from_size(size);
        state.video.aspect_size = size;
        state.reallocate();
    }

    /// Reports `size` as the buffer size while keeping the old pixel
    /// memory, like a core handing over a corrupt video state.
    pub fn report_buffer_size(&self, size: IntSize) {
        let mut state = self.state.lock();
        state.video.buffer_size = size;
        state.video.screen_rect = IntRect::from_size(size);
        state.video.aspect_size = size;
    }

    /// Changes the visible rect only.
    pub fn set_screen_rect(&self, rect: IntRect) {
        self.state.lock().video.screen_rect = rect;
    }

    /// Changes the display aspect only.
    pub fn set_aspect_size(&self, aspect: IntSize) {
        self.state.lock().video.aspect_size = aspect;
    }

    /// Changes the CPU pixel layout, clearing the buffer.
    pub fn set_pixel_layout(&self, format: PixelFormat, pixel_type: PixelType) {
        let mut state = self.state.lock();
        state.video.pixel_format = format;
        state.video.pixel_type = pixel_type;
        state.reallocate();
    }

    /// Pauses or resumes.
    pub fn set_paused(&self, paused: bool) {
        self.state.lock().video.paused = paused;
    }

    /// Sets the emulated frame rate.
    pub fn set_frame_interval(&self, frame_interval: f64) {
        self.state.lock().video.frame_interval = frame_interval;
    }

    /// Declares a core-owned render thread.
    pub fn set_alternate_render_thread(&self, enabled: bool) {
        self.state.lock().video.has_alternate_render_thread = enabled;
    }

    /// Fills the buffer with one pixel value (first bytes used for narrow
    /// layouts).
    pub fn fill(&self, pixel: [u8; 4]) {
        let mut state = self.state.lock();
        let bpp = state.bytes_per_pixel;
        for chunk in state.pixels.chunks_exact_mut(bpp) {
            chunk.copy_from_slice(&pixel[..bpp.min(4)]);
        }
    }

    /// Writes one pixel. Out-of-range points are ignored.
    pub fn set_pixel(&self, point: IntPoint, pixel: [u8; 4]) {
        let mut state = self.state.lock();
        let size = state.video.buffer_size;
        if point.x >= size.width || point.y >= size.height {
            return;
        }
        let bpp = state.bytes_per_pixel;
        let start = point.y as usize * state.bytes_per_row() + point.x as usize * bpp;
        state.pixels[start..start + bpp].copy_from_slice(&pixel[..bpp.min(4)]);
    }

    /// Makes `read_video_buffer` fail.
    pub fn set_unreadable(&self, unreadable: bool) {
        self.state.lock().unreadable = unreadable;
    }

    /// Accept or refuse `try_resize_video` requests.
    pub fn set_accepts_resize(&self, accepts: bool) {
        self.state.lock().accepts_resize = accepts;
    }

    /// Every size passed to `try_resize_video`, in order.
    #[must_use]
    pub fn resize_requests(&self) -> Vec<IntSize> {
        self.state.lock().resize_requests.clone()
    }
}

impl CoreVideoSource for SimulatedCore {
    fn video_state(&self) -> CoreVideoState {
        self.state.lock().video
    }

    fn read_video_buffer(&self, reader: &mut dyn FnMut(&[u8], usize)) -> bool {
        let state = self.state.lock();
        if state.unreadable {
            return false;
        }
        reader(&state.pixels, state.bytes_per_row());
        true
    }

    fn try_resize_video(&self, size: IntSize) -> bool {
        let mut state = self.state.lock();
        state.resize_requests.push(size);
        if !state.accepts_resize || size.is_empty() {
            return false;
        }
        state.video.buffer_size = size;
        state.video.screen_rect = IntRect::from_size(size);
        state.reallocate();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_buffer() {
        let core = SimulatedCore::new(IntSize::new(256, 224), RenderingApi::Video2D);
        let video = core.video_state();
        assert_eq!(video.screen_rect, IntRect::new(0, 0, 256, 224));
        assert_eq!(video.aspect_size, IntSize::new(256, 224));
        assert_eq!(video.bytes_per_row(), Some(1024));
    }

    #[test]
    fn test_lends_pitched_buffer() {
        let core = SimulatedCore::new(IntSize::new(2, 2), RenderingApi::Video2D);
        core.set_pixel(IntPoint::new(1, 1), [1, 2, 3, 4]);

        let mut seen = None;
        assert!(core.read_video_buffer(&mut |bytes, pitch| seen = Some((bytes[12..16].to_vec(), pitch))));
        assert_eq!(seen, Some((vec![1, 2, 3, 4], 8)));

        core.set_unreadable(true);
        assert!(!core.read_video_buffer(&mut |_, _| {}));
    }

    #[test]
    fn test_resize_requests() {
        let core = SimulatedCore::new(IntSize::new(256, 224), RenderingApi::OpenGl3);
        assert!(!core.try_resize_video(IntSize::new(512, 448)));
        core.set_accepts_resize(true);
        assert!(core.try_resize_video(IntSize::new(512, 448)));
        assert_eq!(core.video_state().buffer_size, IntSize::new(512, 448));
        assert_eq!(core.resize_requests().len(), 2);
    }
}
