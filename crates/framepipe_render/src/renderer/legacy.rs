//! # Legacy 3D Renderer
//!
//! The core draws with the legacy API into a framebuffer whose color
//! attachment is the bridge's legacy texture. Double buffering inserts a
//! private back framebuffer that is blitted across once a frame is done.
//!
//! ```text
//! single:   core ─► interop FBO ══ shared surface ══► modern texture
//! double:   core ─► back FBO ─blit─► interop FBO ══ shared surface ══► modern texture
//! ```

use std::sync::Arc;

use framepipe_shared::{IntRect, IntSize};
use parking_lot::Mutex;

use super::RendererState;
use crate::core_video::CoreVideoState;
use crate::error::PipelineResult;
use crate::gpu::{CommandBuffer, Framebuffer, GpuDevice, LegacyContext, Texture, TextureFormat};
use crate::interop::InteropTextureBridge;

/// Format of the interop surface for legacy cores.
pub const INTEROP_FORMAT: TextureFormat = TextureFormat::Bgra8Unorm;

/// Framebuffers the core draws into, shared with its render thread.
#[derive(Debug)]
pub(crate) struct LegacyTargets {
    interop: Framebuffer,
    back: Option<Framebuffer>,
    output_rect: IntRect,
    front_ready: bool,
}

impl LegacyTargets {
    pub(crate) fn draw_target(&self) -> Framebuffer {
        self.back.clone().unwrap_or_else(|| self.interop.clone())
    }
}

/// Shared handle to the current targets.
pub(crate) type SharedTargets = Arc<Mutex<Option<LegacyTargets>>>;

/// Blits the back framebuffer's output rect into the interop framebuffer.
///
/// Returns false when double buffering is off or nothing is built.
pub(crate) fn present_back_buffer(context: &mut dyn LegacyContext, targets: &SharedTargets) -> bool {
    let mut guard = targets.lock();
    let Some(targets) = guard.as_mut() else {
        return false;
    };
    let Some(back) = targets.back.as_ref() else {
        return false;
    };

    context.blit_framebuffer(back, &targets.interop, targets.output_rect);
    context.flush();
    targets.front_ready = true;
    true
}

/// Renderer for cores drawing with the legacy API on the calling thread.
pub struct LegacyRenderer {
    device: Arc<dyn GpuDevice>,
    context: Box<dyn LegacyContext>,
    bridge: InteropTextureBridge,
    targets: SharedTargets,
    double_buffered: bool,
    clear_color: [f64; 4],
    state: RendererState,
}

impl LegacyRenderer {
    /// Creates the renderer around the presentation-side legacy context.
    #[must_use]
    pub fn new(
        device: Arc<dyn GpuDevice>,
        context: Box<dyn LegacyContext>,
        double_buffered: bool,
        clear_color: [f64; 4],
    ) -> Self {
        Self {
            device,
            context,
            bridge: InteropTextureBridge::new(),
            targets: Arc::new(Mutex::new(None)),
            double_buffered,
            clear_color,
            state: RendererState::Uninitialized,
        }
    }

    /// Rebuilds context resources and the bridge on a buffer size change,
    /// and tracks the output rect.
    ///
    /// # Errors
    ///
    /// Any allocation failure, which is fatal.
    pub fn update(&mut self, video: &CoreVideoState) -> PipelineResult<()> {
        if self.bridge.size() != Some(video.buffer_size) {
            self.rebuild(video.buffer_size)?;
        }
        if let Some(targets) = self.targets.lock().as_mut() {
            targets.output_rect = video.screen_rect;
        }
        if self.state == RendererState::Uninitialized {
            self.state = RendererState::Configured;
        }
        Ok(())
    }

    fn rebuild(&mut self, size: IntSize) -> PipelineResult<()> {
        let previous = self.targets.lock().take();
        if let Some(previous) = previous {
            self.context.delete_framebuffer(previous.interop);
            if let Some(back) = previous.back {
                self.context.delete_framebuffer(back);
            }
        }

        self.bridge
            .resize(&*self.device, self.context.as_mut(), size, INTEROP_FORMAT)?;
        let legacy_texture = self.bridge.current_textures()?.legacy.clone();

        let interop = self.context.create_framebuffer(&legacy_texture, true)?;
        let back = if self.double_buffered {
            Some(
                self.context
                    .create_offscreen_framebuffer(size, INTEROP_FORMAT, true)?,
            )
        } else {
            None
        };
        self.context.clear_framebuffer(&interop, self.clear_color);
        self.context.flush();

        *self.targets.lock() = Some(LegacyTargets {
            interop,
            back,
            output_rect: IntRect::from_size(size),
            front_ready: false,
        });

        tracing::info!(
            target: "framepipe::renderer",
            "Legacy render targets rebuilt at {size} (double buffered: {})",
            self.double_buffered
        );
        Ok(())
    }

    /// Records the interop synchronization and returns the texture to filter.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InteropUnavailable`](crate::PipelineError::InteropUnavailable)
    /// if the bridge is empty.
    pub fn prepare(&mut self, buffer: &mut CommandBuffer) -> PipelineResult<Texture> {
        self.bridge.synchronize(buffer)?;
        let texture = self.bridge.current_textures()?.modern.clone();
        if let Some(targets) = self.targets.lock().as_mut() {
            targets.front_ready = false;
        }
        self.state = RendererState::Rendering;
        Ok(texture)
    }

    /// The framebuffer the core should draw into right now.
    #[must_use]
    pub fn presentation_framebuffer(&self) -> Option<Framebuffer> {
        self.targets.lock().as_ref().map(LegacyTargets::draw_target)
    }

    /// Blits the back buffer into the interop framebuffer using the
    /// presentation context.
    pub fn present_double_buffered(&mut self) -> bool {
        present_back_buffer(self.context.as_mut(), &self.targets)
    }

    /// A double-buffered frame was blitted and not yet consumed.
    #[must_use]
    pub fn is_front_buffer_ready(&self) -> bool {
        self.targets.lock().as_ref().is_some_and(|t| t.front_ready)
    }

    /// Legacy content is bottom-up once the bridge is built.
    #[must_use]
    pub fn is_flipped_vertically(&self) -> bool {
        self.bridge.is_flipped_vertically()
    }

    /// The interop bridge.
    #[must_use]
    pub fn bridge(&self) -> &InteropTextureBridge {
        &self.bridge
    }

    /// Legacy double buffering is on.
    #[must_use]
    pub fn is_double_buffered(&self) -> bool {
        self.double_buffered
    }

    /// Presentation-side legacy context.
    #[must_use]
    pub fn context(&self) -> &dyn LegacyContext {
        self.context.as_ref()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RendererState {
        self.state
    }

    pub(crate) fn shared_targets(&self) -> SharedTargets {
        Arc::clone(&self.targets)
    }
}
