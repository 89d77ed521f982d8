//! # Renderers
//!
//! One renderer produces the texture for each emulated frame. Which one is
//! decided once, from what the core declares at load time:
//!
//! ```text
//! RenderingApi::Video2D                          ─► FixedBuffer2D
//! legacy 3D, drawing on the calling thread      ─► LegacySingleThread
//! legacy 3D, drawing on a core-owned thread     ─► LegacyAlternateThread
//! anything else                                 ─► UnsupportedRenderingApi (fatal)
//! ```

pub mod alternate;
pub mod convert;
pub mod fixed_buffer;
pub mod legacy;

use std::sync::Arc;

use framepipe_core::HandshakeOutcome;
use framepipe_shared::{IntRect, RenderingApi};

use crate::config::PipelineConfig;
use crate::core_video::{CoreVideoSource, CoreVideoState};
use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{CommandBuffer, Framebuffer, GpuDevice, LegacyContext, Texture};
use crate::interop::InteropTextureBridge;

pub use alternate::{AlternateThreadRenderer, RenderThreadHandle};
pub use convert::PixelConverter;
pub use fixed_buffer::FixedBufferRenderer;
pub use legacy::{LegacyRenderer, INTEROP_FORMAT};

/// Lifecycle of a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// Created, never updated.
    Uninitialized,
    /// Resources exist for the current geometry.
    Configured,
    /// At least one frame was prepared.
    Rendering,
}

/// Which variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// CPU buffer uploaded each frame.
    FixedBuffer2D,
    /// Legacy API, core draws on the presenting thread.
    LegacySingleThread,
    /// Legacy API, core draws on its own thread.
    LegacyAlternateThread,
}

/// The active renderer.
pub enum Renderer {
    /// See [`FixedBufferRenderer`].
    FixedBuffer2D(FixedBufferRenderer),
    /// See [`LegacyRenderer`].
    LegacySingleThread(LegacyRenderer),
    /// See [`AlternateThreadRenderer`].
    LegacyAlternateThread(AlternateThreadRenderer),
}

impl Renderer {
    /// Picks the variant for `video`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnsupportedRenderingApi`] for APIs no variant
    /// handles, [`PipelineError::UnsupportedPixelFormat`] for 2D layouts
    /// with no texture format, and a resource error when a legacy core
    /// comes without a legacy context.
    pub fn select(
        device: Arc<dyn GpuDevice>,
        legacy: Option<Box<dyn LegacyContext>>,
        video: &CoreVideoState,
        config: &PipelineConfig,
    ) -> PipelineResult<Self> {
        let renderer = match video.rendering_api {
            RenderingApi::Video2D => Self::FixedBuffer2D(FixedBufferRenderer::new(device, video)?),
            api if api.is_legacy_3d() => {
                let context = legacy.ok_or_else(|| {
                    PipelineError::resource("legacy context", "core needs a legacy 3D context")
                })?;
                let base = LegacyRenderer::new(
                    device,
                    context,
                    config.double_buffered,
                    config.clear_color,
                );
                if video.has_alternate_render_thread {
                    Self::LegacyAlternateThread(AlternateThreadRenderer::new(
                        base,
                        config.fps_limiting,
                        config.handshake_timeout(),
                    ))
                } else {
                    Self::LegacySingleThread(base)
                }
            }
            api => return Err(PipelineError::UnsupportedRenderingApi(api)),
        };

        tracing::info!(
            target: "framepipe::renderer",
            "Selected {:?} renderer for {:?}",
            renderer.kind(),
            video.rendering_api
        );
        Ok(renderer)
    }

    /// Active variant.
    #[must_use]
    pub fn kind(&self) -> RendererKind {
        match self {
            Self::FixedBuffer2D(_) => RendererKind::FixedBuffer2D,
            Self::LegacySingleThread(_) => RendererKind::LegacySingleThread,
            Self::LegacyAlternateThread(_) => RendererKind::LegacyAlternateThread,
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RendererState {
        match self {
            Self::FixedBuffer2D(r) => r.state(),
            Self::LegacySingleThread(r) => r.state(),
            Self::LegacyAlternateThread(r) => r.base().state(),
        }
    }

    /// Whether a buffer size change can be followed.
    #[must_use]
    pub fn can_change_buffer_size(&self) -> bool {
        !matches!(self, Self::FixedBuffer2D(_))
    }

    /// Brings resources in line with the core's geometry.
    ///
    /// # Errors
    ///
    /// Allocation failures, which are fatal.
    pub fn update(&mut self, video: &CoreVideoState) -> PipelineResult<()> {
        match self {
            Self::FixedBuffer2D(r) => r.update(video),
            Self::LegacySingleThread(r) => r.update(video),
            Self::LegacyAlternateThread(r) => r.base_mut().update(video),
        }
    }

    /// Called before the core executes a frame.
    pub fn will_execute(&self) {
        if let Self::LegacyAlternateThread(r) = self {
            r.will_execute();
        }
    }

    /// Called after the core executed a frame.
    pub fn did_execute(&self) -> HandshakeOutcome {
        match self {
            Self::LegacyAlternateThread(r) => r.did_execute(),
            _ => HandshakeOutcome::Proceed,
        }
    }

    /// Produces the texture for this frame.
    ///
    /// # Errors
    ///
    /// Recoverable frame-data errors for 2D cores; an empty bridge for
    /// legacy cores.
    pub fn prepare_frame(
        &mut self,
        core: &dyn CoreVideoSource,
        video: &CoreVideoState,
        buffer: &mut CommandBuffer,
    ) -> PipelineResult<Texture> {
        match self {
            Self::FixedBuffer2D(r) => r.prepare(core, video),
            Self::LegacySingleThread(r) => r.prepare(buffer),
            Self::LegacyAlternateThread(r) => r.base_mut().prepare(buffer),
        }
    }

    /// Region of the frame texture the filter chain should show.
    #[must_use]
    pub fn source_rect(&self, video: &CoreVideoState) -> IntRect {
        match self {
            Self::FixedBuffer2D(r) => r.source_rect(),
            _ => video.screen_rect,
        }
    }

    /// Texture holding the core's latest pixels, for capture.
    #[must_use]
    pub fn capture_texture(&self) -> Option<Texture> {
        match self {
            Self::FixedBuffer2D(r) => r.texture().cloned(),
            _ => self
                .bridge()
                .and_then(|b| b.current_textures().ok())
                .map(|t| t.legacy.clone()),
        }
    }

    /// Frame texture content is bottom-up.
    #[must_use]
    pub fn is_flipped_vertically(&self) -> bool {
        self.bridge()
            .is_some_and(InteropTextureBridge::is_flipped_vertically)
    }

    /// The interop bridge of the legacy variants.
    #[must_use]
    pub fn bridge(&self) -> Option<&InteropTextureBridge> {
        self.legacy().map(LegacyRenderer::bridge)
    }

    /// The legacy renderer, if one is active.
    #[must_use]
    pub fn legacy(&self) -> Option<&LegacyRenderer> {
        match self {
            Self::FixedBuffer2D(_) => None,
            Self::LegacySingleThread(r) => Some(r),
            Self::LegacyAlternateThread(r) => Some(r.base()),
        }
    }

    /// Framebuffer the core should draw into.
    #[must_use]
    pub fn presentation_framebuffer(&self) -> Option<Framebuffer> {
        self.legacy().and_then(LegacyRenderer::presentation_framebuffer)
    }

    /// Blits the back buffer into the interop framebuffer.
    pub fn present_double_buffered(&mut self) -> bool {
        match self {
            Self::FixedBuffer2D(_) => false,
            Self::LegacySingleThread(r) => r.present_double_buffered(),
            Self::LegacyAlternateThread(r) => r.base_mut().present_double_buffered(),
        }
    }

    /// Handle for a core-owned render thread.
    #[must_use]
    pub fn render_thread_handle(&self) -> Option<RenderThreadHandle> {
        match self {
            Self::LegacyAlternateThread(r) => Some(r.render_thread_handle()),
            _ => None,
        }
    }

    /// Suspends FPS limiting. Returns true if anything changed.
    pub fn suspend_fps_limiting(&self) -> bool {
        match self {
            Self::LegacyAlternateThread(r) => r.suspend_fps_limiting(),
            _ => false,
        }
    }

    /// Resumes FPS limiting. Returns true if anything changed.
    pub fn resume_fps_limiting(&self) -> bool {
        match self {
            Self::LegacyAlternateThread(r) => r.resume_fps_limiting(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessConfig, HeadlessDevice, HeadlessLegacyContext, SimulatedCore};
    use framepipe_shared::IntSize;

    fn select(api: RenderingApi, alternate: bool, with_context: bool) -> PipelineResult<Renderer> {
        let device: Arc<dyn GpuDevice> = Arc::new(HeadlessDevice::new(HeadlessConfig::default()));
        let core = SimulatedCore::new(IntSize::new(256, 224), api);
        core.set_alternate_render_thread(alternate);
        let legacy: Option<Box<dyn LegacyContext>> =
            with_context.then(|| Box::new(HeadlessLegacyContext::new("present")) as _);
        Renderer::select(device, legacy, &core.video_state(), &PipelineConfig::default())
    }

    #[test]
    fn test_selection() {
        let r = select(RenderingApi::Video2D, false, false).unwrap();
        assert_eq!(r.kind(), RendererKind::FixedBuffer2D);
        assert!(!r.can_change_buffer_size());

        let r = select(RenderingApi::OpenGl3, false, true).unwrap();
        assert_eq!(r.kind(), RendererKind::LegacySingleThread);
        assert!(r.can_change_buffer_size());
        assert!(r.render_thread_handle().is_none());

        let r = select(RenderingApi::OpenGles3, true, true).unwrap();
        assert_eq!(r.kind(), RendererKind::LegacyAlternateThread);
        assert!(r.render_thread_handle().is_some());
    }

    #[test]
    fn test_unsupported_api_is_fatal() {
        let err = select(RenderingApi::Vulkan, false, true).err().unwrap();
        assert_eq!(err, PipelineError::UnsupportedRenderingApi(RenderingApi::Vulkan));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_legacy_without_context_is_fatal() {
        let err = select(RenderingApi::OpenGl2, false, false).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_limiting_toggle_only_for_alternate_thread() {
        let single = select(RenderingApi::OpenGl3, false, true).unwrap();
        assert!(!single.suspend_fps_limiting());

        let alternate = select(RenderingApi::OpenGl3, true, true).unwrap();
        assert!(alternate.suspend_fps_limiting());
        assert!(!alternate.suspend_fps_limiting());
        assert!(alternate.resume_fps_limiting());
    }
}
