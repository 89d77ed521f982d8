//! # Alternate Render Thread Renderer
//!
//! A legacy renderer whose core draws on its own thread. While FPS limiting
//! is on, each presented frame is exchanged through [`AlternateThreadSync`].
//!
//! The core thread gets a [`RenderThreadHandle`] and its own legacy
//! context; every call that draws takes that context explicitly.

use std::sync::Arc;
use std::time::Duration;

use framepipe_core::{AlternateThreadSync, HandshakeOutcome};

use super::legacy::{present_back_buffer, LegacyRenderer, SharedTargets};
use crate::gpu::{Framebuffer, LegacyContext};

/// Legacy renderer driven from a core-owned render thread.
pub struct AlternateThreadRenderer {
    base: LegacyRenderer,
    sync: Arc<AlternateThreadSync>,
    timeout: Duration,
}

impl AlternateThreadRenderer {
    /// Wraps `base` with a handshake, limiting initially `limiting`.
    #[must_use]
    pub fn new(base: LegacyRenderer, limiting: bool, timeout: Duration) -> Self {
        Self {
            base,
            sync: Arc::new(AlternateThreadSync::new(limiting)),
            timeout,
        }
    }

    /// Lets the core render thread start its next frame.
    pub fn will_execute(&self) {
        self.sync.signal_core_may_proceed();
    }

    /// Waits (bounded) for the core render thread's frame.
    pub fn did_execute(&self) -> HandshakeOutcome {
        let outcome = self.sync.wait_for_core_frame(self.timeout);
        if outcome == HandshakeOutcome::TimedOut {
            tracing::debug!(
                target: "framepipe::renderer",
                "No frame from render thread within {:?}; presenting previous contents",
                self.timeout
            );
        }
        outcome
    }

    /// Turns the handshake off. Parked threads are released.
    pub fn suspend_fps_limiting(&self) -> bool {
        self.sync.set_limiting(false)
    }

    /// Turns the handshake back on with a fresh cycle.
    pub fn resume_fps_limiting(&self) -> bool {
        self.sync.set_limiting(true)
    }

    /// Handle for the core's render thread.
    #[must_use]
    pub fn render_thread_handle(&self) -> RenderThreadHandle {
        RenderThreadHandle {
            sync: Arc::clone(&self.sync),
            targets: self.base.shared_targets(),
            double_buffered: self.base.is_double_buffered(),
        }
    }

    /// The handshake.
    #[must_use]
    pub fn sync(&self) -> &AlternateThreadSync {
        &self.sync
    }

    /// The wrapped legacy renderer.
    #[must_use]
    pub fn base(&self) -> &LegacyRenderer {
        &self.base
    }

    /// The wrapped legacy renderer, mutably.
    pub fn base_mut(&mut self) -> &mut LegacyRenderer {
        &mut self.base
    }
}

impl Drop for AlternateThreadRenderer {
    fn drop(&mut self) {
        self.sync.set_limiting(false);
    }
}

/// What a core's render thread holds to take part in presentation.
#[derive(Clone)]
pub struct RenderThreadHandle {
    sync: Arc<AlternateThreadSync>,
    targets: SharedTargets,
    double_buffered: bool,
}

impl RenderThreadHandle {
    /// Framebuffer to draw the next frame into.
    #[must_use]
    pub fn will_render_frame(&self) -> Option<Framebuffer> {
        self.targets.lock().as_ref().map(|t| t.draw_target())
    }

    /// Finishes a frame on the render thread: flush, blit when double
    /// buffered, then hand the frame to presentation.
    ///
    /// Blocks until presentation grants the next frame while limiting is
    /// on.
    pub fn did_render_frame(&self, context: &mut dyn LegacyContext) -> HandshakeOutcome {
        context.flush();
        if self.double_buffered {
            present_back_buffer(context, &self.targets);
        }
        self.sync.core_frame_finished()
    }

    /// The handshake.
    #[must_use]
    pub fn sync(&self) -> &AlternateThreadSync {
        &self.sync
    }
}

impl std::fmt::Debug for RenderThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThreadHandle")
            .field("limiting", &self.sync.is_limiting())
            .field("double_buffered", &self.double_buffered)
            .finish_non_exhaustive()
    }
}
