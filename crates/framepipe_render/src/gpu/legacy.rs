//! # Legacy Graphics Context
//!
//! The API a legacy 3D core draws with. Contexts are passed explicitly to
//! every call that needs one; there is no per-thread "current" context.
//!
//! A core's render thread gets its own context from
//! [`LegacyContext::create_shared_context`], sharing objects with the
//! presentation context.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use framepipe_core::SharedPixelBuffer;
use framepipe_shared::{IntRect, IntSize};

use super::texture::{Texture, TextureFormat};
use crate::error::PipelineResult;

static NEXT_FRAMEBUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// A legacy-API framebuffer with one color attachment.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    id: u64,
    color: Texture,
    has_depth: bool,
}

impl Framebuffer {
    /// Wraps a color attachment. Called by backends.
    #[must_use]
    pub fn new(color: Texture, has_depth: bool) -> Self {
        Self {
            id: NEXT_FRAMEBUFFER_ID.fetch_add(1, Ordering::Relaxed),
            color,
            has_depth,
        }
    }

    /// Process-unique framebuffer name.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Color attachment.
    #[inline]
    #[must_use]
    pub fn color(&self) -> &Texture {
        &self.color
    }

    /// A depth-stencil attachment exists.
    #[inline]
    #[must_use]
    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    /// Attachment size.
    #[inline]
    #[must_use]
    pub fn size(&self) -> IntSize {
        self.color.size()
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id)
            .field("color", &self.color.id())
            .field("size", &self.size())
            .field("has_depth", &self.has_depth)
            .finish()
    }
}

/// A legacy graphics API context.
pub trait LegacyContext: Send {
    /// Debug label.
    fn label(&self) -> &str;

    /// Identifier of the object-sharing group this context belongs to.
    fn share_group(&self) -> u64;

    /// Creates a legacy texture viewing shared memory.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if the texture cache cannot wrap the buffer.
    fn create_texture_from_shared(
        &mut self,
        buffer: &SharedPixelBuffer,
        format: TextureFormat,
    ) -> PipelineResult<Texture>;

    /// Creates a framebuffer drawing into `color`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if the framebuffer is incomplete.
    fn create_framebuffer(&mut self, color: &Texture, with_depth: bool)
        -> PipelineResult<Framebuffer>;

    /// Creates a framebuffer with private storage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// on allocation failure.
    fn create_offscreen_framebuffer(
        &mut self,
        size: IntSize,
        format: TextureFormat,
        with_depth: bool,
    ) -> PipelineResult<Framebuffer>;

    /// Deletes a framebuffer. Attachments live on while other handles exist.
    fn delete_framebuffer(&mut self, framebuffer: Framebuffer);

    /// Fills the color attachment.
    fn clear_framebuffer(&mut self, framebuffer: &Framebuffer, color: [f64; 4]);

    /// Copies `rect` between color attachments at the same position.
    fn blit_framebuffer(&mut self, source: &Framebuffer, target: &Framebuffer, rect: IntRect);

    /// Submits pending commands and waits for them.
    fn flush(&mut self);

    /// Creates a context in the same share group, for another thread.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if the platform refuses another context.
    fn create_shared_context(&self) -> PipelineResult<Box<dyn LegacyContext>>;
}
