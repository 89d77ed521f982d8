//! # GPU Device Seam
//!
//! The pipeline talks to the modern graphics API only through
//! [`GpuDevice`]. A platform backend implements it over the real API; the
//! [`headless`](crate::headless) backend implements it in memory.

use std::fmt;

use framepipe_core::SharedPixelBuffer;
use framepipe_shared::{IntPoint, IntSize};

use super::command::CommandBuffer;
use super::texture::{Texture, TextureDescriptor, TextureFormat};
use crate::error::PipelineResult;

/// Callback returning a drawable to its swapchain.
pub type DrawableRelease = Box<dyn FnOnce() + Send + 'static>;

/// A swapchain image lent to one frame.
///
/// Dropping the drawable returns it to the swapchain, whether or not it
/// was presented.
pub struct Drawable {
    id: u64,
    texture: Texture,
    release: Option<DrawableRelease>,
}

impl Drawable {
    /// Wraps a swapchain image. Called by backends.
    #[must_use]
    pub fn new(id: u64, texture: Texture, release: DrawableRelease) -> Self {
        Self {
            id,
            texture,
            release: Some(release),
        }
    }

    /// Swapchain image id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Render target of this image.
    #[inline]
    #[must_use]
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

impl Drop for Drawable {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawable")
            .field("id", &self.id)
            .field("texture", &self.texture)
            .finish()
    }
}

/// Modern graphics device plus its display layer.
///
/// All methods take `&self`; the device is shared between the emulation
/// thread and a core's render thread.
pub trait GpuDevice: Send + Sync {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// True if memory created by [`create_shared_buffer`](Self::create_shared_buffer)
    /// can be viewed by both APIs without copying.
    fn supports_zero_copy(&self) -> bool;

    /// Creates a texture with private storage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// on allocation failure.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> PipelineResult<Texture>;

    /// Allocates pixel memory that both graphics APIs can view.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// on allocation failure.
    fn create_shared_buffer(
        &self,
        size: IntSize,
        format: TextureFormat,
    ) -> PipelineResult<SharedPixelBuffer>;

    /// Creates a modern-API texture viewing `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if the buffer cannot back such a texture.
    fn wrap_shared_buffer(
        &self,
        buffer: &SharedPixelBuffer,
        descriptor: &TextureDescriptor,
    ) -> PipelineResult<Texture>;

    /// Uploads CPU pixels into `texture` immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnreadableFrame`](crate::PipelineError::UnreadableFrame)
    /// if the region does not fit or `bytes` is too short.
    fn write_texture(
        &self,
        texture: &Texture,
        origin: IntPoint,
        size: IntSize,
        bytes: &[u8],
        bytes_per_row: usize,
    ) -> PipelineResult<()>;

    /// Creates an empty command buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if the queue is out of buffers.
    fn make_command_buffer(&self, label: &'static str) -> PipelineResult<CommandBuffer>;

    /// Submits recorded work.
    fn commit(&self, buffer: CommandBuffer);

    /// Resizes the display layer's swapchain images.
    fn set_drawable_size(&self, size: IntSize);

    /// Current swapchain image size.
    fn drawable_size(&self) -> IntSize;

    /// Borrows the next free swapchain image, or `None` if all are busy.
    fn next_drawable(&self) -> Option<Drawable>;

    /// Blocks until all committed work has completed.
    fn wait_idle(&self);
}
