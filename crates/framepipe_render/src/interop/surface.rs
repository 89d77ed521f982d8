//! Shared pixel memory both graphics APIs draw into and sample from.

use framepipe_core::{SharedPixelBuffer, WeakPixelBuffer};
use framepipe_shared::IntSize;

use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{GpuDevice, TextureFormat};

/// One allocation of interop memory.
///
/// Dimensions and format never change; a resize allocates a new surface.
#[derive(Debug, Clone)]
pub struct FrameSurface {
    size: IntSize,
    format: TextureFormat,
    buffer: SharedPixelBuffer,
}

impl FrameSurface {
    /// Allocates a surface through `device`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyBuffer`] for a zero size, or the
    /// device's allocation error.
    pub fn allocate(
        device: &dyn GpuDevice,
        size: IntSize,
        format: TextureFormat,
    ) -> PipelineResult<Self> {
        if size.is_empty() {
            return Err(PipelineError::EmptyBuffer(size));
        }
        let buffer = device.create_shared_buffer(size, format)?;
        Ok(Self {
            size,
            format,
            buffer,
        })
    }

    /// Dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> IntSize {
        self.size
    }

    /// Texel format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Backing memory.
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &SharedPixelBuffer {
        &self.buffer
    }

    /// Non-owning reference to the backing memory.
    #[must_use]
    pub fn downgrade(&self) -> WeakPixelBuffer {
        self.buffer.downgrade()
    }
}
