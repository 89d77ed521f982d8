//! Renderer for cores that draw into a CPU buffer.

use std::sync::Arc;

use framepipe_shared::{IntPoint, IntRect, PixelFormat, PixelType};

use super::convert::PixelConverter;
use super::RendererState;
use crate::core_video::{CoreVideoSource, CoreVideoState};
use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{GpuDevice, Texture, TextureDescriptor, TextureFormat, TextureUsage};

/// Uploads the core's output rect into a texture of the same size each
/// frame.
pub struct FixedBufferRenderer {
    device: Arc<dyn GpuDevice>,
    converter: PixelConverter,
    texture: Option<Texture>,
    output_rect: IntRect,
    pixels: (PixelFormat, PixelType),
    state: RendererState,
}

impl FixedBufferRenderer {
    /// Creates the renderer for a core's pixel layout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedPixelFormat`] if the layout has
    /// no texture format.
    pub fn new(device: Arc<dyn GpuDevice>, video: &CoreVideoState) -> PipelineResult<Self> {
        Self::texture_format(video)?;
        Ok(Self {
            device,
            converter: PixelConverter::new(),
            texture: None,
            output_rect: video.screen_rect,
            pixels: (video.pixel_format, video.pixel_type),
            state: RendererState::Uninitialized,
        })
    }

    fn texture_format(video: &CoreVideoState) -> PipelineResult<TextureFormat> {
        TextureFormat::for_core_pixels(video.pixel_format, video.pixel_type).ok_or(
            PipelineError::UnsupportedPixelFormat {
                format: video.pixel_format,
                pixel_type: video.pixel_type,
            },
        )
    }

    /// Reallocates the texture when the output rect size or pixel layout
    /// changed.
    ///
    /// # Errors
    ///
    /// Texture allocation failures, which are fatal.
    pub fn update(&mut self, video: &CoreVideoState) -> PipelineResult<()> {
        let pixels = (video.pixel_format, video.pixel_type);
        let resized = self
            .texture
            .as_ref()
            .map_or(true, |t| t.size() != video.screen_rect.size);

        if resized || pixels != self.pixels {
            let format = Self::texture_format(video)?;
            self.texture = None;
            let descriptor = TextureDescriptor::new(
                "fixed buffer frame",
                video.screen_rect.size,
                format,
                TextureUsage::SAMPLED,
            );
            self.texture = Some(self.device.create_texture(&descriptor)?);
            self.pixels = pixels;
            tracing::debug!(
                target: "framepipe::renderer",
                "2D frame texture allocated at {} ({format:?})",
                video.screen_rect.size
            );
        }

        self.output_rect = video.screen_rect;
        if self.state == RendererState::Uninitialized {
            self.state = RendererState::Configured;
        }
        Ok(())
    }

    /// Converts and uploads the current frame.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnreadableFrame`] if the core lends no memory or
    /// too little of it.
    pub fn prepare(
        &mut self,
        core: &dyn CoreVideoSource,
        video: &CoreVideoState,
    ) -> PipelineResult<Texture> {
        let texture = self
            .texture
            .clone()
            .ok_or_else(|| PipelineError::resource("frame texture", "renderer not configured"))?;
        let rect = self.output_rect;
        let row_len = rect.size.width as usize * texture.format().bytes_per_pixel() as usize;

        let converter = &mut self.converter;
        let device = &*self.device;
        let mut uploaded = Err(PipelineError::UnreadableFrame(
            "core lent no frame memory".into(),
        ));
        let lent = core.read_video_buffer(&mut |bytes, pitch| {
            uploaded = converter
                .convert(bytes, pitch, rect, video.pixel_format, video.pixel_type)
                .and_then(|rows| device.write_texture(&texture, IntPoint::ZERO, rect.size, rows, row_len));
        });
        if !lent {
            return Err(PipelineError::UnreadableFrame(
                "core has no frame memory".into(),
            ));
        }
        uploaded?;

        self.state = RendererState::Rendering;
        Ok(texture)
    }

    /// The whole texture; it holds exactly the output rect.
    #[must_use]
    pub fn source_rect(&self) -> IntRect {
        IntRect::from_size(self.output_rect.size)
    }

    /// Current frame texture.
    #[must_use]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RendererState {
        self.state
    }
}
