//! Filter chain without effects: one draw of the source rect into an
//! aspect-correct viewport.

use framepipe_shared::{IntRect, IntSize};

use super::layout::aspect_fit;
use super::{FilterChain, FrameDirection};
use crate::config::FilterMode;
use crate::error::PipelineResult;
use crate::gpu::{CommandBuffer, RenderEncoder, Texture};

/// Draws the frame as-is.
#[derive(Debug, Clone)]
pub struct PassthroughFilterChain {
    source_rect: IntRect,
    aspect: IntSize,
    drawable_size: IntSize,
    filter: FilterMode,
    integer_scaling: bool,
    direction: FrameDirection,
    source: Option<Texture>,
}

impl PassthroughFilterChain {
    /// Creates a chain sampling with `filter`.
    #[must_use]
    pub fn new(filter: FilterMode, integer_scaling: bool) -> Self {
        Self {
            source_rect: IntRect::from_size(IntSize::ZERO),
            aspect: IntSize::ZERO,
            drawable_size: IntSize::ZERO,
            filter,
            integer_scaling,
            direction: FrameDirection::Forward,
            source: None,
        }
    }

    /// Current source rect.
    #[must_use]
    pub fn source_rect(&self) -> IntRect {
        self.source_rect
    }

    /// Current display aspect.
    #[must_use]
    pub fn aspect(&self) -> IntSize {
        self.aspect
    }

    /// Current playback direction.
    #[must_use]
    pub fn direction(&self) -> FrameDirection {
        self.direction
    }

    /// Where the final pass will draw.
    #[must_use]
    pub fn viewport(&self) -> IntRect {
        aspect_fit(
            self.drawable_size,
            self.aspect,
            self.integer_scaling,
            self.source_rect.size,
        )
    }
}

impl Default for PassthroughFilterChain {
    fn default() -> Self {
        Self::new(FilterMode::Nearest, false)
    }
}

impl FilterChain for PassthroughFilterChain {
    fn set_source_rect(&mut self, rect: IntRect, aspect: IntSize) {
        self.source_rect = rect;
        self.aspect = aspect;
    }

    fn set_drawable_size(&mut self, size: IntSize) {
        self.drawable_size = size;
    }

    fn set_frame_direction(&mut self, direction: FrameDirection) {
        self.direction = direction;
    }

    fn render_offscreen_passes(
        &mut self,
        source: &Texture,
        _buffer: &mut CommandBuffer,
    ) -> PipelineResult<()> {
        self.source = Some(source.clone());
        Ok(())
    }

    fn render_final_pass(&mut self, encoder: &mut RenderEncoder<'_>, flip_vertically: bool) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let viewport = self.viewport();
        if viewport.is_empty() || self.source_rect.is_empty() {
            return;
        }
        encoder.draw_texture(source, self.source_rect, viewport, flip_vertically, self.filter);
    }
}
