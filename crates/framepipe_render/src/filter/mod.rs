//! # Filter Chain Seam
//!
//! The shader effects that turn a core frame into the displayed image live
//! outside this crate. The coordinator drives them through [`FilterChain`]:
//!
//! ```text
//! set_source_rect ──(on rect/aspect change)
//! render_offscreen_passes(frame texture) ─► offscreen command buffer
//! render_final_pass(encoder, flip)       ─► drawable
//! ```
//!
//! [`PassthroughFilterChain`] is the no-effects chain.

pub mod layout;
pub mod passthrough;

use framepipe_shared::{IntRect, IntSize};

use crate::error::PipelineResult;
use crate::gpu::{CommandBuffer, RenderEncoder, Texture};

pub use layout::aspect_fit;
pub use passthrough::PassthroughFilterChain;

/// Playback direction, for effects that accumulate over frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameDirection {
    /// Normal playback.
    #[default]
    Forward,
    /// Rewinding.
    Reverse,
}

/// Post-processing between the frame texture and the drawable.
pub trait FilterChain: Send {
    /// Region of the frame texture to show, and its display aspect.
    fn set_source_rect(&mut self, rect: IntRect, aspect: IntSize);

    /// Size of the drawables the final pass renders into.
    fn set_drawable_size(&mut self, size: IntSize);

    /// Playback direction changed.
    fn set_frame_direction(&mut self, direction: FrameDirection) {
        let _ = direction;
    }

    /// Records every pass that does not target the drawable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResourceCreation`](crate::PipelineError::ResourceCreation)
    /// if an intermediate target cannot be created.
    fn render_offscreen_passes(
        &mut self,
        source: &Texture,
        buffer: &mut CommandBuffer,
    ) -> PipelineResult<()>;

    /// Records the pass into the drawable.
    fn render_final_pass(&mut self, encoder: &mut RenderEncoder<'_>, flip_vertically: bool);
}
