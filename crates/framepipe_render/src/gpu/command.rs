//! # Command Recording
//!
//! Work is recorded into a [`CommandBuffer`] and handed to
//! [`GpuDevice::commit`](super::GpuDevice::commit). Completion handlers run
//! on whatever thread the backend completes work on, never on the
//! recording thread.
//!
//! ```text
//! make_command_buffer ─► copy / render_encoder ─► add_completed_handler ─► present ─► commit
//! ```

use std::fmt;
use std::time::Duration;

use framepipe_shared::{IntPoint, IntRect};

use super::device::Drawable;
use super::texture::Texture;
use crate::config::FilterMode;

/// Callback run once the GPU has finished a command buffer.
pub type CompletedHandler = Box<dyn FnOnce() + Send + 'static>;

/// One textured quad draw.
#[derive(Debug, Clone)]
pub struct DrawPass {
    /// Sampled texture.
    pub source: Texture,
    /// Region of `source` to sample.
    pub source_rect: IntRect,
    /// Render target.
    pub target: Texture,
    /// Region of `target` to fill.
    pub viewport: IntRect,
    /// Sample rows bottom-up.
    pub flip_vertically: bool,
    /// Sampling filter.
    pub filter: FilterMode,
}

/// Recorded GPU command.
pub enum GpuCommand {
    /// Texture to texture copy of `source_rect`.
    Copy {
        /// Copy source.
        source: Texture,
        /// Region read from `source`.
        source_rect: IntRect,
        /// Copy destination.
        target: Texture,
        /// Where the region lands in `target`.
        target_origin: IntPoint,
    },
    /// Fill a whole target with one color.
    Clear {
        /// Cleared texture.
        target: Texture,
        /// RGBA, 0..=1.
        color: [f64; 4],
    },
    /// Draw a textured quad.
    Draw(DrawPass),
    /// Hand a drawable to the display.
    Present {
        /// Drawable to show.
        drawable: Drawable,
        /// Minimum time the previous image stays on screen.
        min_duration: Option<Duration>,
    },
}

impl fmt::Debug for GpuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy {
                source,
                source_rect,
                target,
                target_origin,
            } => f
                .debug_struct("Copy")
                .field("source", &source.id())
                .field("source_rect", source_rect)
                .field("target", &target.id())
                .field("target_origin", target_origin)
                .finish(),
            Self::Clear { target, color } => f
                .debug_struct("Clear")
                .field("target", &target.id())
                .field("color", color)
                .finish(),
            Self::Draw(pass) => f.debug_tuple("Draw").field(pass).finish(),
            Self::Present {
                drawable,
                min_duration,
            } => f
                .debug_struct("Present")
                .field("drawable", &drawable.id())
                .field("min_duration", min_duration)
                .finish(),
        }
    }
}

/// A list of commands plus completion handlers, submitted as a unit.
pub struct CommandBuffer {
    label: &'static str,
    commands: Vec<GpuCommand>,
    handlers: Vec<CompletedHandler>,
}

impl CommandBuffer {
    /// Creates an empty command buffer. Called by backends.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            commands: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Debug label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Recorded commands, in order.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// True if nothing was recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Records a copy of `source_rect` from `source` into `target`.
    pub fn copy_texture(
        &mut self,
        source: &Texture,
        source_rect: IntRect,
        target: &Texture,
        target_origin: IntPoint,
    ) {
        self.commands.push(GpuCommand::Copy {
            source: source.clone(),
            source_rect,
            target: target.clone(),
            target_origin,
        });
    }

    /// Starts a render pass on `target`, cleared to `clear_color`.
    pub fn render_encoder(&mut self, target: &Texture, clear_color: [f64; 4]) -> RenderEncoder<'_> {
        self.commands.push(GpuCommand::Clear {
            target: target.clone(),
            color: clear_color,
        });
        RenderEncoder {
            buffer: self,
            target: target.clone(),
        }
    }

    /// Runs `handler` once the GPU has finished this buffer.
    pub fn add_completed_handler(&mut self, handler: impl FnOnce() + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Schedules `drawable` for display.
    pub fn present(&mut self, drawable: Drawable) {
        self.commands.push(GpuCommand::Present {
            drawable,
            min_duration: None,
        });
    }

    /// Schedules `drawable` for display, keeping the previous image up for
    /// at least `duration`.
    pub fn present_after_minimum_duration(&mut self, drawable: Drawable, duration: Duration) {
        self.commands.push(GpuCommand::Present {
            drawable,
            min_duration: Some(duration),
        });
    }

    /// Splits into commands and handlers. Called by backends at commit.
    #[must_use]
    pub fn into_parts(self) -> (Vec<GpuCommand>, Vec<CompletedHandler>) {
        (self.commands, self.handlers)
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("label", &self.label)
            .field("commands", &self.commands)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Draw recorder bound to one render target.
pub struct RenderEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    target: Texture,
}

impl RenderEncoder<'_> {
    /// Render target of this pass.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Texture {
        &self.target
    }

    /// Draws `source_rect` of `source` into `viewport`.
    pub fn draw_texture(
        &mut self,
        source: &Texture,
        source_rect: IntRect,
        viewport: IntRect,
        flip_vertically: bool,
        filter: FilterMode,
    ) {
        self.buffer.commands.push(GpuCommand::Draw(DrawPass {
            source: source.clone(),
            source_rect,
            target: self.target.clone(),
            viewport,
            flip_vertically,
            filter,
        }));
    }

    /// Ends the pass.
    pub fn end_encoding(self) {}
}
