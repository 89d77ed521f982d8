//! # Pipeline Error Types
//!
//! Two classes of failure, told apart by [`PipelineError::severity`]:
//! - **Fatal**: a GPU resource could not be created. There is no degraded
//!   rendering path.
//! - **Recoverable**: the core handed over a frame the pipeline cannot use.
//!   The frame is skipped and counted.

use framepipe_shared::{IntRect, IntSize, PixelFormat, PixelType, RenderingApi};
use thiserror::Error;

/// Errors that can occur in the presentation pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A texture, cache, framebuffer, command buffer or buffer could not be created.
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        /// Kind of resource.
        resource: &'static str,
        /// Backend-provided detail.
        reason: String,
    },

    /// The core asked for a drawing API no renderer implements.
    #[error("rendering API {0:?} is not supported")]
    UnsupportedRenderingApi(RenderingApi),

    /// The core's pixel layout has no GPU texture format.
    #[error("pixel format {format:?} with type {pixel_type:?} is not supported")]
    UnsupportedPixelFormat {
        /// Reported channel layout.
        format: PixelFormat,
        /// Reported packing.
        pixel_type: PixelType,
    },

    /// The interop bridge has no textures (never built, or its rebuild failed).
    #[error("interop textures are unavailable")]
    InteropUnavailable,

    /// The core reported a zero-sized video buffer.
    #[error("core reported an empty video buffer ({0})")]
    EmptyBuffer(IntSize),

    /// The core's screen rect is empty or does not fit its buffer, or the
    /// buffer is larger than [`framepipe_shared::MAX_BUFFER_DIMENSION`].
    #[error("screen rect {screen} does not fit buffer {buffer}")]
    InvalidGeometry {
        /// Reported buffer size.
        buffer: IntSize,
        /// Reported screen rect.
        screen: IntRect,
    },

    /// The core's frame memory could not be read, or was too short.
    #[error("frame data unreadable: {0}")]
    UnreadableFrame(String),

    /// A buffer size change arrived while the renderer cannot follow it.
    #[error("renderer cannot change buffer size from {from} to {to}")]
    ResizeUnsupported {
        /// Size in effect.
        from: IntSize,
        /// Size requested by the core.
        to: IntSize,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// How the pipeline reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The pipeline cannot continue.
    Fatal,
    /// Skip the frame and carry on.
    Recoverable,
}

impl PipelineError {
    /// Shorthand for [`PipelineError::ResourceCreation`].
    #[must_use]
    pub fn resource(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceCreation {
            resource,
            reason: reason.into(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ResourceCreation { .. }
            | Self::UnsupportedRenderingApi(_)
            | Self::UnsupportedPixelFormat { .. }
            | Self::InteropUnavailable
            | Self::InvalidConfig(_) => ErrorSeverity::Fatal,
            Self::EmptyBuffer(_)
            | Self::InvalidGeometry { .. }
            | Self::UnreadableFrame(_)
            | Self::ResizeUnsupported { .. } => ErrorSeverity::Recoverable,
        }
    }

    /// True if the pipeline cannot continue.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Fatal)
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_failures_are_fatal() {
        assert!(PipelineError::resource("texture", "out of memory").is_fatal());
        assert!(PipelineError::UnsupportedRenderingApi(RenderingApi::Vulkan).is_fatal());
        assert!(PipelineError::InteropUnavailable.is_fatal());
    }

    #[test]
    fn test_core_data_failures_are_recoverable() {
        let err = PipelineError::InvalidGeometry {
            buffer: IntSize::new(256, 224),
            screen: IntRect::new(0, 0, 320, 224),
        };
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert!(!PipelineError::EmptyBuffer(IntSize::ZERO).is_fatal());
        assert!(!PipelineError::UnreadableFrame("short".into()).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = PipelineError::InvalidGeometry {
            buffer: IntSize::new(256, 224),
            screen: IntRect::new(8, 0, 256, 224),
        };
        assert_eq!(
            err.to_string(),
            "screen rect {8, 0, 256, 224} does not fit buffer 256x224"
        );
        assert_eq!(
            PipelineError::resource("texture", "oom").to_string(),
            "failed to create texture: oom"
        );
    }
}
