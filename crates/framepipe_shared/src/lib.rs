//! # Framepipe Shared
//!
//! Plain data exchanged between an emulation core, the presentation
//! pipeline and the display layer.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER know about:
//! - texture formats or GPU handles
//! - command buffers or swapchains
//!
//! If you need graphics types, put them in `framepipe_render`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod pixel;

pub use constants::{
    preferred_frames_per_second, DEFAULT_FRAMES_PER_SECOND, INTEROP_BYTES_PER_PIXEL,
    MAX_BUFFER_DIMENSION, MIN_SUPPORTED_FRAME_INTERVAL, UPLOAD_RING_SIZE,
};
pub use geometry::{Bounds, IntPoint, IntRect, IntSize};
pub use pixel::{PixelFormat, PixelType, RenderingApi};
