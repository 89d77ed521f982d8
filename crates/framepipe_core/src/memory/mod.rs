//! # Frame Memory
//!
//! Backing stores that outlive any single GPU handle:
//! - `SharedPixelBuffer`: CPU/GPU shared pixels, aliased by texture handles
//! - `UploadRing`: staging buffers recycled across frames

mod pixel_buffer;
mod upload_ring;

pub use pixel_buffer::{SharedPixelBuffer, WeakPixelBuffer};
pub use upload_ring::UploadRing;
