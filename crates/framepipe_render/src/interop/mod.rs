//! Cross-API texture interop: a shared surface and the bridge that keeps
//! both API views of it consistent across resizes.

pub mod bridge;
pub mod surface;

pub use bridge::{InteropTextureBridge, InteropTextures};
pub use surface::FrameSurface;
