//! # GPU Abstraction
//!
//! The two graphics APIs the pipeline bridges, as traits:
//!
//! ```text
//! ┌────────────────────┐                   ┌────────────────────┐
//! │   LegacyContext    │                   │     GpuDevice      │
//! │  (core draws here) │                   │ (pipeline presents)│
//! └─────────┬──────────┘                   └─────────┬──────────┘
//!           │ Texture (Legacy)       Texture (Modern) │
//!           └──────────► SharedPixelBuffer ◄──────────┘
//! ```

pub mod command;
pub mod device;
pub mod legacy;
pub mod texture;

pub use command::{CommandBuffer, CompletedHandler, DrawPass, GpuCommand, RenderEncoder};
pub use device::{Drawable, DrawableRelease, GpuDevice};
pub use legacy::{Framebuffer, LegacyContext};
pub use texture::{
    GraphicsApi, Texture, TextureDescriptor, TextureFormat, TextureStorage, TextureUsage,
};
