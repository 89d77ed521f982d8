//! # Framepipe Render
//!
//! Takes the frames an emulation core produces and puts them on screen.
//!
//! ```text
//! ┌──────────────┐   pixels / legacy FBO   ┌──────────────┐   texture   ┌─────────────┐
//! │ Emulation    │ ──────────────────────► │  Renderer    │ ──────────► │ FilterChain │
//! │ core         │                         │ (3 variants) │             └──────┬──────┘
//! └──────────────┘                         └──────┬───────┘                    │
//!                                                 │ InteropTextureBridge       │ final pass
//!                                                 ▼                            ▼
//!                                          SharedPixelBuffer           swapchain drawable
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **One frame in flight** - excess core frames are dropped and counted, never queued
//! 2. **Resource failures are fatal** - see [`FatalErrorPolicy`]
//! 3. **Bad frames are skips** - recoverable errors never leave `did_execute_frame`
//! 4. **Explicit contexts** - every legacy call receives the context it draws with
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use framepipe_render::headless::{HeadlessConfig, HeadlessDevice, SimulatedCore};
//! use framepipe_render::{
//!     FatalErrorPolicy, PassthroughFilterChain, PipelineConfig, PresentationCoordinator,
//! };
//! use framepipe_shared::{IntSize, RenderingApi};
//!
//! let device = Arc::new(HeadlessDevice::new(HeadlessConfig::default()));
//! let core = Arc::new(SimulatedCore::new(IntSize::new(256, 224), RenderingApi::Video2D));
//! let config = PipelineConfig::default().with_fatal_policy(FatalErrorPolicy::Propagate);
//!
//! let mut coordinator = PresentationCoordinator::new(
//!     config,
//!     device,
//!     None,
//!     core,
//!     Box::new(PassthroughFilterChain::default()),
//! )?;
//!
//! coordinator.will_execute_frame();
//! assert!(coordinator.did_execute_frame()?.is_presented());
//! # Ok::<(), framepipe_render::PipelineError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod core_video;
pub mod error;
pub mod filter;
pub mod gpu;
pub mod headless;
pub mod interop;
pub mod pipeline;
pub mod renderer;

pub use config::{EffectsMode, FatalErrorPolicy, FilterMode, PipelineConfig};
pub use core_video::{CoreVideoSource, CoreVideoState};
pub use error::{ErrorSeverity, PipelineError, PipelineResult};
pub use filter::{FilterChain, FrameDirection, PassthroughFilterChain};
pub use gpu::{GpuDevice, LegacyContext, Texture, TextureFormat};
pub use interop::{FrameSurface, InteropTextureBridge};
pub use pipeline::{
    CapturedImage, DisplayEvent, DisplayEventReceiver, FrameOutcome, PresentStats,
    PresentationCoordinator, SkipReason,
};
pub use renderer::{Renderer, RendererKind, RenderThreadHandle};
