//! # Headless Backend
//!
//! Software implementations of every seam the pipeline needs: a GPU device
//! with a swapchain, a legacy context and a scriptable core. Deterministic
//! in manual completion mode.

pub mod device;
pub mod legacy;
pub mod raster;
pub mod simulated;

pub use device::{CompletionMode, HeadlessConfig, HeadlessCounters, HeadlessDevice, PresentedFrame};
pub use legacy::HeadlessLegacyContext;
pub use simulated::SimulatedCore;
