//! # Framepipe Core
//!
//! The primitives the presentation pipeline is built from:
//! - **PresentBudget**: at most one frame between CPU submit and GPU completion
//! - **FrameSkipCounter**: diagnostics for frames dropped by backpressure
//! - **AlternateThreadSync**: lockstep between a core's render thread and presentation
//! - **SharedPixelBuffer**: one block of pixels visible to two graphics APIs
//!
//! ## Architecture Rules
//!
//! 1. **The frame path never blocks** - budget admission is a single CAS
//! 2. **Ownership encodes release** - a dropped permit is a released permit
//! 3. **Buffers are replaced, never resized** - dimensions are immutable per allocation
//!
//! ## Example
//!
//! ```rust
//! use framepipe_core::{FrameSkipCounter, PresentBudget};
//!
//! let budget = PresentBudget::new();
//! let skips = FrameSkipCounter::new();
//!
//! let permit = budget.try_acquire().expect("budget starts with one slot");
//! if budget.try_acquire().is_none() {
//!     skips.record();
//! }
//! drop(permit);
//! assert_eq!(skips.total(), 1);
//! assert_eq!(budget.available(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{SharedPixelBuffer, UploadRing, WeakPixelBuffer};
pub use sync::{
    AlternateThreadSync, BudgetStats, FrameSkipCounter, HandshakeOutcome, HandshakeState,
    HandshakeStats, InFlightPermit, PresentBudget,
};
