//! # Presentation Pipeline
//!
//! The coordinator and what it reports back.
//!
//! ```text
//! core thread ──► PresentationCoordinator ──► GpuDevice ──► display layer
//!                     │          ▲                │
//!                     │          └── permit ◄─────┘ (GPU completion)
//!                     └──► DisplayEventBus ──► UI / core owner
//! ```

pub mod coordinator;
pub mod events;
pub mod frame;
pub mod stats;

pub use coordinator::PresentationCoordinator;
pub use events::{DisplayEvent, DisplayEventBus, DisplayEventReceiver};
pub use frame::{CapturedImage, FrameOutcome, SkipReason};
pub use stats::{FrameRateMeter, PresentStats};
