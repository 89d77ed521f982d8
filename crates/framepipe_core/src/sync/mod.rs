//! # Frame Synchronization
//!
//! ```text
//!   core thread                    GPU completion context
//!  ─────────────                   ──────────────────────
//!  try_acquire() ──► permit ──► moved into completion handler
//!       │ None                               │
//!       ▼                                    ▼
//!  FrameSkipCounter::record()          drop(permit) → slot free
//!
//!   presentation side              core render thread
//!  ───────────────────             ──────────────────
//!  signal_core_may_proceed() ────► (draw frame)
//!  wait_for_core_frame()     ◄──── core_frame_finished()
//! ```

mod handshake;
mod present_budget;
mod skip_counter;

pub use handshake::{AlternateThreadSync, HandshakeOutcome, HandshakeState, HandshakeStats};
pub use present_budget::{BudgetStats, InFlightPermit, PresentBudget};
pub use skip_counter::FrameSkipCounter;
