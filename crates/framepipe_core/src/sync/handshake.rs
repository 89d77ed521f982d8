//! # Alternate Thread Handshake
//!
//! Keeps a core's private render thread in lockstep with presentation while
//! FPS limiting is on.
//!
//! ## Protocol
//!
//! ```text
//!  presentation                         core render thread
//!  ────────────                         ──────────────────
//!  signal_core_may_proceed()  ─────┐
//!  (core executes)                 └──► draw, flush
//!  wait_for_core_frame()      ◄──────── core_frame_finished()
//!  present                               (blocks for next grant)
//! ```
//!
//! The two signals are binary. A grant is only issued once the previous
//! frame's "present may proceed" has been consumed, so the core is never
//! more than one frame ahead and no signal is ever merged into another.
//!
//! ## Limiting Off
//!
//! Both sides bypass the handshake entirely. Any thread blocked at the
//! moment limiting is turned off is woken and told it was bypassed.
//! Turning limiting back on starts a new cycle in `WaitingForCore` with
//! both signals cleared.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Which side the handshake is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// The core owns the turn and is drawing.
    WaitingForCore,
    /// The core finished a frame and waits for presentation.
    WaitingForPresent,
}

/// How a handshake wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The awaited signal arrived.
    Proceed,
    /// Limiting is off, or was toggled during the wait.
    Bypassed,
    /// The bounded wait expired without a signal.
    TimedOut,
}

/// Counters for verifying the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeStats {
    /// Frames reported finished by the core thread.
    pub frames_produced: u64,
    /// Frames reported while limiting was off.
    pub frames_bypassed: u64,
    /// "Present may proceed" signals raised.
    pub signals_raised: u64,
    /// "Present may proceed" signals consumed by presentation.
    pub signals_observed: u64,
    /// Raised signals cleared by a limiting toggle before being consumed.
    pub signals_discarded: u64,
    /// "Core may proceed" grants issued.
    pub grants_issued: u64,
    /// Handshake cycles started (initial one included when limiting).
    pub cycles_started: u64,
}

struct HandshakeInner {
    limiting: bool,
    state: HandshakeState,
    core_may_proceed: bool,
    present_may_proceed: bool,
    cycle: u64,
    stats: HandshakeStats,
}

/// Two binary semaphores forming a single-producer/single-consumer
/// handshake between the core render thread and presentation.
pub struct AlternateThreadSync {
    inner: Mutex<HandshakeInner>,
    core_signal: Condvar,
    present_signal: Condvar,
}

impl AlternateThreadSync {
    /// Creates the handshake with FPS limiting initially `limiting`.
    #[must_use]
    pub fn new(limiting: bool) -> Self {
        Self {
            inner: Mutex::new(HandshakeInner {
                limiting,
                state: HandshakeState::WaitingForCore,
                core_may_proceed: false,
                present_may_proceed: false,
                cycle: 0,
                stats: HandshakeStats {
                    cycles_started: u64::from(limiting),
                    ..HandshakeStats::default()
                },
            }),
            core_signal: Condvar::new(),
            present_signal: Condvar::new(),
        }
    }

    /// True while the handshake is active.
    #[must_use]
    pub fn is_limiting(&self) -> bool {
        self.inner.lock().limiting
    }

    /// Current turn.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.inner.lock().state
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> HandshakeStats {
        self.inner.lock().stats
    }

    /// Turns FPS limiting on or off. Returns true if the setting changed.
    ///
    /// Either direction clears both signals and wakes every waiter.
    pub fn set_limiting(&self, enabled: bool) -> bool {
        let mut inner = self.inner.lock();
        if inner.limiting == enabled {
            return false;
        }

        if inner.present_may_proceed {
            inner.stats.signals_discarded += 1;
        }
        inner.limiting = enabled;
        inner.core_may_proceed = false;
        inner.present_may_proceed = false;
        inner.state = HandshakeState::WaitingForCore;
        inner.cycle += 1;
        if enabled {
            inner.stats.cycles_started += 1;
        }
        let cycle = inner.cycle;
        drop(inner);

        self.core_signal.notify_all();
        self.present_signal.notify_all();
        tracing::debug!(
            target: "framepipe::renderer",
            "FPS limiting {} (handshake cycle {cycle})",
            if enabled { "resumed" } else { "suspended" }
        );
        true
    }

    // =========================================================================
    // Presentation side
    // =========================================================================

    /// Lets the core draw its next frame.
    ///
    /// A grant is only issued when the core is parked and its previous frame
    /// has been consumed; otherwise this is a no-op. Returns true if a grant
    /// was issued.
    pub fn signal_core_may_proceed(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.limiting
            || inner.state != HandshakeState::WaitingForPresent
            || inner.present_may_proceed
        {
            return false;
        }

        inner.core_may_proceed = true;
        inner.state = HandshakeState::WaitingForCore;
        inner.stats.grants_issued += 1;
        drop(inner);

        self.core_signal.notify_one();
        true
    }

    /// Waits up to `timeout` for the core to finish a frame.
    pub fn wait_for_core_frame(&self, timeout: Duration) -> HandshakeOutcome {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        if !inner.limiting {
            return HandshakeOutcome::Bypassed;
        }

        let cycle = inner.cycle;
        while !inner.present_may_proceed && inner.limiting && inner.cycle == cycle {
            if self
                .present_signal
                .wait_until(&mut inner, deadline)
                .timed_out()
            {
                break;
            }
        }

        if inner.cycle != cycle || !inner.limiting {
            HandshakeOutcome::Bypassed
        } else if inner.present_may_proceed {
            inner.present_may_proceed = false;
            inner.stats.signals_observed += 1;
            HandshakeOutcome::Proceed
        } else {
            HandshakeOutcome::TimedOut
        }
    }

    // =========================================================================
    // Core render thread side
    // =========================================================================

    /// Reports a finished (and flushed) frame, then parks until presentation
    /// grants the next one.
    ///
    /// Returns immediately with [`HandshakeOutcome::Bypassed`] while
    /// limiting is off.
    pub fn core_frame_finished(&self) -> HandshakeOutcome {
        let mut inner = self.inner.lock();
        inner.stats.frames_produced += 1;
        if !inner.limiting {
            inner.stats.frames_bypassed += 1;
            return HandshakeOutcome::Bypassed;
        }

        debug_assert!(
            !inner.present_may_proceed,
            "core finished a frame without a grant"
        );
        inner.present_may_proceed = true;
        inner.state = HandshakeState::WaitingForPresent;
        inner.stats.signals_raised += 1;
        self.present_signal.notify_one();

        let cycle = inner.cycle;
        while !inner.core_may_proceed && inner.limiting && inner.cycle == cycle {
            self.core_signal.wait(&mut inner);
        }

        if inner.core_may_proceed && inner.cycle == cycle {
            inner.core_may_proceed = false;
            HandshakeOutcome::Proceed
        } else {
            HandshakeOutcome::Bypassed
        }
    }
}

impl Drop for AlternateThreadSync {
    fn drop(&mut self) {
        let stats = self.inner.get_mut().stats;
        tracing::trace!(
            target: "framepipe::renderer",
            "handshake retired: {} frames, {} signals observed",
            stats.frames_produced,
            stats.signals_observed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_bypassed_when_not_limiting() {
        let sync = AlternateThreadSync::new(false);
        assert_eq!(sync.core_frame_finished(), HandshakeOutcome::Bypassed);
        assert_eq!(sync.wait_for_core_frame(WAIT), HandshakeOutcome::Bypassed);
        assert!(!sync.signal_core_may_proceed());

        let stats = sync.stats();
        assert_eq!(stats.frames_bypassed, 1);
        assert_eq!(stats.signals_raised, 0);
    }

    #[test]
    fn test_first_grant_waits_for_first_frame() {
        let sync = AlternateThreadSync::new(true);
        assert_eq!(sync.state(), HandshakeState::WaitingForCore);
        // Core has not finished anything yet: nothing to grant.
        assert!(!sync.signal_core_may_proceed());
    }

    #[test]
    fn test_wait_times_out_without_core() {
        let sync = AlternateThreadSync::new(true);
        let outcome = sync.wait_for_core_frame(Duration::from_millis(5));
        assert_eq!(outcome, HandshakeOutcome::TimedOut);
    }

    #[test]
    fn test_lockstep_frames() {
        let sync = Arc::new(AlternateThreadSync::new(true));
        let frames = 50;

        let core = {
            let sync = Arc::clone(&sync);
            thread::spawn(move || {
                for _ in 0..frames {
                    sync.core_frame_finished();
                }
            })
        };

        for _ in 0..frames {
            sync.signal_core_may_proceed();
            assert_eq!(sync.wait_for_core_frame(WAIT), HandshakeOutcome::Proceed);
        }
        // Release the core from its final park.
        assert!(sync.signal_core_may_proceed());
        core.join().unwrap();

        let stats = sync.stats();
        assert_eq!(stats.frames_produced, frames);
        assert_eq!(stats.signals_raised, frames);
        assert_eq!(stats.signals_observed, frames);
        assert_eq!(stats.signals_discarded, 0);
    }

    #[test]
    fn test_suspend_wakes_parked_core() {
        let sync = Arc::new(AlternateThreadSync::new(true));

        let core = {
            let sync = Arc::clone(&sync);
            thread::spawn(move || sync.core_frame_finished())
        };

        assert_eq!(sync.wait_for_core_frame(WAIT), HandshakeOutcome::Proceed);
        assert!(sync.set_limiting(false));
        assert_eq!(core.join().unwrap(), HandshakeOutcome::Bypassed);
        assert!(!sync.is_limiting());
    }

    #[test]
    fn test_resume_starts_fresh_cycle() {
        let sync = AlternateThreadSync::new(true);
        assert!(sync.set_limiting(false));
        assert!(!sync.set_limiting(false));
        assert!(sync.set_limiting(true));

        assert_eq!(sync.state(), HandshakeState::WaitingForCore);
        assert_eq!(sync.stats().cycles_started, 2);
        assert!(!sync.signal_core_may_proceed());
    }
}
