//! # Present Budget
//!
//! A one-slot counting semaphore that bounds GPU submissions to a single
//! frame in flight.
//!
//! The slot is taken with a non-blocking CAS on the frame path and handed
//! back by dropping the [`InFlightPermit`]. The permit is moved into the
//! GPU completion handler of the submitted frame, so release happens on
//! completion; every early return on the frame path drops the permit
//! instead, which releases immediately.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared state behind a budget and its permits.
struct BudgetState {
    /// Free slots, always 0 or 1.
    available: AtomicU8,
    /// Successful acquisitions.
    acquired: AtomicU64,
    /// Failed acquisitions.
    rejected: AtomicU64,
    /// Releases (permit drops).
    released: AtomicU64,
}

/// Admission control for GPU submissions. Cloning shares the slot.
#[derive(Clone)]
pub struct PresentBudget {
    state: Arc<BudgetState>,
}

/// Counters describing budget traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetStats {
    /// Successful try-acquires.
    pub acquired: u64,
    /// Try-acquires that found the slot taken.
    pub rejected: u64,
    /// Permits returned.
    pub released: u64,
}

impl PresentBudget {
    /// Creates a budget with its single slot free.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(BudgetState {
                available: AtomicU8::new(1),
                acquired: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        }
    }

    /// Takes the slot without blocking.
    ///
    /// Returns `None` if a frame is already in flight.
    #[inline]
    #[must_use]
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        match self
            .state
            .available
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.state.acquired.fetch_add(1, Ordering::Relaxed);
                Some(InFlightPermit {
                    state: Arc::clone(&self.state),
                })
            }
            Err(_) => {
                self.state.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Current slot count (0 or 1).
    #[inline]
    #[must_use]
    pub fn available(&self) -> u8 {
        self.state.available.load(Ordering::Acquire)
    }

    /// True while a permit is outstanding.
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.available() == 0
    }

    /// Snapshot of the traffic counters.
    #[must_use]
    pub fn stats(&self) -> BudgetStats {
        BudgetStats {
            acquired: self.state.acquired.load(Ordering::Relaxed),
            rejected: self.state.rejected.load(Ordering::Relaxed),
            released: self.state.released.load(Ordering::Relaxed),
        }
    }
}

impl Default for PresentBudget {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PresentBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentBudget")
            .field("available", &self.available())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Proof that the holder owns the single in-flight slot.
///
/// Dropping the permit releases the slot. There is no other way to
/// release, so a slot can never be returned twice.
#[must_use = "dropping the permit releases the present budget immediately"]
pub struct InFlightPermit {
    state: Arc<BudgetState>,
}

impl InFlightPermit {
    /// Releases the slot. Equivalent to dropping the permit.
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let previous = self.state.available.swap(1, Ordering::AcqRel);
        debug_assert_eq!(previous, 0, "present budget released while already free");
        self.state.released.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for InFlightPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightPermit").finish_non_exhaustive()
    }
}
