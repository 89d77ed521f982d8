//! # Upload Ring
//!
//! Fixed set of staging buffers handed out round-robin, so that converting
//! frame N+1 never overwrites the bytes frame N is still uploading from.

use std::fmt;

/// Round-robin staging buffers.
///
/// # Example
///
/// ```rust
/// use framepipe_core::UploadRing;
///
/// let mut ring = UploadRing::new(3);
/// let slot = ring.next_slot(1024);
/// assert_eq!(slot.len(), 1024);
/// ```
pub struct UploadRing {
    /// Staging storage, grown on demand and never shrunk.
    slots: Box<[Vec<u8>]>,
    /// Index of the slot handed out next.
    next: usize,
    /// Total slots handed out.
    handed_out: u64,
}

impl UploadRing {
    /// Creates a ring of `count` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    #[must_use]
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "Upload ring needs at least one slot");
        Self {
            slots: (0..count).map(|_| Vec::new()).collect(),
            next: 0,
            handed_out: 0,
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total slots handed out since creation.
    #[inline]
    #[must_use]
    pub const fn handed_out(&self) -> u64 {
        self.handed_out
    }

    /// Returns the next slot resized to exactly `len` bytes.
    ///
    /// Contents are whatever the slot held last time; callers overwrite.
    pub fn next_slot(&mut self, len: usize) -> &mut Vec<u8> {
        let index = self.next;
        self.next = (self.next + 1) % self.slots.len();
        self.handed_out += 1;

        let slot = &mut self.slots[index];
        slot.resize(len, 0);
        slot
    }
}

impl fmt::Debug for UploadRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRing")
            .field("capacity", &self.slots.len())
            .field("next", &self.next)
            .field("handed_out", &self.handed_out)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let mut ring = UploadRing::new(3);
        let first = ring.next_slot(4).as_ptr();
        ring.next_slot(4);
        ring.next_slot(4);
        let fourth = ring.next_slot(4).as_ptr();

        assert_eq!(first, fourth);
        assert_eq!(ring.handed_out(), 4);
    }

    #[test]
    fn test_slot_resizes() {
        let mut ring = UploadRing::new(1);
        assert_eq!(ring.next_slot(16).len(), 16);
        assert_eq!(ring.next_slot(8).len(), 8);
    }

    #[test]
    #[should_panic(expected = "Upload ring needs at least one slot")]
    fn test_zero_capacity_panics() {
        let _ = UploadRing::new(0);
    }
}
