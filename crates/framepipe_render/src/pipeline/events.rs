//! # Display Events
//!
//! Notifications from the coordinator to whoever owns the core and the
//! display layer.
//!
//! ```text
//! coordinator ──try_send──► [bounded channel] ──► DisplayEventReceiver (UI / core owner)
//!                 │
//!                 └─ channel full: event dropped, counted
//! ```
//!
//! Publishing never blocks the emulation thread.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use framepipe_shared::{IntRect, IntSize};

/// Something the display side may need to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The core's visible rect or display aspect changed.
    ScreenSizeChanged {
        /// New visible rect.
        screen: IntRect,
        /// New display aspect.
        aspect: IntSize,
    },
    /// The core's buffer changed size and the pipeline was rebuilt.
    BufferResized {
        /// Previous buffer size.
        from: IntSize,
        /// New buffer size.
        to: IntSize,
    },
    /// The swapchain images changed size.
    DrawableSizeChanged(IntSize),
    /// A frame was dropped by backpressure.
    FrameSkipped {
        /// Skips in this session, this one included.
        total: u64,
    },
}

// ============================================================================
// EVENT CHANNEL
// ============================================================================

/// Sending half, owned by the coordinator.
#[derive(Debug)]
pub struct DisplayEventBus {
    sender: Sender<DisplayEvent>,
    receiver: Receiver<DisplayEvent>,
    dropped: AtomicU64,
}

impl DisplayEventBus {
    /// Creates a channel holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes without blocking. Returns false if the event was dropped.
    pub fn publish(&self, event: DisplayEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// A receiver for another thread. All receivers share one queue.
    #[must_use]
    pub fn subscribe(&self) -> DisplayEventReceiver {
        DisplayEventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Events dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Receiving half.
#[derive(Debug, Clone)]
pub struct DisplayEventReceiver {
    receiver: Receiver<DisplayEvent>,
}

impl DisplayEventReceiver {
    /// Next event, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<DisplayEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Every queued event, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<DisplayEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_order() {
        let bus = DisplayEventBus::new(8);
        let rx = bus.subscribe();
        assert!(bus.publish(DisplayEvent::DrawableSizeChanged(IntSize::new(640, 480))));
        assert!(bus.publish(DisplayEvent::FrameSkipped { total: 1 }));

        assert_eq!(
            rx.drain(),
            vec![
                DisplayEvent::DrawableSizeChanged(IntSize::new(640, 480)),
                DisplayEvent::FrameSkipped { total: 1 },
            ]
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = DisplayEventBus::new(1);
        assert!(bus.publish(DisplayEvent::FrameSkipped { total: 1 }));
        assert!(!bus.publish(DisplayEvent::FrameSkipped { total: 2 }));
        assert_eq!(bus.dropped(), 1);
        assert_eq!(
            bus.subscribe().try_recv(),
            Some(DisplayEvent::FrameSkipped { total: 1 })
        );
    }
}
