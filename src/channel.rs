//! Single-slot overwrite channel for frame hand-off.
//!
//! The decode thread publishes the most recent frame; the presentation
//! thread drains on its own schedule. A new frame replaces any unread one,
//! so the producer never stalls on a slow consumer — the cost is dropped
//! frames, which is acceptable for live display.
//!
//! The critical section is a single short mutex lock on either side;
//! neither side ever blocks waiting for the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct Slot<T> {
    value: Mutex<Option<T>>,
    /// Fast-path flag so the consumer can poll without taking the lock.
    pending: AtomicBool,
}

/// Producer end of the frame channel.
pub struct FrameSender<T> {
    slot: Arc<Slot<T>>,
}

/// Consumer end of the frame channel.
///
/// The receiver is `Clone` so it can be handed to render callbacks.
pub struct FrameReceiver<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for FrameReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> FrameSender<T> {
    /// Publish a value, replacing any previously unread one.
    ///
    /// Never blocks on the consumer; returns the dropped value if one was
    /// pending (callers mostly ignore it).
    pub fn publish(&self, value: T) -> Option<T> {
        let dropped = self.slot.value.lock().expect("frame slot lock").replace(value);
        self.slot.pending.store(true, Ordering::Release);
        dropped
    }
}

impl<T> FrameReceiver<T> {
    /// Take the latest pending value, if any.
    pub fn try_take(&self) -> Option<T> {
        if !self.slot.pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        self.slot.value.lock().expect("frame slot lock").take()
    }

    /// True if a value is waiting to be taken.
    pub fn has_pending(&self) -> bool {
        self.slot.pending.load(Ordering::Acquire)
    }
}

/// Create a connected sender/receiver pair.
pub fn frame_channel<T>() -> (FrameSender<T>, FrameReceiver<T>) {
    let slot = Arc::new(Slot {
        value: Mutex::new(None),
        pending: AtomicBool::new(false),
    });
    (
        FrameSender {
            slot: Arc::clone(&slot),
        },
        FrameReceiver { slot },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_basic() {
        let (tx, rx) = frame_channel::<i32>();

        assert!(!rx.has_pending());
        assert_eq!(rx.try_take(), None);

        tx.publish(42);
        assert!(rx.has_pending());
        assert_eq!(rx.try_take(), Some(42));

        // Empty again after take
        assert!(!rx.has_pending());
        assert_eq!(rx.try_take(), None);
    }

    #[test]
    fn test_channel_overwrites_unread() {
        let (tx, rx) = frame_channel::<i32>();

        assert_eq!(tx.publish(1), None);
        assert_eq!(tx.publish(2), Some(1));
        assert_eq!(tx.publish(3), Some(2));

        // Only the latest value survives
        assert_eq!(rx.try_take(), Some(3));
        assert_eq!(rx.try_take(), None);
    }

    #[test]
    fn test_channel_cross_thread() {
        let (tx, rx) = frame_channel::<u64>();

        let producer = std::thread::spawn(move || {
            for i in 0..100u64 {
                tx.publish(i);
            }
        });
        producer.join().unwrap();

        // After the producer finished, exactly the last value is pending
        assert_eq!(rx.try_take(), Some(99));
        assert_eq!(rx.try_take(), None);
    }
}
