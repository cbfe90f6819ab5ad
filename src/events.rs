//! Player event surface - observer callbacks from the decode thread
//!
//! **Why**: Engine-local failures and end-of-playback must reach the
//! controlling layer without exceptions crossing thread boundaries and
//! without the decode thread blocking on whoever listens. Observers run on
//! the decode thread, so implementations must stay cheap and non-blocking.
//!
//! **Used by**: Player (emission), CLI harness and tests (ChannelObserver)

use crossbeam_channel::Sender;

use crate::frame::VideoFrame;

/// Notification raised by one engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A frame was decoded and published. Carries the source index only;
    /// pixels travel through the frame channel.
    FrameReady { index: u64 },
    /// End of stream (or an undistinguishable mid-stream decode failure);
    /// the engine paused itself.
    Finished,
    /// Engine-local error (open failure, seek failure, thread spawn).
    Error(String),
}

/// Observer registered with a player. All methods default to no-ops so
/// implementations override only what they need.
///
/// Callbacks are invoked from the engine's decode thread (or the control
/// thread for open/seek errors) and must not block.
pub trait PlayerObserver: Send + Sync {
    fn frame_ready(&self, _frame: &VideoFrame) {}
    fn playback_finished(&self) {}
    fn error_occurred(&self, _reason: &str) {}
}

/// Observer that forwards events into a crossbeam channel.
///
/// Lets a consumer poll events from its own loop instead of handling them
/// on the decode thread. Sends are non-blocking (unbounded channel) and a
/// disconnected receiver is ignored.
pub struct ChannelObserver {
    tx: Sender<PlayerEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        Self { tx }
    }
}

impl PlayerObserver for ChannelObserver {
    fn frame_ready(&self, frame: &VideoFrame) {
        let _ = self.tx.send(PlayerEvent::FrameReady {
            index: frame.index(),
        });
    }

    fn playback_finished(&self) {
        let _ = self.tx.send(PlayerEvent::Finished);
    }

    fn error_occurred(&self, reason: &str) {
        let _ = self.tx.send(PlayerEvent::Error(reason.to_string()));
    }
}
