//! QUADPLAY - Concurrent multi-stream video playback engine
//!
//! Re-exports all modules for use by binary targets.

pub mod channel;
pub mod cli;
pub mod deck;
pub mod events;
pub mod ffmpeg;
pub mod frame;
pub mod player;
pub mod source;

// Re-export commonly used types
pub use channel::{FrameReceiver, FrameSender, frame_channel};
pub use deck::Deck;
pub use events::{ChannelObserver, PlayerEvent, PlayerObserver};
pub use frame::VideoFrame;
pub use player::{Player, PlayerState};
pub use source::{SourceError, VideoSource};
