//! Decode source contract - the boundary to the demux/decode layer
//!
//! **Why**: The playback engine only needs sequential frame reads, a seek,
//! and a frame rate; everything behind that (containers, codecs, processes)
//! stays opaque. Keeping the boundary a trait lets tests drive the engine
//! with a scripted source instead of real media.
//!
//! **Used by**: Player (decode loop + open/restart/close), ffmpeg source,
//! scripted test source

use crate::frame::VideoFrame;

/// Errors raised at the decode-source boundary.
///
/// `Open` is recoverable locally (the engine stays closed and the caller may
/// retry with another path). `Decode` mid-stream is deliberately not
/// distinguished from end-of-stream by the engine. `Seek` leaves the engine
/// state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open source: {0}")]
    Open(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("seek failed: {0}")]
    Seek(String),
}

/// Opaque provider of ordered frames for one media stream.
///
/// Implementations are owned exclusively by one engine and are accessed by
/// at most one thread at a time (the engine's mutex enforces this).
pub trait VideoSource: Send {
    /// Read the next frame in source order.
    ///
    /// `Ok(None)` signals end of stream. Implementations must keep returning
    /// `Ok(None)` (not an error) on reads past the end.
    fn read(&mut self) -> Result<Option<VideoFrame>, SourceError>;

    /// Reposition so the next `read` returns `frame_index`.
    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError>;

    /// Native frame rate, if the container reports one.
    ///
    /// `None` or a non-positive value means unavailable; the engine then
    /// falls back to a default pacing interval.
    fn frame_rate(&self) -> Option<f64>;

    /// Release underlying resources. Idempotent; reads after close return
    /// end of stream.
    fn close(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted source shared by player and deck tests.

    use super::*;

    /// Deterministic in-memory source: `total` tiny frames at `fps`.
    pub struct ScriptedSource {
        pub total: u64,
        pub fps: f64,
        pub pos: u64,
        pub fail_seek: bool,
        pub fail_read_at: Option<u64>,
        pub closed: bool,
    }

    impl ScriptedSource {
        pub fn new(total: u64, fps: f64) -> Self {
            Self {
                total,
                fps,
                pos: 0,
                fail_seek: false,
                fail_read_at: None,
                closed: false,
            }
        }
    }

    impl VideoSource for ScriptedSource {
        fn read(&mut self) -> Result<Option<VideoFrame>, SourceError> {
            if self.closed || self.pos >= self.total {
                return Ok(None);
            }
            if self.fail_read_at == Some(self.pos) {
                self.pos += 1;
                return Err(SourceError::Decode("scripted failure".into()));
            }
            let index = self.pos;
            self.pos += 1;
            Ok(Some(VideoFrame::solid(4, 4, [index as u8, 0, 0], index)))
        }

        fn seek(&mut self, frame_index: u64) -> Result<(), SourceError> {
            if self.fail_seek {
                return Err(SourceError::Seek("scripted failure".into()));
            }
            self.pos = frame_index.min(self.total);
            Ok(())
        }

        fn frame_rate(&self) -> Option<f64> {
            (self.fps > 0.0).then_some(self.fps)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn test_scripted_source_exhausts() {
        let mut src = ScriptedSource::new(2, 10.0);
        assert_eq!(src.read().unwrap().unwrap().index(), 0);
        assert_eq!(src.read().unwrap().unwrap().index(), 1);
        assert!(src.read().unwrap().is_none());
        // Stays at end-of-stream, not an error
        assert!(src.read().unwrap().is_none());

        src.seek(0).unwrap();
        assert_eq!(src.read().unwrap().unwrap().index(), 0);
    }
}
