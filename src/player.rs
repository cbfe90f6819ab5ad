//! Per-stream playback engine with a dedicated decode thread
//!
//! **Why**: Each opened stream advances at its own native rate, so each
//! engine owns one OS thread that pulls frames from its source, paces them,
//! and publishes through the frame channel. Transport controls (open, play,
//! pause, restart, close) come from the control thread; the consumer drains
//! frames from its own thread.
//!
//! **Used by**: Deck (group transport), CLI harness, presentation layer
//!
//! # Synchronization
//!
//! One mutex per engine guards the bound source, its cached frame rate, and
//! the display name; it is held for the duration of a source interaction
//! only, never across a pacing sleep. Play/stop signaling goes through
//! atomics, so the control thread never waits on the decode loop. These
//! flags are advisory: the loop observes them at iteration granularity, not
//! in real time.
//!
//! # Decode loop
//!
//! Exit on the stop flag; idle-sleep 100ms while not Playing; otherwise read
//! one frame under the mutex, notify the observer, publish, then sleep one
//! frame interval. End of stream (and mid-stream decode failure, which this
//! layer cannot tell apart) pauses the engine and raises one finished event;
//! the thread stays alive so `restart` can resume it. All sleeps are chunked
//! with stop-flag re-checks, which bounds shutdown latency.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::channel::{FrameReceiver, FrameSender, frame_channel};
use crate::events::PlayerObserver;
use crate::ffmpeg::FfmpegSource;
use crate::frame::VideoFrame;
use crate::source::{SourceError, VideoSource};

/// Backoff while the decode thread is alive but not advancing.
pub const IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Pacing interval when the source reports no usable frame rate (25 fps).
pub const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// Max single sleep; keeps stop-flag latency bounded.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Transport state of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayerState {
    /// No source bound (initial, and after `close`).
    #[default]
    Closed = 0,
    /// Source bound, not advancing.
    Opened = 1,
    /// Decode thread advancing and emitting frames.
    Playing = 2,
    /// Thread alive, not advancing.
    Paused = 3,
}

impl PlayerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PlayerState::Opened,
            2 => PlayerState::Playing,
            3 => PlayerState::Paused,
            _ => PlayerState::Closed,
        }
    }
}

/// Atomic cell holding a [`PlayerState`].
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(PlayerState::Closed as u8))
    }

    fn load(&self) -> PlayerState {
        PlayerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: PlayerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Atomic `from` -> `to`; false if the state moved in the meantime.
    fn transition(&self, from: PlayerState, to: PlayerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Mutex-guarded per-engine media state.
struct Media {
    source: Option<Box<dyn VideoSource>>,
    /// Frame rate cached at open time; pacing copies it under the same lock
    /// as each read, so a rebind re-paces from the next frame on.
    fps: Option<f64>,
    name: String,
}

struct Shared {
    media: Mutex<Media>,
    state: StateCell,
    stop: AtomicBool,
    observer: Mutex<Option<Arc<dyn PlayerObserver>>>,
    sender: FrameSender<VideoFrame>,
}

impl Shared {
    /// Invoke the registered observer, if any. The lock is held only to
    /// clone the Arc, never across the callback.
    fn notify(&self, f: impl FnOnce(&dyn PlayerObserver)) {
        let obs = self.observer.lock().expect("observer lock").clone();
        if let Some(obs) = obs {
            f(obs.as_ref());
        }
    }
}

/// One playback engine bound to at most one decode source.
///
/// All operations take `&self`, so the engine can be shared between a
/// coordinator and a presentation layer through one handle. Dropping the
/// engine joins its decode thread before releasing the source.
pub struct Player {
    id: u64,
    shared: Arc<Shared>,
    frames: FrameReceiver<VideoFrame>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    /// Create an empty (Closed) engine.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        let (sender, frames) = frame_channel();
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            shared: Arc::new(Shared {
                media: Mutex::new(Media {
                    source: None,
                    fps: None,
                    name: String::new(),
                }),
                state: StateCell::new(),
                stop: AtomicBool::new(false),
                observer: Mutex::new(None),
                sender,
            }),
            frames,
            handle: Mutex::new(None),
        }
    }

    /// Register the observer receiving this engine's events.
    pub fn set_observer(&self, observer: Arc<dyn PlayerObserver>) {
        *self.shared.observer.lock().expect("observer lock") = Some(observer);
    }

    /// Consumer end of this engine's frame channel.
    pub fn frames(&self) -> FrameReceiver<VideoFrame> {
        self.frames.clone()
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state.load()
    }

    /// Display name derived from the source path (empty while Closed).
    pub fn display_name(&self) -> String {
        self.shared.media.lock().expect("media lock").name.clone()
    }

    /// Bind an ffmpeg-backed source to `path`.
    ///
    /// Any previously bound source is closed first, so a rebind never leaks.
    /// On failure the engine is fully closed (decode thread joined, source
    /// released) and exactly one `error_occurred` is raised; the caller may
    /// retry with a different path.
    pub fn open(&self, path: &Path) -> Result<(), SourceError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match FfmpegSource::open(path) {
            Ok(source) => {
                self.bind(Box::new(source), name);
                Ok(())
            }
            Err(e) => {
                self.close();
                warn!("player {}: open {} failed: {e}", self.id, path.display());
                self.shared.notify(|o| o.error_occurred(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Bind an already-constructed source (alternate implementations, tests).
    pub fn open_source(&self, source: Box<dyn VideoSource>, name: impl Into<String>) {
        self.bind(source, name.into());
    }

    fn bind(&self, source: Box<dyn VideoSource>, name: String) {
        let mut media = self.shared.media.lock().expect("media lock");
        if let Some(mut old) = media.source.take() {
            debug!("player {}: closing previous source", self.id);
            old.close();
        }
        media.fps = source.frame_rate();
        media.name = name;
        media.source = Some(source);
        drop(media);

        self.shared.state.store(PlayerState::Opened);
        debug!("player {}: opened \"{}\"", self.id, self.display_name());
    }

    /// Release any bound source and return to Closed.
    fn unbind(&self) {
        let mut media = self.shared.media.lock().expect("media lock");
        if let Some(mut old) = media.source.take() {
            old.close();
        }
        media.fps = None;
        media.name.clear();
        drop(media);
        self.shared.state.store(PlayerState::Closed);
    }

    /// Start or resume playback. No-op when Closed or already Playing.
    pub fn play(&self) {
        match self.state() {
            PlayerState::Closed | PlayerState::Playing => return,
            PlayerState::Opened | PlayerState::Paused => {}
        }
        if self.ensure_thread() {
            self.shared.state.store(PlayerState::Playing);
            debug!("player {}: playing", self.id);
        }
    }

    /// Pause playback. No-op unless Playing; the decode thread stays alive
    /// in its idle loop.
    pub fn pause(&self) {
        if self
            .shared
            .state
            .transition(PlayerState::Playing, PlayerState::Paused)
        {
            debug!("player {}: paused", self.id);
        }
    }

    /// Seek back to the first frame and resume immediately. No-op when
    /// Closed; a seek failure raises `error_occurred` and leaves the state
    /// unchanged.
    pub fn restart(&self) {
        if self.state() == PlayerState::Closed {
            return;
        }

        {
            let mut media = self.shared.media.lock().expect("media lock");
            let Some(source) = media.source.as_mut() else {
                return;
            };
            if let Err(e) = source.seek(0) {
                warn!("player {}: restart failed: {e}", self.id);
                drop(media);
                self.shared.notify(|o| o.error_occurred(&e.to_string()));
                return;
            }
        }

        if self.ensure_thread() {
            self.shared.state.store(PlayerState::Playing);
            debug!("player {}: restarted", self.id);
        }
    }

    /// Stop the decode thread, release the source, return to Closed.
    ///
    /// The join is bounded: the loop's sleeps are chunked, so the thread
    /// observes the stop flag within roughly one idle interval. The engine
    /// can be reopened afterwards.
    pub fn close(&self) {
        self.shared.stop.store(true, Ordering::Release);

        let handle = self.handle.lock().expect("handle lock").take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("player {}: decode thread panicked", self.id);
        }

        self.unbind();
        self.shared.stop.store(false, Ordering::Release);
        debug!("player {}: closed", self.id);
    }

    /// Spawn the decode thread if none exists. A spawn failure is fatal to
    /// this engine only; it is reported through the observer.
    fn ensure_thread(&self) -> bool {
        let mut handle = self.handle.lock().expect("handle lock");
        if handle.is_some() {
            return true;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("quadplay-decode-{}", self.id))
            .spawn(move || decode_loop(&shared));

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                true
            }
            Err(e) => {
                warn!("player {}: failed to spawn decode thread: {e}", self.id);
                self.shared
                    .notify(|o| o.error_occurred(&format!("failed to start decode thread: {e}")));
                false
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.close();
    }
}

/// Outcome of one read step, computed under the media lock.
enum Step {
    Frame(VideoFrame, Option<f64>),
    Finished,
    Idle,
}

fn decode_loop(shared: &Shared) {
    debug!("decode thread started");

    while !shared.stop.load(Ordering::Acquire) {
        if shared.state.load() != PlayerState::Playing {
            sleep_interruptible(IDLE_INTERVAL, &shared.stop);
            continue;
        }

        // Read one frame under the mutex; the lock is released before the
        // observer call, the publish, and the pacing sleep.
        let step = {
            let mut media = shared.media.lock().expect("media lock");
            let fps = media.fps;
            match media.source.as_mut() {
                None => Step::Idle,
                Some(source) => match source.read() {
                    Ok(Some(frame)) => Step::Frame(frame, fps),
                    Ok(None) => Step::Finished,
                    Err(e) => {
                        // Not distinguishable from a legitimate stream end
                        // at this layer; treated the same.
                        warn!("decode error treated as end of stream: {e}");
                        Step::Finished
                    }
                },
            }
        };

        match step {
            Step::Frame(frame, fps) => {
                shared.notify(|o| o.frame_ready(&frame));
                shared.sender.publish(frame);
                sleep_interruptible(frame_interval(fps), &shared.stop);
            }
            Step::Finished => {
                // Pause and raise finished exactly once; a concurrent
                // transport command that already moved the state wins.
                if shared
                    .state
                    .transition(PlayerState::Playing, PlayerState::Paused)
                {
                    debug!("playback finished");
                    shared.notify(|o| o.playback_finished());
                }
            }
            Step::Idle => sleep_interruptible(IDLE_INTERVAL, &shared.stop),
        }
    }

    debug!("decode thread stopped");
}

fn frame_interval(fps: Option<f64>) -> Duration {
    match fps {
        Some(f) if f > 0.0 => Duration::from_secs_f64(1.0 / f),
        _ => FALLBACK_FRAME_INTERVAL,
    }
}

/// Sleep up to `total`, re-checking the stop flag every [`SLEEP_SLICE`].
fn sleep_interruptible(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while remaining > Duration::ZERO && !stop.load(Ordering::Acquire) {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
