//! FFmpeg-backed video source (subprocess, no native bindings)
//!
//! **Why**: Decoding goes through the system `ffmpeg`/`ffprobe` binaries:
//! `ffprobe` reports dimensions and frame rate at open, then a single
//! `ffmpeg -f rawvideo -pix_fmt rgb24` child streams packed RGB frames over
//! a pipe. Sequential reads are one `read_exact` per frame; seeking respawns
//! the child at the target offset.
//!
//! **Used by**: Player::open (default source), CLI harness

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::OnceLock;

use log::debug;

use crate::frame::{BYTES_PER_PIXEL, VideoFrame};
use crate::source::{SourceError, VideoSource};

/// Check if ffmpeg/ffprobe are available on the system. Cached per process.
pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("ffprobe")
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

/// Stream metadata from ffprobe.
#[derive(Debug, Clone)]
struct StreamInfo {
    width: u32,
    height: u32,
    fps: Option<f64>,
}

fn probe(path: &Path) -> Result<StreamInfo, SourceError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| SourceError::Open(format!("ffprobe failed to execute: {e}")))?;

    if !output.status.success() {
        return Err(SourceError::Open(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| SourceError::Open(format!("bad ffprobe output: {e}")))?;

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| SourceError::Open("no streams in ffprobe output".into()))?;

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| SourceError::Open("no video stream found".into()))?;

    let width = video["width"]
        .as_u64()
        .ok_or_else(|| SourceError::Open("missing width".into()))? as u32;
    let height = video["height"]
        .as_u64()
        .ok_or_else(|| SourceError::Open("missing height".into()))? as u32;
    if width == 0 || height == 0 {
        return Err(SourceError::Open("zero-sized video stream".into()));
    }

    let fps = video["r_frame_rate"].as_str().and_then(parse_frame_rate);

    Ok(StreamInfo { width, height, fps })
}

/// Parse an ffprobe rate string ("30000/1001" or "25"). None if unusable.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.parse().ok()?;
        let d: f64 = den.parse().ok()?;
        if d > 0.0 { n / d } else { return None }
    } else {
        rate.parse().ok()?
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Sequential RGB24 frame reader over an ffmpeg child process.
#[derive(Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    info: StreamInfo,
    child: Option<(Child, ChildStdout)>,
    next_index: u64,
}

impl FfmpegSource {
    /// Probe `path` and start decoding at frame 0.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let info = probe(path)?;
        debug!(
            "ffmpeg source opened: {} ({}x{} @ {:?} fps)",
            path.display(),
            info.width,
            info.height,
            info.fps
        );
        let mut source = Self {
            path: path.to_path_buf(),
            info,
            child: None,
            next_index: 0,
        };
        source.spawn_at(0)?;
        Ok(source)
    }

    fn kill_child(&mut self) {
        if let Some((mut child, stdout)) = self.child.take() {
            drop(stdout);
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// (Re)spawn the decoder child positioned at `frame_index`.
    fn spawn_at(&mut self, frame_index: u64) -> Result<(), SourceError> {
        self.kill_child();

        let mut cmd = Command::new("ffmpeg");
        if frame_index > 0 {
            // -ss before -i for container-level seek; frame index maps to
            // seconds through the probed rate.
            let fps = self
                .info
                .fps
                .ok_or_else(|| SourceError::Seek("frame rate unavailable".into()))?;
            cmd.arg("-ss").arg(format!("{:.6}", frame_index as f64 / fps));
        }
        cmd.arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-v", "quiet", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| SourceError::Open(format!("failed to spawn ffmpeg: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Open("ffmpeg: no stdout pipe".into()))?;

        self.child = Some((child, stdout));
        self.next_index = frame_index;
        Ok(())
    }

    fn frame_size(&self) -> usize {
        self.info.width as usize * self.info.height as usize * BYTES_PER_PIXEL
    }
}

impl VideoSource for FfmpegSource {
    fn read(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        let frame_size = self.frame_size();
        let Some((_, stdout)) = self.child.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; frame_size];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {
                let index = self.next_index;
                self.next_index += 1;
                let frame = VideoFrame::from_rgb8(buf, self.info.width, self.info.height, index)
                    .ok_or_else(|| SourceError::Decode("frame size mismatch".into()))?;
                Ok(Some(frame))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Pipe drained: clean end of stream. Reap the child so it
                // does not linger as a zombie.
                self.kill_child();
                Ok(None)
            }
            Err(e) => {
                self.kill_child();
                Err(SourceError::Decode(e.to_string()))
            }
        }
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), SourceError> {
        self.spawn_at(frame_index).map_err(|e| match e {
            SourceError::Seek(msg) => SourceError::Seek(msg),
            other => SourceError::Seek(other.to_string()),
        })
    }

    fn frame_rate(&self) -> Option<f64> {
        self.info.fps
    }

    fn close(&mut self) {
        self.kill_child();
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: Frame rate string parsing
    /// Validates: Rational and plain rates, rejection of degenerate values
    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);

        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    /// Test: Opening a nonexistent path fails with Open
    /// Validates: Probe failure maps to the recoverable error class
    #[test]
    fn test_open_missing_file() {
        if !ffmpeg_available() {
            eprintln!("ffprobe not installed, skipping");
            return;
        }
        let err = FfmpegSource::open(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, SourceError::Open(_)));
    }
}
