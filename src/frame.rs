//! Decoded video frame with an owned RGB pixel buffer
//!
//! **Why**: The decode thread must hand frames across threads without
//! aliasing the decoder's internal buffers, so every frame owns a copy of
//! its pixels taken before publication.
//!
//! **Used by**: Decode loop (producer), frame channel (hand-off),
//! presentation side (consumer)

/// Bytes per pixel for the fixed presentation format (RGB8).
pub const BYTES_PER_PIXEL: usize = 3;

/// Single decoded frame.
///
/// Pixels are 3-channel RGB, one byte per channel, row-major, no padding
/// between rows. `index` is the source frame count, monotonically increasing
/// within one stream. Immutable once published; ownership transfers to
/// whoever takes it from the frame channel.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: u64,
}

impl VideoFrame {
    /// Create a frame from an owned RGB8 buffer.
    ///
    /// Returns `None` if the buffer length does not match `width * height * 3`.
    pub fn from_rgb8(data: Vec<u8>, width: u32, height: u32, index: u64) -> Option<Self> {
        if data.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            index,
        })
    }

    /// Create a solid-color frame (synthetic sources, tests).
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for px in data.chunks_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source frame index (0-based).
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Raw RGB8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Memory size in bytes.
    pub fn mem(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: Frame construction from a matching buffer
    /// Validates: Dimensions and index are preserved
    #[test]
    fn test_from_rgb8() {
        let frame = VideoFrame::from_rgb8(vec![0u8; 4 * 2 * 3], 4, 2, 7).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.mem(), 24);
    }

    /// Test: Mismatched buffer length is rejected
    /// Validates: No silently truncated or padded frames
    #[test]
    fn test_from_rgb8_bad_len() {
        assert!(VideoFrame::from_rgb8(vec![0u8; 10], 4, 2, 0).is_none());
    }

    /// Test: Solid frame fills every pixel
    /// Validates: Synthetic constructor produces the fixed RGB8 layout
    #[test]
    fn test_solid() {
        let frame = VideoFrame::solid(2, 2, [10, 20, 30], 0);
        assert_eq!(frame.data().len(), 2 * 2 * 3);
        for px in frame.data().chunks(3) {
            assert_eq!(px, &[10, 20, 30]);
        }
    }
}
