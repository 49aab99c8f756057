//! Decoded camera frames handed to the renderer.

use std::sync::Arc;

/// Pixel layout of a decoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One decoded frame. Pixels are tightly packed rows, top row first.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
    pub format: PixelFormat,
}

impl VideoFrame {
    /// Whether the pixel buffer holds exactly width * height pixels.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Pixels expanded to RGBA8 (alpha 255 for RGB input).
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba8 => self.pixels.to_vec(),
            PixelFormat::Rgb8 => {
                let mut out = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for px in self.pixels.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                out
            }
        }
    }
}

/// Camera stream as seen by the render loop.
pub trait VideoSource: Send {
    /// Liveness of the stream. A disconnected source makes the next frame background-only.
    fn connected(&self) -> bool;

    /// Newest decoded frame, if one arrived since the last call.
    fn latest_frame(&mut self) -> Option<VideoFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_expands_to_opaque_rgba() {
        let frame = VideoFrame {
            width: 2,
            height: 1,
            pixels: Arc::from(vec![1u8, 2, 3, 4, 5, 6]),
            format: PixelFormat::Rgb8,
        };
        assert!(frame.is_well_formed());
        assert_eq!(frame.to_rgba8(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn short_buffer_is_not_well_formed() {
        let frame = VideoFrame {
            width: 4,
            height: 4,
            pixels: Arc::from(vec![0u8; 10]),
            format: PixelFormat::Rgba8,
        };
        assert!(!frame.is_well_formed());
    }
}
