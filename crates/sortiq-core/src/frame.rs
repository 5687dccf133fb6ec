use serde::{Deserialize, Serialize};

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
    /// 8-bit RGB (3 bytes per pixel, no alpha).
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A decoded video frame as a raw pixel buffer.
///
/// This is the in-memory working representation between the video backend
/// and the capture surface; it is never what the pipeline hands to
/// classifiers (that is the JPEG-encoded [`CapturedFrame`]).
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (opaque black for RGB).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create an RGBA frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                self.data[offset + 3],
            ]),
            PixelFormat::Rgb8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                255,
            ]),
        }
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => {
                self.data[offset..offset + 4].copy_from_slice(&rgba);
            }
            PixelFormat::Rgb8 => {
                self.data[offset..offset + 3].copy_from_slice(&rgba[..3]);
            }
        }
    }
}

/// One still image captured from a video at a specific timestamp.
///
/// Immutable once created. `index` is the ordinal position in the capture
/// sequence, contiguous from 0; `timestamp_ms` is milliseconds from the
/// start of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// JPEG-encoded image bytes at the working resolution.
    pub jpeg: Vec<u8>,
    /// Milliseconds from the start of the source video.
    pub timestamp_ms: u64,
    /// Zero-based ordinal position in the capture sequence.
    pub index: u32,
}

impl CapturedFrame {
    pub fn new(jpeg: Vec<u8>, timestamp_ms: u64, index: u32) -> Self {
        Self {
            jpeg,
            timestamp_ms,
            index,
        }
    }

    /// Timestamp as fractional seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(640, 480, PixelFormat::Rgba8);
        assert_eq!(fb.byte_size(), 640 * 480 * 4);
        assert_eq!(fb.pixel_count(), 640 * 480);
    }

    #[test]
    fn test_frame_buffer_solid() {
        let fb = FrameBuffer::solid(2, 2, [10, 20, 30, 255]);
        assert_eq!(fb.get_pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_frame_buffer_get_set_pixel() {
        let mut fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
    }

    #[test]
    fn test_frame_buffer_out_of_bounds() {
        let fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_rgb_pixel_reads_opaque() {
        let mut fb = FrameBuffer::new(4, 4, PixelFormat::Rgb8);
        fb.set_pixel(0, 0, [9, 8, 7, 42]);
        // Alpha is not stored for Rgb8; reads are always opaque.
        assert_eq!(fb.get_pixel(0, 0), Some([9, 8, 7, 255]));
    }

    #[test]
    fn test_captured_frame_timestamp() {
        let frame = CapturedFrame::new(vec![0xff, 0xd8], 2500, 3);
        assert_eq!(frame.index, 3);
        assert!((frame.timestamp_secs() - 2.5).abs() < f64::EPSILON);
    }
}
