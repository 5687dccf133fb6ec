use crate::backend::VideoBackend;
use sortiq_core::frame::{FrameBuffer, PixelFormat};
use sortiq_core::{SortiqError, SortiqResult};
use std::io::Cursor;

/// Working resolution every captured frame is scaled to before encoding.
pub const WORKING_WIDTH: u32 = 640;
pub const WORKING_HEIGHT: u32 = 480;

const JPEG_QUALITY: u8 = 80;

/// A 2D drawing capability at the working resolution.
///
/// Two implementations: [`ImageSurface`] bound to the `image` crate, and
/// [`FakeDrawSurface`] for non-graphical tests. Selected by injection,
/// never by environment sniffing.
pub trait DrawSurface: Send {
    /// Allocate the working canvas. Idempotent.
    fn initialize(&mut self) -> SortiqResult<()>;

    /// Scale a decoded frame onto the working canvas.
    fn draw(&mut self, frame: &FrameBuffer) -> SortiqResult<()>;

    /// Read back the current canvas contents.
    fn read_pixels(&self) -> SortiqResult<FrameBuffer>;

    /// Encode the current canvas as JPEG bytes.
    fn encode_jpeg(&self) -> SortiqResult<Vec<u8>>;

    /// Drop the canvas. Safe to call repeatedly and before initialize.
    fn release(&mut self);
}

/// Real drawing surface backed by the `image` crate.
pub struct ImageSurface {
    canvas: Option<FrameBuffer>,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self { canvas: None }
    }

    fn canvas(&self) -> SortiqResult<&FrameBuffer> {
        self.canvas
            .as_ref()
            .ok_or_else(|| SortiqError::initialization("drawing surface not initialized"))
    }
}

impl Default for ImageSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSurface for ImageSurface {
    fn initialize(&mut self) -> SortiqResult<()> {
        if self.canvas.is_none() {
            self.canvas = Some(FrameBuffer::new(
                WORKING_WIDTH,
                WORKING_HEIGHT,
                PixelFormat::Rgba8,
            ));
        }
        Ok(())
    }

    fn draw(&mut self, frame: &FrameBuffer) -> SortiqResult<()> {
        let canvas = self
            .canvas
            .as_mut()
            .ok_or_else(|| SortiqError::initialization("drawing surface not initialized"))?;

        if frame.format != PixelFormat::Rgba8 {
            return Err(SortiqError::invalid_input("draw expects RGBA frames"));
        }

        if frame.width == canvas.width && frame.height == canvas.height {
            canvas.data.copy_from_slice(&frame.data);
            return Ok(());
        }

        let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| SortiqError::extraction("frame buffer size mismatch"))?;
        let resized = image::imageops::resize(
            &img,
            canvas.width,
            canvas.height,
            image::imageops::FilterType::Triangle,
        );
        canvas.data = resized.into_raw();
        Ok(())
    }

    fn read_pixels(&self) -> SortiqResult<FrameBuffer> {
        Ok(self.canvas()?.clone())
    }

    fn encode_jpeg(&self) -> SortiqResult<Vec<u8>> {
        let canvas = self.canvas()?;

        // JPEG has no alpha channel; strip it before encoding.
        let mut rgb = Vec::with_capacity(canvas.pixel_count() * 3);
        for chunk in canvas.data.chunks_exact(4) {
            rgb.extend_from_slice(&chunk[..3]);
        }

        let mut buffer = Cursor::new(Vec::new());
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        encoder
            .encode(
                &rgb,
                canvas.width,
                canvas.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| SortiqError::extraction(format!("JPEG encoding failed: {}", e)))?;
        Ok(buffer.into_inner())
    }

    fn release(&mut self) {
        self.canvas = None;
    }
}

/// No-op drawing surface for tests: counts draws, encodes a fixed marker.
pub struct FakeDrawSurface {
    fail_initialize: bool,
    initialized: bool,
    pub draw_calls: u32,
    last: Option<FrameBuffer>,
}

impl FakeDrawSurface {
    pub fn new() -> Self {
        Self {
            fail_initialize: false,
            initialized: false,
            draw_calls: 0,
            last: None,
        }
    }

    pub fn with_failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }
}

impl Default for FakeDrawSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSurface for FakeDrawSurface {
    fn initialize(&mut self) -> SortiqResult<()> {
        if self.fail_initialize {
            return Err(SortiqError::initialization(
                "drawing surface unsupported on this host",
            ));
        }
        self.initialized = true;
        Ok(())
    }

    fn draw(&mut self, frame: &FrameBuffer) -> SortiqResult<()> {
        if !self.initialized {
            return Err(SortiqError::initialization("drawing surface not initialized"));
        }
        self.draw_calls += 1;
        self.last = Some(frame.clone());
        Ok(())
    }

    fn read_pixels(&self) -> SortiqResult<FrameBuffer> {
        self.last
            .clone()
            .ok_or_else(|| SortiqError::extraction("nothing drawn yet"))
    }

    fn encode_jpeg(&self) -> SortiqResult<Vec<u8>> {
        // Encode the drawn frame's first pixel so tests can tell frames apart.
        let marker = self
            .last
            .as_ref()
            .and_then(|f| f.get_pixel(0, 0))
            .unwrap_or([0; 4]);
        Ok(vec![0xff, 0xd8, marker[0], marker[1], marker[2], 0xff, 0xd9])
    }

    fn release(&mut self) {
        self.initialized = false;
        self.last = None;
    }
}

/// Owns exactly one video backend and one drawing surface.
///
/// Pure resource holder: created uninitialized, canvas allocated on
/// [`CaptureSurface::initialize`], everything released on
/// [`CaptureSurface::cleanup`]. One surface belongs to one extractor; a new
/// analysis run should build a fresh one rather than reusing state.
pub struct CaptureSurface {
    backend: Box<dyn VideoBackend>,
    draw: Box<dyn DrawSurface>,
    initialized: bool,
}

impl CaptureSurface {
    pub fn new(backend: Box<dyn VideoBackend>, draw: Box<dyn DrawSurface>) -> Self {
        Self {
            backend,
            draw,
            initialized: false,
        }
    }

    /// Allocate the drawing canvas. Idempotent; on failure no partial state
    /// is retained.
    pub fn initialize(&mut self) -> SortiqResult<()> {
        if self.initialized {
            return Ok(());
        }
        match self.draw.initialize() {
            Ok(()) => {
                self.initialized = true;
                Ok(())
            }
            Err(e) => {
                self.draw.release();
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn backend_mut(&mut self) -> &mut dyn VideoBackend {
        self.backend.as_mut()
    }

    pub fn draw_mut(&mut self) -> &mut dyn DrawSurface {
        self.draw.as_mut()
    }

    /// Release the source and the canvas.
    ///
    /// Safe to call multiple times and from any state. Failures are logged
    /// as cleanup errors and never surfaced to the caller's flow.
    pub async fn cleanup(&mut self) {
        if let Err(e) = self.backend.release().await {
            tracing::warn!(error = %e, "video backend release failed during cleanup");
        }
        self.draw.release();
        self.initialized = false;
    }
}
