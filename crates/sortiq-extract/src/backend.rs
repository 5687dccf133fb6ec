use async_trait::async_trait;
use sortiq_core::frame::FrameBuffer;
use sortiq_core::{SortiqError, SortiqResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where a video comes from.
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// A file on disk.
    Path(PathBuf),
    /// A remote reference the backend knows how to fetch.
    Url(String),
    /// In-memory bytes (e.g. an upload). The backend owns any temporary
    /// storage it creates for these and must release it on `release()`.
    Bytes(Vec<u8>),
}

impl VideoSource {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            VideoSource::Path(p) => p.display().to_string(),
            VideoSource::Url(u) => u.clone(),
            VideoSource::Bytes(b) => format!("<{} in-memory bytes>", b.len()),
        }
    }
}

/// Metadata about an opened video source.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Frame rate (fps).
    pub fps: f64,
}

/// A seekable video decode capability.
///
/// One backend instance is exclusively owned by one extractor at a time;
/// it is never shared across concurrent extraction runs.
#[async_trait]
pub trait VideoBackend: Send {
    /// Open a source and wait for its metadata.
    async fn open(&mut self, source: &VideoSource) -> SortiqResult<VideoMetadata>;

    /// Seek to a timestamp and return the decoded frame there.
    ///
    /// The extractor bounds each call with its seek deadline; backends do
    /// not need their own watchdog.
    async fn seek_capture(&mut self, timestamp_secs: f64) -> SortiqResult<FrameBuffer>;

    /// Release the source handle and any temporary storage.
    ///
    /// Must be safe to call repeatedly and when nothing is open.
    async fn release(&mut self) -> SortiqResult<()>;
}

/// Deterministic in-memory backend for tests.
///
/// Produces solid-color frames whose red channel encodes the seek second,
/// so captured output is verifiable without a decoder.
pub struct FakeVideoBackend {
    duration_secs: f64,
    seek_delay: Duration,
    /// Seek indices (0-based, in call order) that fail with an extraction error.
    fail_on_seek: Vec<u32>,
    fail_open: bool,
    seeks: Arc<AtomicU32>,
    open: bool,
    released: Arc<AtomicU32>,
}

impl FakeVideoBackend {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            seek_delay: Duration::ZERO,
            fail_on_seek: Vec::new(),
            fail_open: false,
            seeks: Arc::new(AtomicU32::new(0)),
            open: false,
            released: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Delay every seek by this much (for exercising the seek deadline).
    pub fn with_seek_delay(mut self, delay: Duration) -> Self {
        self.seek_delay = delay;
        self
    }

    pub fn with_failing_seeks(mut self, indices: Vec<u32>) -> Self {
        self.fail_on_seek = indices;
        self
    }

    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Shared release counter, observable after the backend is boxed away.
    pub fn release_probe(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.released)
    }

    /// Shared seek counter, observable after the backend is boxed away.
    pub fn seek_probe(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.seeks)
    }

    /// Number of times `release` has been called.
    pub fn release_count(&self) -> u32 {
        self.released.load(Ordering::SeqCst)
    }

    pub fn seek_count(&self) -> u32 {
        self.seeks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoBackend for FakeVideoBackend {
    async fn open(&mut self, source: &VideoSource) -> SortiqResult<VideoMetadata> {
        if self.fail_open {
            return Err(SortiqError::Loading(format!(
                "could not load source {}",
                source.describe()
            )));
        }
        self.open = true;
        Ok(VideoMetadata {
            width: 320,
            height: 240,
            duration_secs: self.duration_secs,
            fps: 30.0,
        })
    }

    async fn seek_capture(&mut self, timestamp_secs: f64) -> SortiqResult<FrameBuffer> {
        if !self.open {
            return Err(SortiqError::initialization("no source open"));
        }
        let index = self.seeks.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_seek.contains(&index) {
            return Err(SortiqError::extraction(format!(
                "decode failed at {:.3}s",
                timestamp_secs
            )));
        }
        if !self.seek_delay.is_zero() {
            tokio::time::sleep(self.seek_delay).await;
        }

        let shade = (timestamp_secs as u32 % 256) as u8;
        Ok(FrameBuffer::solid(320, 240, [shade, 64, 128, 255]))
    }

    async fn release(&mut self) -> SortiqResult<()> {
        self.open = false;
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
