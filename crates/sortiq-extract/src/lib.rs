//! # sortiq-extract
//!
//! Frame extraction for the Sortiq engine: seeks through a video source at
//! a configured rate and yields a bounded, ordered sequence of JPEG-encoded
//! frames with timestamps.
//! The video backend and the drawing surface are both injected capabilities,
//! so the whole loop runs against deterministic fakes in tests.

pub mod backend;
pub mod extractor;
pub mod ffmpeg;
pub mod surface;

pub use backend::{FakeVideoBackend, VideoBackend, VideoMetadata, VideoSource};
pub use extractor::{ExtractOptions, FrameExtractor, ProgressFn, RunState};
pub use ffmpeg::FfmpegBackend;
pub use surface::{CaptureSurface, DrawSurface, FakeDrawSurface, ImageSurface};
