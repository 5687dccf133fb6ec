//! The frame extraction loop.
//!
//! Each run walks the source from time zero at a fixed step, capturing one
//! frame per seek. Every seek is bounded by a deadline so a stalled decoder
//! fails the run instead of hanging it. Extraction is all-or-nothing: a
//! failure anywhere discards the frames captured so far.

use crate::backend::VideoSource;
use crate::surface::CaptureSurface;
use sortiq_core::frame::{CapturedFrame, FrameBuffer};
use sortiq_core::{SortiqError, SortiqResult, VideoConfig};
use std::sync::Arc;
use std::time::Duration;

/// Progress callback. Values are on the canonical `[0, 1]` scale,
/// monotonically non-decreasing, with the terminal value guaranteed on
/// success. UI layers convert to percentages at the boundary.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Per-call overrides for one extraction run.
#[derive(Clone, Default)]
pub struct ExtractOptions {
    /// Overrides the instance `VideoConfig` rate for this call only.
    pub frames_per_second: Option<f64>,
    /// Overrides the instance frame cap for this call only.
    pub max_frames: Option<u32>,
    pub on_progress: Option<ProgressFn>,
}

/// Observable state of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingMetadata,
    Seeking(u32),
    Captured(u32),
    Finished,
    /// Absorbing state, reachable from any step.
    Errored,
}

/// Drives a capture surface through the seek loop.
///
/// One extractor instance per analysis run; callers construct a fresh one
/// per video rather than reusing state. Dropping the returned future does
/// not release the surface; the owner must call [`FrameExtractor::cleanup`].
pub struct FrameExtractor {
    surface: CaptureSurface,
    config: VideoConfig,
    state: RunState,
}

impl FrameExtractor {
    pub fn new(surface: CaptureSurface, config: VideoConfig) -> Self {
        Self {
            surface,
            config,
            state: RunState::Idle,
        }
    }

    /// Initialize the underlying capture surface. Idempotent.
    pub fn initialize(&mut self) -> SortiqResult<()> {
        self.surface.initialize()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Extract frames from `source` at the configured rate.
    ///
    /// Fails with an initialization error when the surface has not been
    /// initialized, and with an extraction error when the source's duration
    /// exceeds the configured maximum, in both cases without capturing
    /// anything. On any failure the source handle is released and no
    /// partial frame list is returned.
    pub async fn extract_frames(
        &mut self,
        source: &VideoSource,
        options: &ExtractOptions,
    ) -> SortiqResult<Vec<CapturedFrame>> {
        if !self.surface.is_initialized() {
            return Err(SortiqError::initialization(
                "capture surface not initialized; call initialize() first",
            ));
        }

        let fps = options.frames_per_second.unwrap_or(self.config.frame_rate);
        if fps <= 0.0 {
            return Err(SortiqError::invalid_input(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        let cap = options.max_frames.or(self.config.max_frames);

        self.state = RunState::AwaitingMetadata;
        let meta = match self.surface.backend_mut().open(source).await {
            Ok(meta) => meta,
            Err(e) => return self.fail(e).await,
        };

        if meta.duration_secs > self.config.max_duration_secs {
            return self
                .fail(SortiqError::extraction(format!(
                    "video duration {:.1}s exceeds maximum {:.1}s",
                    meta.duration_secs, self.config.max_duration_secs
                )))
                .await;
        }

        tracing::debug!(
            source = %source.describe(),
            duration_secs = meta.duration_secs,
            fps,
            max_frames = ?cap,
            "starting extraction run"
        );

        let expected = expected_frames(meta.duration_secs, fps, cap);
        let deadline = Duration::from_millis(self.config.seek_timeout_ms);
        let step = 1.0 / fps;
        let mut frames: Vec<CapturedFrame> = Vec::new();
        let mut current_time = 0.0f64;

        while current_time < meta.duration_secs
            && cap.map_or(true, |c| (frames.len() as u32) < c)
        {
            let index = frames.len() as u32;
            self.state = RunState::Seeking(index);

            let seek = tokio::time::timeout(
                deadline,
                self.surface.backend_mut().seek_capture(current_time),
            )
            .await;

            let buffer = match seek {
                Ok(Ok(buffer)) => buffer,
                Ok(Err(e)) => return self.fail(e).await,
                Err(_) => {
                    return self
                        .fail(SortiqError::extraction(format!(
                            "seek to {:.3}s timed out after {}ms",
                            current_time, self.config.seek_timeout_ms
                        )))
                        .await
                }
            };

            let jpeg = match self.draw_and_encode(&buffer) {
                Ok(jpeg) => jpeg,
                Err(e) => return self.fail(e).await,
            };

            frames.push(CapturedFrame::new(
                jpeg,
                (current_time * 1000.0).round() as u64,
                index,
            ));
            self.state = RunState::Captured(index);

            if let Some(on_progress) = &options.on_progress {
                on_progress((frames.len() as f64 / expected as f64).min(1.0));
            }

            current_time += step;
        }

        // Release decoder resources on the success path too.
        if let Err(e) = self.surface.backend_mut().release().await {
            tracing::warn!(error = %e, "source release failed after extraction");
        }

        self.state = RunState::Finished;
        if let Some(on_progress) = &options.on_progress {
            on_progress(1.0);
        }
        tracing::info!(frames = frames.len(), "extraction run finished");
        Ok(frames)
    }

    /// Release the surface. Safe to call multiple times and from any state.
    pub async fn cleanup(&mut self) {
        self.surface.cleanup().await;
        self.state = RunState::Idle;
    }

    fn draw_and_encode(&mut self, buffer: &FrameBuffer) -> SortiqResult<Vec<u8>> {
        let draw = self.surface.draw_mut();
        draw.draw(buffer)?;
        draw.encode_jpeg()
    }

    async fn fail(&mut self, err: SortiqError) -> SortiqResult<Vec<CapturedFrame>> {
        tracing::warn!(error = %err, "extraction run failed");
        self.state = RunState::Errored;
        self.surface.cleanup().await;
        Err(err)
    }
}

/// Frames a run is expected to yield, for progress scaling.
fn expected_frames(duration_secs: f64, fps: f64, cap: Option<u32>) -> u32 {
    let by_duration = (duration_secs * fps).ceil() as u32;
    cap.map_or(by_duration, |c| by_duration.min(c)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FakeVideoBackend;
    use crate::surface::FakeDrawSurface;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn extractor_for(backend: FakeVideoBackend, config: VideoConfig) -> FrameExtractor {
        let surface = CaptureSurface::new(Box::new(backend), Box::new(FakeDrawSurface::new()));
        FrameExtractor::new(surface, config)
    }

    fn uncapped_config() -> VideoConfig {
        VideoConfig {
            max_frames: None,
            ..VideoConfig::default()
        }
    }

    #[tokio::test]
    async fn test_ten_second_source_yields_ten_frames() {
        let backend = FakeVideoBackend::new(10.0);
        let mut extractor = extractor_for(backend, uncapped_config());
        extractor.initialize().unwrap();

        let progress: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&progress);
        let options = ExtractOptions {
            frames_per_second: Some(1.0),
            max_frames: None,
            on_progress: Some(Arc::new(move |p| sink.lock().unwrap().push(p))),
        };

        let frames = extractor
            .extract_frames(&VideoSource::Url("clip".into()), &options)
            .await
            .unwrap();

        assert_eq!(frames.len(), 10);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i as u32);
            assert_eq!(frame.timestamp_ms, (i as u64) * 1000);
        }
        assert_eq!(extractor.state(), RunState::Finished);

        let seen = progress.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress must not decrease");
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increasing_at_higher_rate() {
        let backend = FakeVideoBackend::new(3.0);
        let mut extractor = extractor_for(backend, uncapped_config());
        extractor.initialize().unwrap();

        let options = ExtractOptions {
            frames_per_second: Some(4.0),
            ..Default::default()
        };
        let frames = extractor
            .extract_frames(&VideoSource::Url("clip".into()), &options)
            .await
            .unwrap();

        assert_eq!(frames.len(), 12);
        assert!(frames.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        assert!(frames.iter().enumerate().all(|(i, f)| f.index == i as u32));
    }

    #[tokio::test]
    async fn test_max_frames_caps_the_run() {
        let backend = FakeVideoBackend::new(30.0);
        let mut extractor = extractor_for(backend, uncapped_config());
        extractor.initialize().unwrap();

        let options = ExtractOptions {
            frames_per_second: Some(1.0),
            max_frames: Some(5),
            ..Default::default()
        };
        let frames = extractor
            .extract_frames(&VideoSource::Url("clip".into()), &options)
            .await
            .unwrap();
        assert_eq!(frames.len(), 5);
    }

    #[tokio::test]
    async fn test_uninitialized_surface_is_rejected() {
        let backend = FakeVideoBackend::new(5.0);
        let mut extractor = extractor_for(backend, uncapped_config());

        let err = extractor
            .extract_frames(&VideoSource::Url("clip".into()), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sortiq_core::ErrorKind::Initialization);
    }

    #[tokio::test]
    async fn test_over_long_source_fails_before_any_capture() {
        let backend = FakeVideoBackend::new(120.0);
        let release = backend.release_probe();
        let seeks = backend.seek_probe();
        let mut config = uncapped_config();
        config.max_duration_secs = 60.0;
        let mut extractor = extractor_for(backend, config);
        extractor.initialize().unwrap();

        let err = extractor
            .extract_frames(&VideoSource::Url("long".into()), &ExtractOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), sortiq_core::ErrorKind::Extraction);
        assert_eq!(seeks.load(Ordering::SeqCst), 0, "no frame may be captured");
        assert!(release.load(Ordering::SeqCst) >= 1, "source must be released");
        assert_eq!(extractor.state(), RunState::Errored);
    }

    #[tokio::test]
    async fn test_slow_seek_hits_the_deadline() {
        let backend =
            FakeVideoBackend::new(5.0).with_seek_delay(Duration::from_millis(100));
        let mut config = uncapped_config();
        config.seek_timeout_ms = 10;
        let mut extractor = extractor_for(backend, config);
        extractor.initialize().unwrap();

        let err = extractor
            .extract_frames(&VideoSource::Url("stalled".into()), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sortiq_core::ErrorKind::Extraction);
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_mid_run_decode_failure_discards_partial_frames() {
        let backend = FakeVideoBackend::new(10.0).with_failing_seeks(vec![3]);
        let release = backend.release_probe();
        let mut extractor = extractor_for(backend, uncapped_config());
        extractor.initialize().unwrap();

        let options = ExtractOptions {
            frames_per_second: Some(1.0),
            ..Default::default()
        };
        let result = extractor
            .extract_frames(&VideoSource::Url("flaky".into()), &options)
            .await;

        assert!(result.is_err(), "partial runs must not return frames");
        assert!(release.load(Ordering::SeqCst) >= 1);
        assert_eq!(extractor.state(), RunState::Errored);
    }

    #[test]
    fn test_expected_frames_bounds() {
        assert_eq!(expected_frames(10.0, 1.0, None), 10);
        assert_eq!(expected_frames(10.3, 1.0, None), 11);
        assert_eq!(expected_frames(30.0, 1.0, Some(5)), 5);
        assert_eq!(expected_frames(0.0, 1.0, None), 1);
    }
}
