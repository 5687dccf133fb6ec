//! End-to-end video analysis.
//!
//! Wires extraction and classification together: capture frames from the
//! source, schedule them through the classifier in batches, aggregate into
//! a summary. Progress from both phases is mapped onto one `[0, 1]` scale,
//! extraction covering the first half and classification the second.

use crate::aggregate::aggregate;
use crate::batch::BatchScheduler;
use sortiq_classify::FrameClassifier;
use sortiq_core::{SortiqResult, VideoAnalysisResult, VideoConfig};
use sortiq_extract::extractor::{ExtractOptions, FrameExtractor, ProgressFn};
use sortiq_extract::surface::CaptureSurface;
use sortiq_extract::VideoSource;
use std::sync::Arc;

/// Per-call options for one analysis run.
#[derive(Clone, Default)]
pub struct AnalyzeOptions {
    pub frames_per_second: Option<f64>,
    pub max_frames: Option<u32>,
    /// Unified progress over both phases, on the `[0, 1]` scale.
    pub on_progress: Option<ProgressFn>,
}

/// Drives one video through the full pipeline.
///
/// One analyzer per run. The owner must call [`VideoAnalyzer::cleanup`]
/// when done; resources are not released implicitly on drop.
pub struct VideoAnalyzer {
    extractor: FrameExtractor,
    classifier: Arc<dyn FrameClassifier>,
    config: VideoConfig,
}

impl VideoAnalyzer {
    pub fn new(
        surface: CaptureSurface,
        classifier: Arc<dyn FrameClassifier>,
        config: VideoConfig,
    ) -> Self {
        Self {
            extractor: FrameExtractor::new(surface, config.clone()),
            classifier,
            config,
        }
    }

    /// Initialize the capture surface. Idempotent.
    pub fn initialize(&mut self) -> SortiqResult<()> {
        self.extractor.initialize()
    }

    /// Run the full pipeline against `source`.
    ///
    /// Extraction is all-or-nothing; classification tolerates individual
    /// frame failures as long as at least one frame succeeds.
    pub async fn analyze(
        &mut self,
        source: &VideoSource,
        options: &AnalyzeOptions,
    ) -> SortiqResult<VideoAnalysisResult> {
        let extract_progress: Option<ProgressFn> = options.on_progress.as_ref().map(|on| {
            let on = Arc::clone(on);
            Arc::new(move |p: f64| on(p * 0.5)) as ProgressFn
        });

        let extract_options = ExtractOptions {
            frames_per_second: options.frames_per_second,
            max_frames: options.max_frames,
            on_progress: extract_progress,
        };
        let frames = self.extractor.extract_frames(source, &extract_options).await?;
        tracing::info!(
            source = %source.describe(),
            frames = frames.len(),
            "extraction phase complete"
        );

        let mut scheduler = BatchScheduler::new(
            Arc::clone(&self.classifier),
            self.config.batch_size as usize,
        );
        if let Some(on) = &options.on_progress {
            let on = Arc::clone(on);
            scheduler = scheduler.with_progress(Arc::new(move |q: f64| on(0.5 + q * 0.5)));
        }

        let outcome = scheduler.classify_frames(frames).await;
        let failed = outcome.failed.len() as u32;
        let result = aggregate(outcome.analyses, failed)?;

        tracing::info!(
            classified = result.summary.total_frames,
            failed,
            average_confidence = result.summary.average_confidence,
            "analysis complete"
        );
        Ok(result)
    }

    /// Release capture resources. Safe to call multiple times.
    pub async fn cleanup(&mut self) {
        self.extractor.cleanup().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortiq_classify::FakeClassifier;
    use sortiq_core::SortiqError;
    use sortiq_extract::backend::FakeVideoBackend;
    use sortiq_extract::surface::FakeDrawSurface;
    use std::sync::Mutex;

    fn analyzer_for(backend: FakeVideoBackend, classifier: FakeClassifier) -> VideoAnalyzer {
        let surface = CaptureSurface::new(Box::new(backend), Box::new(FakeDrawSurface::new()));
        let config = VideoConfig {
            max_frames: None,
            ..VideoConfig::default()
        };
        VideoAnalyzer::new(surface, Arc::new(classifier), config)
    }

    #[tokio::test]
    async fn test_progress_spans_both_phases() {
        let mut analyzer = analyzer_for(
            FakeVideoBackend::new(10.0),
            FakeClassifier::fixed("plastic bottle", 0.9),
        );
        analyzer.initialize().unwrap();

        let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = AnalyzeOptions {
            frames_per_second: Some(1.0),
            on_progress: Some(Arc::new(move |p| sink.lock().unwrap().push(p))),
            ..Default::default()
        };

        let result = analyzer
            .analyze(&VideoSource::Url("clip".into()), &options)
            .await
            .unwrap();
        analyzer.cleanup().await;

        assert_eq!(result.summary.total_frames, 10);
        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().any(|p| *p <= 0.5), "extraction phase reported");
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_extraction_failure_aborts_before_classification() {
        let classifier = FakeClassifier::fixed("glass", 0.8);
        let calls = classifier.call_probe();
        let mut analyzer =
            analyzer_for(FakeVideoBackend::new(10.0).with_failing_seeks(vec![2]), classifier);
        analyzer.initialize().unwrap();

        let options = AnalyzeOptions {
            frames_per_second: Some(1.0),
            ..Default::default()
        };
        let result = analyzer
            .analyze(&VideoSource::Url("flaky".into()), &options)
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_frame_failing_yields_analysis_error() {
        let classifier = FakeClassifier::failing(|| SortiqError::Inference("down".into()));
        let mut analyzer = analyzer_for(FakeVideoBackend::new(3.0), classifier);
        analyzer.initialize().unwrap();

        let options = AnalyzeOptions {
            frames_per_second: Some(1.0),
            ..Default::default()
        };
        let err = analyzer
            .analyze(&VideoSource::Url("clip".into()), &options)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sortiq_core::ErrorKind::Analysis);
    }
}
