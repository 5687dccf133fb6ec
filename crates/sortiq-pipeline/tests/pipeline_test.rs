//! End-to-end pipeline run against deterministic fakes.

use sortiq_classify::FakeClassifier;
use sortiq_core::{SortiqError, VideoConfig, WasteCategory};
use sortiq_extract::backend::FakeVideoBackend;
use sortiq_extract::surface::{CaptureSurface, FakeDrawSurface};
use sortiq_extract::VideoSource;
use sortiq_pipeline::{AnalyzeOptions, VideoAnalyzer};
use std::sync::{Arc, Mutex};

fn analyzer(backend: FakeVideoBackend, classifier: FakeClassifier) -> VideoAnalyzer {
    let surface = CaptureSurface::new(Box::new(backend), Box::new(FakeDrawSurface::new()));
    let config = VideoConfig {
        max_frames: None,
        batch_size: 4,
        ..VideoConfig::default()
    };
    VideoAnalyzer::new(surface, Arc::new(classifier), config)
}

#[tokio::test]
async fn analyzes_a_ten_second_clip_end_to_end() {
    let classifier = FakeClassifier::fixed("plastic bottle", 0.9);
    // Two transient failures on one frame: the in-batch retry absorbs the
    // first, the frame is recorded as failed after the second.
    classifier.push_response(Err(SortiqError::Api("blip".into())));
    classifier.push_response(Err(SortiqError::Api("blip again".into())));

    let mut analyzer = analyzer(FakeVideoBackend::new(10.0), classifier);
    analyzer.initialize().unwrap();

    let progress: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    let options = AnalyzeOptions {
        frames_per_second: Some(1.0),
        on_progress: Some(Arc::new(move |p| sink.lock().unwrap().push(p))),
        ..Default::default()
    };

    let result = analyzer
        .analyze(&VideoSource::Url("bin-cam.mp4".into()), &options)
        .await
        .unwrap();
    analyzer.cleanup().await;

    assert_eq!(result.summary.total_frames, 9);
    assert_eq!(result.summary.failed_frames, 1);
    assert_eq!(result.frames.len(), 9);

    let dominant = &result.summary.dominant[0];
    assert_eq!(dominant.category, WasteCategory::Plastic);
    assert_eq!(dominant.count, 9);
    assert!((result.summary.average_confidence - 0.9).abs() < 1e-6);

    let seen = progress.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress never decreases");
    assert_eq!(*seen.last().unwrap(), 1.0);
}

#[tokio::test]
async fn over_long_clip_fails_without_classifying() {
    let classifier = FakeClassifier::fixed("metal", 0.8);
    let calls = classifier.call_probe();

    let mut analyzer = analyzer(FakeVideoBackend::new(90.0), classifier);
    analyzer.initialize().unwrap();

    let err = analyzer
        .analyze(&VideoSource::Url("long.mp4".into()), &AnalyzeOptions::default())
        .await
        .unwrap_err();
    analyzer.cleanup().await;

    assert_eq!(err.kind(), sortiq_core::ErrorKind::Extraction);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
