//! Batch scheduling of frame classification.
//!
//! Frames are processed in batches of `batch_size`: frames within one batch
//! run concurrently, batches run strictly one after another. A frame whose
//! classification fails gets exactly one immediate retry inside its batch;
//! a second failure records the frame as failed and the run continues.

use sortiq_classify::FrameClassifier;
use sortiq_core::result::FrameAnalysis;
use sortiq_core::{CapturedFrame, SortiqError};
use sortiq_extract::extractor::ProgressFn;
use std::sync::Arc;

/// A frame that failed classification after the in-batch retry.
#[derive(Debug)]
pub struct FailedFrame {
    pub index: u32,
    pub error: SortiqError,
}

/// What a scheduling run produced. Failed frames are recorded, not fatal.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful analyses in capture order.
    pub analyses: Vec<FrameAnalysis>,
    pub failed: Vec<FailedFrame>,
}

/// Runs frames through a classifier with bounded concurrency.
pub struct BatchScheduler {
    classifier: Arc<dyn FrameClassifier>,
    batch_size: usize,
    on_progress: Option<ProgressFn>,
}

impl BatchScheduler {
    pub fn new(classifier: Arc<dyn FrameClassifier>, batch_size: usize) -> Self {
        Self {
            classifier,
            batch_size: batch_size.max(1),
            on_progress: None,
        }
    }

    /// Progress callback on the `[0, 1]` scale, invoked after each batch.
    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Classify all frames. Batches run sequentially; within a batch every
    /// frame's request is in flight at once.
    pub async fn classify_frames(&self, frames: Vec<CapturedFrame>) -> BatchOutcome {
        let total = frames.len();
        let mut outcome = BatchOutcome::default();
        if total == 0 {
            return outcome;
        }

        let mut done = 0usize;
        let mut batches = frames.into_iter().peekable();
        while batches.peek().is_some() {
            let batch: Vec<CapturedFrame> = batches.by_ref().take(self.batch_size).collect();
            let batch_len = batch.len();

            let results = futures::future::join_all(
                batch.into_iter().map(|frame| self.classify_one(frame)),
            )
            .await;

            for result in results {
                match result {
                    Ok(analysis) => outcome.analyses.push(analysis),
                    Err(failed) => {
                        tracing::warn!(
                            frame = failed.index,
                            error = %failed.error,
                            "frame failed classification after retry"
                        );
                        outcome.failed.push(failed);
                    }
                }
            }

            done += batch_len;
            if let Some(on_progress) = &self.on_progress {
                on_progress(done as f64 / total as f64);
            }
        }

        tracing::debug!(
            classified = outcome.analyses.len(),
            failed = outcome.failed.len(),
            "batch run complete"
        );
        outcome
    }

    /// Classify one frame with a single immediate retry.
    async fn classify_one(&self, frame: CapturedFrame) -> Result<FrameAnalysis, FailedFrame> {
        let index = frame.index;
        let first = self.classifier.classify(&frame.jpeg).await;
        let predictions = match first {
            Ok(predictions) => predictions,
            Err(first_err) => {
                tracing::debug!(frame = index, error = %first_err, "retrying frame once");
                match self.classifier.classify(&frame.jpeg).await {
                    Ok(predictions) => predictions,
                    Err(error) => return Err(FailedFrame { index, error }),
                }
            }
        };
        Ok(FrameAnalysis::new(frame, predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortiq_classify::FakeClassifier;
    use sortiq_core::SortiqError;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn frames(n: u32) -> Vec<CapturedFrame> {
        (0..n)
            .map(|i| CapturedFrame::new(vec![0xff, 0xd8, i as u8], u64::from(i) * 1000, i))
            .collect()
    }

    #[tokio::test]
    async fn test_all_frames_classified_in_order() {
        let classifier = Arc::new(FakeClassifier::fixed("plastic bottle", 0.9));
        let scheduler = BatchScheduler::new(classifier.clone(), 4);

        let outcome = scheduler.classify_frames(frames(10)).await;

        assert_eq!(outcome.analyses.len(), 10);
        assert!(outcome.failed.is_empty());
        assert!(outcome
            .analyses
            .iter()
            .enumerate()
            .all(|(i, a)| a.frame.index == i as u32));
        assert_eq!(classifier.call_count(), 10);
    }

    #[tokio::test]
    async fn test_one_retry_then_frame_recorded_as_failed() {
        // Script: frame 0 fails, its retry fails too. The run continues and
        // later frames use the default response.
        let classifier = FakeClassifier::fixed("metal can", 0.8);
        classifier.push_response(Err(SortiqError::Inference("flaky".into())));
        classifier.push_response(Err(SortiqError::Inference("flaky again".into())));

        let scheduler = BatchScheduler::new(Arc::new(classifier), 1);
        let outcome = scheduler.classify_frames(frames(3)).await;

        assert_eq!(outcome.analyses.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 0);
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failure() {
        let classifier = FakeClassifier::fixed("glass jar", 0.7);
        classifier.push_response(Err(SortiqError::Api("blip".into())));

        let scheduler = BatchScheduler::new(Arc::new(classifier), 5);
        let outcome = scheduler.classify_frames(frames(2)).await;

        assert_eq!(outcome.analyses.len(), 2);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_progress_reported_per_batch() {
        let classifier = Arc::new(FakeClassifier::fixed("paper", 0.6));
        let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let scheduler = BatchScheduler::new(classifier, 4)
            .with_progress(Arc::new(move |p| sink.lock().unwrap().push(p)));

        scheduler.classify_frames(frames(10)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[0.4, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_outcome() {
        let classifier = Arc::new(FakeClassifier::fixed("organic", 0.5));
        let probe = classifier.call_probe();
        let scheduler = BatchScheduler::new(classifier, 5);

        let outcome = scheduler.classify_frames(Vec::new()).await;
        assert!(outcome.analyses.is_empty());
        assert!(outcome.failed.is_empty());
        assert_eq!(probe.load(Ordering::SeqCst), 0);
    }
}
