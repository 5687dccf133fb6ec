use async_trait::async_trait;
use sortiq_core::result::Prediction;
use sortiq_core::{SortiqError, SortiqResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// An external classification capability.
///
/// Input is one JPEG-encoded frame; output is an ordered (label, score)
/// sequence. Scores need not sum to 1; consumers normalize downstream.
/// Implementations surface failures as the typed taxonomy, never as raw
/// transport errors.
#[async_trait]
pub trait FrameClassifier: Send + Sync {
    /// Name used in logs and fallback targets.
    fn name(&self) -> &str;

    async fn classify(&self, jpeg: &[u8]) -> SortiqResult<Vec<Prediction>>;
}

/// Scriptable in-memory classifier for tests.
///
/// Responses are popped from a script in call order; once the script is
/// exhausted every call returns the default predictions.
pub struct FakeClassifier {
    name: String,
    script: Mutex<VecDeque<SortiqResult<Vec<Prediction>>>>,
    default: Vec<Prediction>,
    failure: Option<Box<dyn Fn() -> SortiqError + Send + Sync>>,
    calls: Arc<AtomicU32>,
}

impl FakeClassifier {
    pub fn new(default: Vec<Prediction>) -> Self {
        Self {
            name: "fake".to_string(),
            script: Mutex::new(VecDeque::new()),
            default,
            failure: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A classifier that always answers with one fixed prediction.
    pub fn fixed(label: &str, score: f32) -> Self {
        Self::new(vec![Prediction::new(label, score)])
    }

    /// A classifier whose unscripted calls always fail with the given error.
    pub fn failing(make_error: impl Fn() -> SortiqError + Send + Sync + 'static) -> Self {
        let mut fake = Self::new(Vec::new());
        fake.failure = Some(Box::new(make_error));
        fake
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue one scripted response, consumed before the default kicks in.
    pub fn push_response(&self, response: SortiqResult<Vec<Prediction>>) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Shared call counter, observable after the classifier is shared.
    pub fn call_probe(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameClassifier for FakeClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, _jpeg: &[u8]) -> SortiqResult<Vec<Prediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }
        if let Some(make_error) = &self.failure {
            return Err(make_error());
        }
        Ok(self.default.clone())
    }
}
