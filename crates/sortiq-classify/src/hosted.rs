//! Hosted inference endpoint adapter.
//!
//! POSTs a base64 JPEG payload to a configured URL with bearer-token auth
//! and parses either of the two response shapes hosted classification
//! models return. Status codes are mapped deterministically onto the error
//! taxonomy so the recovery policy can distinguish "model warming up"
//! (HTTP 503, retryable) from hard failures.

use crate::adapter::FrameClassifier;
use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use sortiq_core::result::Prediction;
use sortiq_core::{EndpointConfig, SortiqError, SortiqResult};
use std::time::Duration;

/// A classifier backed by a remote HTTP inference endpoint.
///
/// Construct with [`HostedClassifier::new`], then call
/// [`HostedClassifier::initialize`] before the first classification;
/// classifying through an uninitialized adapter is an explicit error, not a
/// null-reference failure.
pub struct HostedClassifier {
    endpoint: EndpointConfig,
    client: Option<reqwest::Client>,
}

impl HostedClassifier {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self {
            endpoint,
            client: None,
        }
    }

    /// Build the HTTP client. Idempotent.
    pub fn initialize(&mut self) -> SortiqResult<()> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.endpoint.timeout_secs))
            .build()
            .map_err(|e| {
                SortiqError::initialization(format!("could not build HTTP client: {}", e))
            })?;
        self.client = Some(client);
        Ok(())
    }

    fn client(&self) -> SortiqResult<&reqwest::Client> {
        self.client.as_ref().ok_or_else(|| {
            SortiqError::initialization(format!(
                "classifier '{}' not initialized; call initialize() first",
                self.endpoint.name
            ))
        })
    }
}

#[async_trait]
impl FrameClassifier for HostedClassifier {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    async fn classify(&self, jpeg: &[u8]) -> SortiqResult<Vec<Prediction>> {
        let client = self.client()?;

        let payload = json!({
            "inputs": base64::engine::general_purpose::STANDARD.encode(jpeg),
        });

        let mut request = client.post(&self.endpoint.url).json(&payload);
        if let Some(token) = &self.endpoint.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            SortiqError::Inference(format!("unparseable classification response: {}", e))
        })?;

        let predictions = parse_predictions(&body)?;
        tracing::debug!(
            endpoint = %self.endpoint.name,
            predictions = predictions.len(),
            "classification succeeded"
        );
        Ok(predictions)
    }
}

/// Map a reqwest failure into the taxonomy.
fn map_transport_error(e: reqwest::Error) -> SortiqError {
    if e.is_timeout() {
        SortiqError::LoadingTimeout(format!("inference request timed out: {}", e))
    } else {
        SortiqError::Inference(format!("inference request failed: {}", e))
    }
}

/// Deterministic status-code mapping: 429 is rate limiting, 503 means the
/// model is still loading (retryable without user-visible error), other 5xx
/// are server-side API failures, and everything else falls back to an
/// inference error.
fn map_status(status: u16, body: &str) -> SortiqError {
    let detail = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>())
    };
    match status {
        429 => SortiqError::ResourceUnavailable(detail),
        503 => SortiqError::Loading(detail),
        500..=599 => SortiqError::Api(detail),
        _ => SortiqError::Inference(detail),
    }
}

/// Parse either response shape a hosted model returns:
/// `[{"label": ..., "score": ...}, ...]` or
/// `[{"labels": [...], "scores": [...]}]`.
fn parse_predictions(body: &serde_json::Value) -> SortiqResult<Vec<Prediction>> {
    let items = body
        .as_array()
        .ok_or_else(|| SortiqError::Inference("expected a JSON array response".into()))?;

    let mut predictions = Vec::new();
    for item in items {
        if let (Some(label), Some(score)) = (item["label"].as_str(), item["score"].as_f64()) {
            predictions.push(Prediction::new(label, score as f32));
        } else if let (Some(labels), Some(scores)) =
            (item["labels"].as_array(), item["scores"].as_array())
        {
            for (label, score) in labels.iter().zip(scores) {
                if let (Some(label), Some(score)) = (label.as_str(), score.as_f64()) {
                    predictions.push(Prediction::new(label, score as f32));
                }
            }
        }
    }

    if predictions.is_empty() {
        return Err(SortiqError::Inference(
            "response contained no usable predictions".into(),
        ));
    }
    Ok(predictions)
}
