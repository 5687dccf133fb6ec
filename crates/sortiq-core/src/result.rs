use crate::category::WasteCategory;
use crate::frame::CapturedFrame;
use serde::{Deserialize, Serialize};

/// One (category, confidence) prediction for a frame or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw label as returned by the classification source.
    pub label: String,
    /// Normalized category for the raw label.
    pub category: WasteCategory,
    /// Model confidence. Scores across a frame need not sum to 1.
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        let label = label.into();
        let category = WasteCategory::from_label(&label);
        Self {
            label,
            category,
            score,
        }
    }
}

/// Classification outcome for one captured frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub frame: CapturedFrame,
    /// Predictions ordered as returned by the source (highest first for
    /// well-behaved models).
    pub predictions: Vec<Prediction>,
    /// Representative confidence for the frame: the top prediction's score.
    pub confidence: f32,
}

impl FrameAnalysis {
    pub fn new(frame: CapturedFrame, predictions: Vec<Prediction>) -> Self {
        let confidence = predictions.first().map(|p| p.score).unwrap_or(0.0);
        Self {
            frame,
            predictions,
            confidence,
        }
    }
}

/// One ranked entry in a video summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantCategory {
    pub category: WasteCategory,
    /// Mean score of this category's occurrences across all frames.
    pub confidence: f32,
    /// Number of (frame, prediction) occurrences of this category.
    pub count: u32,
}

/// Summary statistics over a completed video run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Frames that produced a usable classification.
    pub total_frames: u32,
    /// Frames whose classification failed after the in-batch retry.
    pub failed_frames: u32,
    /// Arithmetic mean of per-frame representative confidences.
    pub average_confidence: f32,
    /// Categories ranked by occurrence count, descending; ties keep
    /// first-encounter order.
    pub dominant: Vec<DominantCategory>,
}

/// Final output of the video pipeline. Built once per completed run.
#[derive(Debug, Clone)]
pub struct VideoAnalysisResult {
    /// Per-frame analyses in capture order.
    pub frames: Vec<FrameAnalysis>,
    pub summary: AnalysisSummary,
}

/// Raw result from one independent classification source (image path).
///
/// The `"error"` category is a valid terminal state, not an exception:
/// a failed source contributes an error-valued result and the other
/// sources continue to count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    /// Raw category string, or the `"error"` sentinel.
    pub category: String,
    /// Confidence in [0, 1]. Zero for error results.
    pub confidence: f32,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub recyclable: Option<bool>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    /// Human-readable failure detail when `category == "error"`.
    #[serde(default)]
    pub error: Option<String>,
}

impl ModelResult {
    pub const ERROR_CATEGORY: &'static str = "error";

    pub fn new(category: impl Into<String>, confidence: f32) -> Self {
        Self {
            category: category.into(),
            confidence,
            material: None,
            recyclable: None,
            subcategories: Vec::new(),
            error: None,
        }
    }

    /// Build the error-sentinel result for a failed source.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            category: Self::ERROR_CATEGORY.to_string(),
            confidence: 0.0,
            material: None,
            recyclable: None,
            subcategories: Vec::new(),
            error: Some(detail.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == Self::ERROR_CATEGORY
    }
}
