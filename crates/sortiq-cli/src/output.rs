//! Terminal and JSON rendering of analysis results.

use serde::Serialize;
use sortiq_core::{AnalysisSummary, VideoAnalysisResult, WasteCategory};
use sortiq_pipeline::CombinedClassification;

/// Serializable view of a video run. Frame payloads are summarized, the
/// JPEG bytes themselves never leave the pipeline.
#[derive(Debug, Serialize)]
pub struct VideoReport {
    pub summary: AnalysisSummary,
    pub frames: Vec<FrameReport>,
}

#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub index: u32,
    pub timestamp_ms: u64,
    pub top_label: Option<String>,
    pub category: Option<WasteCategory>,
    pub confidence: f32,
}

impl VideoReport {
    pub fn from_result(result: &VideoAnalysisResult) -> Self {
        let frames = result
            .frames
            .iter()
            .map(|analysis| FrameReport {
                index: analysis.frame.index,
                timestamp_ms: analysis.frame.timestamp_ms,
                top_label: analysis.predictions.first().map(|p| p.label.clone()),
                category: analysis.predictions.first().map(|p| p.category),
                confidence: analysis.confidence,
            })
            .collect();
        Self {
            summary: result.summary.clone(),
            frames,
        }
    }
}

pub fn print_video_result(result: &VideoAnalysisResult) {
    let summary = &result.summary;
    println!(
        "Analyzed {} frames ({} failed), average confidence {:.1}%",
        summary.total_frames,
        summary.failed_frames,
        summary.average_confidence * 100.0
    );
    println!();
    println!("Dominant categories:");
    for dominant in &summary.dominant {
        println!(
            "  {:<16} {:>3} occurrences  {:>5.1}% confidence",
            dominant.category.as_str(),
            dominant.count,
            dominant.confidence * 100.0
        );
    }
}

pub fn print_combined(combined: &CombinedClassification) {
    match &combined.best {
        Some((category, weight)) => {
            println!(
                "Verdict: {} ({:.1}%){}",
                category.as_str(),
                weight * 100.0,
                if category.recyclable() {
                    " [recyclable]"
                } else {
                    ""
                }
            );
        }
        None => println!("Verdict: inconclusive (no source produced a result)"),
    }
    println!(
        "Sources: {} used, {} failed",
        combined.sources_used, combined.sources_failed
    );
    println!();
    for (category, weight) in &combined.distribution {
        if *weight > 0.0 {
            println!("  {:<16} {:>5.1}%", category.as_str(), weight * 100.0);
        }
    }
}

pub fn print_categories() {
    for category in WasteCategory::ALL {
        println!(
            "  {:<16} {}",
            category.as_str(),
            if category.recyclable() {
                "recyclable"
            } else {
                "not curbside-recyclable"
            }
        );
    }
}
