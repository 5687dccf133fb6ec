//! Aggregation of per-frame analyses into a video-level summary.

use sortiq_core::result::{AnalysisSummary, DominantCategory, FrameAnalysis, VideoAnalysisResult};
use sortiq_core::{SortiqError, SortiqResult, WasteCategory};

/// Fold per-frame analyses into a [`VideoAnalysisResult`].
///
/// An empty analysis list is an error: a run where every frame failed has
/// no signal to summarize. Dominant categories are ranked by occurrence
/// count across all predictions of all frames, descending; ties keep
/// first-encounter order.
pub fn aggregate(
    analyses: Vec<FrameAnalysis>,
    failed_frames: u32,
) -> SortiqResult<VideoAnalysisResult> {
    if analyses.is_empty() {
        return Err(SortiqError::Analysis(
            "no frame analyses to aggregate".into(),
        ));
    }

    let total_frames = analyses.len() as u32;
    let average_confidence =
        analyses.iter().map(|a| a.confidence).sum::<f32>() / total_frames as f32;

    // (category, score sum, count) in first-encounter order.
    let mut tallies: Vec<(WasteCategory, f32, u32)> = Vec::new();
    for analysis in &analyses {
        for prediction in &analysis.predictions {
            match tallies.iter_mut().find(|(c, _, _)| *c == prediction.category) {
                Some((_, sum, count)) => {
                    *sum += prediction.score;
                    *count += 1;
                }
                None => tallies.push((prediction.category, prediction.score, 1)),
            }
        }
    }
    tallies.sort_by(|a, b| b.2.cmp(&a.2));

    let dominant = tallies
        .into_iter()
        .map(|(category, sum, count)| DominantCategory {
            category,
            confidence: sum / count as f32,
            count,
        })
        .collect();

    let summary = AnalysisSummary {
        total_frames,
        failed_frames,
        average_confidence,
        dominant,
    };
    tracing::debug!(
        total_frames,
        failed_frames,
        average_confidence,
        "aggregated video summary"
    );

    Ok(VideoAnalysisResult {
        frames: analyses,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortiq_core::result::Prediction;
    use sortiq_core::CapturedFrame;

    fn analysis(index: u32, predictions: Vec<Prediction>) -> FrameAnalysis {
        FrameAnalysis::new(
            CapturedFrame::new(vec![], u64::from(index) * 1000, index),
            predictions,
        )
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = aggregate(Vec::new(), 3).unwrap_err();
        assert_eq!(err.kind(), sortiq_core::ErrorKind::Analysis);
    }

    #[test]
    fn test_dominant_ranked_by_count() {
        let analyses = vec![
            analysis(0, vec![Prediction::new("plastic bottle", 0.9)]),
            analysis(1, vec![Prediction::new("plastic bag", 0.7)]),
            analysis(2, vec![Prediction::new("glass jar", 0.8)]),
        ];

        let result = aggregate(analyses, 0).unwrap();
        let dominant = &result.summary.dominant;
        assert_eq!(dominant[0].category, WasteCategory::Plastic);
        assert_eq!(dominant[0].count, 2);
        assert!((dominant[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(dominant[1].category, WasteCategory::Glass);
    }

    #[test]
    fn test_ties_keep_first_encounter_order() {
        let analyses = vec![
            analysis(0, vec![Prediction::new("metal can", 0.5)]),
            analysis(1, vec![Prediction::new("cardboard", 0.5)]),
        ];

        let result = aggregate(analyses, 0).unwrap();
        let dominant = &result.summary.dominant;
        assert_eq!(dominant[0].category, WasteCategory::Metal);
        assert_eq!(dominant[1].category, WasteCategory::Paper);
    }

    #[test]
    fn test_average_confidence_is_mean_of_frame_confidences() {
        let analyses = vec![
            analysis(0, vec![Prediction::new("plastic", 0.6)]),
            analysis(1, vec![Prediction::new("plastic", 1.0)]),
        ];

        let result = aggregate(analyses, 2).unwrap();
        assert!((result.summary.average_confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.summary.total_frames, 2);
        assert_eq!(result.summary.failed_frames, 2);
    }
}
