//! Combining independent image-classification sources.
//!
//! The image path queries up to three sources; each returns a
//! [`ModelResult`] or the error sentinel. Non-error results are folded into
//! one confidence-weighted distribution over the closed category set.

use sortiq_core::{ModelResult, WasteCategory};

/// Combined verdict over the independent sources.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedClassification {
    /// Normalized weights in [`WasteCategory::ALL`] order. Sums to 1 when
    /// any source contributed, all zeros otherwise.
    pub distribution: Vec<(WasteCategory, f32)>,
    /// Highest-weighted category, absent when no source contributed.
    pub best: Option<(WasteCategory, f32)>,
    pub sources_used: u32,
    pub sources_failed: u32,
}

impl CombinedClassification {
    pub fn is_conclusive(&self) -> bool {
        self.best.is_some()
    }
}

/// Fold source results into one normalized category distribution.
///
/// Error-sentinel results are skipped and counted, never propagated: one
/// failed source must not discard the verdicts of the others. With zero
/// usable sources the distribution stays all-zero and `best` is `None`.
pub fn combine_sources(results: &[ModelResult]) -> CombinedClassification {
    let mut weights = [0.0f32; WasteCategory::ALL.len()];
    let mut sources_used = 0u32;
    let mut sources_failed = 0u32;

    for result in results {
        if result.is_error() {
            sources_failed += 1;
            tracing::debug!(error = ?result.error, "skipping failed source");
            continue;
        }
        sources_used += 1;
        let category = WasteCategory::from_label(&result.category);
        let slot = WasteCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or(WasteCategory::ALL.len() - 1);
        weights[slot] += result.confidence.clamp(0.0, 1.0);
    }

    let total: f32 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }

    let distribution: Vec<(WasteCategory, f32)> = WasteCategory::ALL
        .iter()
        .copied()
        .zip(weights.iter().copied())
        .collect();

    let best = distribution
        .iter()
        .copied()
        .filter(|(_, w)| *w > 0.0)
        .max_by(|(_, a), (_, b)| a.total_cmp(b));

    CombinedClassification {
        distribution,
        best,
        sources_used,
        sources_failed,
    }
}
