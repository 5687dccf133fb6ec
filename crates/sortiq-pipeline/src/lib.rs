//! # sortiq-pipeline
//!
//! The analysis pipeline: schedules captured frames through a classifier in
//! bounded concurrent batches, aggregates per-frame results into a video
//! summary, combines multi-source image results into one category
//! distribution, and wires extraction and classification together behind a
//! single entry point with unified progress reporting.

pub mod aggregate;
pub mod analyzer;
pub mod batch;
pub mod combine;

pub use aggregate::aggregate;
pub use analyzer::{AnalyzeOptions, VideoAnalyzer};
pub use batch::{BatchOutcome, BatchScheduler, FailedFrame};
pub use combine::{combine_sources, CombinedClassification};
