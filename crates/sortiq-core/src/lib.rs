//! # sortiq-core
//!
//! Core types and primitives for the Sortiq waste-analysis engine.
//! This crate contains foundational types shared across all Sortiq crates:
//! captured frames, waste categories, analysis results, configuration,
//! and the error taxonomy with its recovery strategies.

pub mod category;
pub mod config;
pub mod error;
pub mod frame;
pub mod result;

pub use config::*;

pub use category::WasteCategory;
pub use error::{default_strategy, ErrorKind, RecoveryAction, SortiqError, SortiqResult};
pub use frame::{CapturedFrame, FrameBuffer, PixelFormat};
pub use result::{
    AnalysisSummary, DominantCategory, FrameAnalysis, ModelResult, Prediction, VideoAnalysisResult,
};
