//! # sortiq-classify
//!
//! Classification adapters for the Sortiq engine. A classifier maps one
//! JPEG-encoded frame to an ordered list of (label, score) predictions;
//! implementations include a hosted HTTP endpoint adapter and a
//! deterministic fake for tests. Transport failures are normalized into the
//! core error taxonomy so the recovery policy can act on them.

pub mod adapter;
pub mod hosted;
pub mod recovery;

pub use adapter::{FakeClassifier, FrameClassifier};
pub use hosted::HostedClassifier;
pub use recovery::{NotifyFn, Recovery, RecoveryPolicy};
