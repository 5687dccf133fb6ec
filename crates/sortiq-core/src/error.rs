//! Core error types for the Sortiq engine.
//!
//! Every failure in the pipeline is normalized into exactly one
//! [`ErrorKind`] before it reaches the recovery policy. Transport-level
//! details (status codes, timeout flags) are mapped at the adapter boundary;
//! nothing above that layer sees a raw transport error.

/// A specialized Result type for Sortiq operations.
pub type SortiqResult<T> = Result<T, SortiqError>;

/// The fixed set of error kinds the recovery policy knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Upstream inference service returned a server-side failure (5xx).
    Api,
    /// The model ran but produced an unusable response.
    Inference,
    /// The model is still loading on the remote host (HTTP 503).
    Loading,
    /// The service is rate-limited or otherwise unavailable (HTTP 429).
    ResourceUnavailable,
    /// The caller supplied input the pipeline cannot process.
    InvalidInput,
    /// A component was used before (or failed during) initialization.
    Initialization,
    /// Result aggregation failed.
    Analysis,
    /// Frame extraction failed (seek timeout, over-long source, decode).
    Extraction,
    /// Resource release failed. Never fatal to the caller's flow.
    Cleanup,
    /// Waiting for the model to load exceeded the deadline.
    LoadingTimeout,
}

/// Top-level error type encompassing all Sortiq subsystems.
#[derive(Debug, thiserror::Error)]
pub enum SortiqError {
    #[error("API error: {0}")]
    Api(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("model loading: {0}")]
    Loading(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("initialization error: {0}")]
    Initialization(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("cleanup error: {0}")]
    Cleanup(String),

    #[error("model loading timed out: {0}")]
    LoadingTimeout(String),
}

impl SortiqError {
    /// The tagged kind of this error, used to select a recovery strategy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SortiqError::Api(_) => ErrorKind::Api,
            SortiqError::Inference(_) => ErrorKind::Inference,
            SortiqError::Loading(_) => ErrorKind::Loading,
            SortiqError::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            SortiqError::InvalidInput(_) => ErrorKind::InvalidInput,
            SortiqError::Initialization(_) => ErrorKind::Initialization,
            SortiqError::Analysis(_) => ErrorKind::Analysis,
            SortiqError::Extraction(_) => ErrorKind::Extraction,
            SortiqError::Cleanup(_) => ErrorKind::Cleanup,
            SortiqError::LoadingTimeout(_) => ErrorKind::LoadingTimeout,
        }
    }

    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        SortiqError::Extraction(message.into())
    }

    /// Create an initialization error.
    pub fn initialization(message: impl Into<String>) -> Self {
        SortiqError::Initialization(message.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        SortiqError::InvalidInput(message.into())
    }
}

/// A single step in a recovery strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Re-run the failing operation with exponential backoff.
    Retry { max_attempts: u32 },
    /// Substitute the named alternative capability; counts as recovered.
    Fallback { target: String },
    /// Surface a user-facing message, then continue with the next action.
    Notify { message: String },
    /// Stop the chain deliberately with a final user-facing reason.
    Abort { reason: String },
}

/// The default ordered recovery strategy for an error kind.
///
/// Actions are evaluated in order by the recovery policy; a `Fallback` or
/// `Abort` halts the chain, `Notify` always continues, and an exhausted
/// `Retry` marks the outcome failed but lets a trailing `Notify` run.
pub fn default_strategy(kind: ErrorKind) -> Vec<RecoveryAction> {
    match kind {
        ErrorKind::Api => vec![
            RecoveryAction::Retry { max_attempts: 3 },
            RecoveryAction::Notify {
                message: "Service temporarily unavailable".to_string(),
            },
        ],
        ErrorKind::Inference => vec![
            RecoveryAction::Retry { max_attempts: 2 },
            RecoveryAction::Notify {
                message: "Classification failed for this input".to_string(),
            },
        ],
        ErrorKind::Loading => vec![RecoveryAction::Retry { max_attempts: 5 }],
        ErrorKind::ResourceUnavailable => vec![
            RecoveryAction::Notify {
                message: "Primary model unavailable, switching to fallback".to_string(),
            },
            RecoveryAction::Fallback {
                target: "secondary".to_string(),
            },
        ],
        ErrorKind::InvalidInput => vec![RecoveryAction::Abort {
            reason: "Unsupported input".to_string(),
        }],
        ErrorKind::Initialization => vec![RecoveryAction::Abort {
            reason: "Analyzer failed to initialize".to_string(),
        }],
        ErrorKind::Analysis => vec![
            RecoveryAction::Notify {
                message: "Analysis produced no usable results".to_string(),
            },
            RecoveryAction::Abort {
                reason: "Analysis failed".to_string(),
            },
        ],
        ErrorKind::Extraction => vec![RecoveryAction::Abort {
            reason: "Video could not be processed".to_string(),
        }],
        ErrorKind::Cleanup => vec![RecoveryAction::Notify {
            message: "Resource cleanup reported a failure".to_string(),
        }],
        ErrorKind::LoadingTimeout => vec![
            RecoveryAction::Retry { max_attempts: 2 },
            RecoveryAction::Notify {
                message: "The model is taking longer than expected".to_string(),
            },
        ],
    }
}
