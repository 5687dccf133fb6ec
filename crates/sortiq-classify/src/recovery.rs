//! Error recovery driver.
//!
//! Given a failed operation and the error it produced, walks the default
//! recovery strategy for that error kind: retry with exponential backoff,
//! switch to a fallback target, notify the operator, or abort. Retry
//! exhaustion does not halt the walk, so a strategy ending in a notify
//! action still reports the failure after the retries burn out.

use sortiq_core::{default_strategy, RecoveryAction, SortiqError, SortiqResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operator notification hook. Defaults to a structured log line.
pub type NotifyFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Outcome of running a recovery strategy.
#[derive(Debug)]
pub enum Recovery<T> {
    /// A retry attempt succeeded; carries the recovered value.
    Recovered(T),
    /// The strategy directs the caller to a named fallback target.
    Fallback(String),
    /// The strategy ran out of options; carries the last error seen.
    Failed(SortiqError),
}

impl<T> Recovery<T> {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Recovery::Recovered(_))
    }
}

/// Drives recovery actions for a failed operation.
pub struct RecoveryPolicy {
    notify: Option<NotifyFn>,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            notify: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RecoveryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an operator notification callback.
    pub fn with_notify(mut self, notify: NotifyFn) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Override the backoff window. Tests shrink this to keep runs fast.
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    fn emit(&self, message: &str) {
        match &self.notify {
            Some(notify) => notify(message),
            None => tracing::warn!(message, "recovery notification"),
        }
    }

    /// Run the default strategy for `error`'s kind against `op`.
    ///
    /// Each retry attempt waits before re-invoking `op`, doubling the delay
    /// up to the cap. A successful attempt short-circuits the remaining
    /// actions. Fallback and abort actions halt the walk; notify actions and
    /// exhausted retries continue to the next action.
    pub async fn run<T, F, Fut>(&self, error: SortiqError, mut op: F) -> Recovery<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SortiqResult<T>>,
    {
        let kind = error.kind();
        let mut last_error = error;

        for action in default_strategy(kind) {
            match action {
                RecoveryAction::Retry { max_attempts } => {
                    let mut delay = self.base_delay;
                    for attempt in 1..=max_attempts {
                        tracing::debug!(?kind, attempt, max_attempts, delay_ms = delay.as_millis() as u64, "retrying");
                        tokio::time::sleep(delay).await;
                        match op().await {
                            Ok(value) => {
                                tracing::info!(?kind, attempt, "recovered after retry");
                                return Recovery::Recovered(value);
                            }
                            Err(e) => last_error = e,
                        }
                        delay = (delay * 2).min(self.max_delay);
                    }
                    tracing::warn!(?kind, max_attempts, error = %last_error, "retries exhausted");
                }
                RecoveryAction::Fallback { target } => {
                    tracing::info!(?kind, target = %target, "switching to fallback");
                    return Recovery::Fallback(target);
                }
                RecoveryAction::Notify { message } => {
                    self.emit(&message);
                }
                RecoveryAction::Abort { reason } => {
                    self.emit(&reason);
                    return Recovery::Failed(last_error);
                }
            }
        }

        Recovery::Failed(last_error)
    }
}
