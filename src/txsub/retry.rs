//! Bounded retry for submitting many transactions in sequence.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Outcome, SubmitError, Submitter};

/// One envelope and the items it completes once accepted.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub envelope: String,
    pub items: Vec<T>,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Every attempt of a batch ended in a retryable failure.
    #[error("after retrying {attempts} times: {context}: {source}")]
    Exhausted {
        attempts: u32,
        context: String,
        source: SubmitError,
    },

    /// A batch failed in a way resubmitting cannot fix.
    #[error("{context}: {source}")]
    Terminal { context: String, source: SubmitError },

    #[error("{context}: cancelled")]
    Cancelled { context: String },
}

/// Batches accepted before the failure, together with the failure.
#[derive(Debug)]
pub struct PartialFailure<T> {
    pub completed: Vec<T>,
    pub error: RetryError,
}

/// Submits batches one after another, retrying timeouts and
/// `TRY_AGAIN_LATER` up to `max_attempts` times per batch.
pub struct BulkSubmitter {
    submitter: Arc<dyn Submitter>,
    max_attempts: u32,
    retry_delay: Duration,
    context: String,
    cancel: CancellationToken,
}

impl BulkSubmitter {
    pub fn new(submitter: Arc<dyn Submitter>, max_attempts: u32, context: impl Into<String>) -> Self {
        Self {
            submitter,
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::from_secs(1),
            context: context.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Submit every batch in order and collect the items of accepted ones.
    ///
    /// Stops at the first batch that cannot be submitted; items of the
    /// batches accepted so far are returned with the error.
    pub async fn submit_all<T>(
        &self,
        batches: impl IntoIterator<Item = Batch<T>>,
    ) -> Result<Vec<T>, PartialFailure<T>> {
        let mut completed = Vec::new();
        for (index, batch) in batches.into_iter().enumerate() {
            match self.submit_batch(&batch.envelope).await {
                Ok(()) => completed.extend(batch.items),
                Err(error) => {
                    tracing::warn!(
                        batch = index,
                        completed = completed.len(),
                        error = %error,
                        "bulk submission stopped"
                    );
                    return Err(PartialFailure { completed, error });
                }
            }
        }
        Ok(completed)
    }

    async fn submit_batch(&self, envelope: &str) -> Result<(), RetryError> {
        let mut attempt = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            attempt += 1;

            let result = self.submitter.submit(envelope).await;
            match result.classify() {
                Outcome::Accepted => return Ok(()),
                Outcome::Terminal => {
                    return Err(RetryError::Terminal {
                        context: self.context.clone(),
                        source: result.into_cause().unwrap_or(SubmitError::TryAgainLater),
                    })
                }
                Outcome::Retryable if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        context: self.context.clone(),
                        source: result.into_cause().unwrap_or(SubmitError::TryAgainLater),
                    })
                }
                Outcome::Retryable => {
                    tracing::debug!(attempt, "retrying submission");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(self.cancelled()),
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }

    fn cancelled(&self) -> RetryError {
        RetryError::Cancelled {
            context: self.context.clone(),
        }
    }
}
