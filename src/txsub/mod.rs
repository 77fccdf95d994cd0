//! Transaction submission to the core node.
//!
//! A [`Submitter`] sends one envelope and classifies core's answer. It never
//! retries; [`retry::BulkSubmitter`] layers a bounded retry policy on top.

pub mod retry;
mod submitter;

pub use submitter::DefaultSubmitter;

use std::time::Duration;

use async_trait::async_trait;

use crate::stellarcore::TxStatus;

/// Submits transaction envelopes to the network.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit a base64 encoded envelope. Always returns a result; failures
    /// are carried in [`SubmissionResult::err`].
    async fn submit(&self, envelope: &str) -> SubmissionResult;
}

/// Core rejected the transaction. `result_xdr` is core's base64
/// `TransactionResult` explaining why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transaction failed: {result_xdr}")]
pub struct FailedTransactionError {
    pub result_xdr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request never produced a readable response.
    #[error("failed to submit: {0}")]
    Transport(crate::Error),

    /// No response within the submission deadline.
    #[error("failed to submit: deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("core exception: {0}")]
    CoreException(String),

    #[error(transparent)]
    Failed(#[from] FailedTransactionError),

    #[error("unrecognized core status response: {0}")]
    UnrecognizedStatus(String),

    /// Core kept answering `TRY_AGAIN_LATER`. Only reported once a retry
    /// policy gives up; a single submission treats it as success.
    #[error("core asked to try again later")]
    TryAgainLater,
}

impl SubmitError {
    /// Deadline errors, including a timeout surfaced by the HTTP client.
    pub fn is_timeout(&self) -> bool {
        match self {
            SubmitError::Timeout(_) => true,
            SubmitError::Transport(crate::Error::Http(e)) => e.is_timeout(),
            _ => false,
        }
    }
}

/// What a caller should do with a submission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Core accepted, queued or already knew the transaction.
    Accepted,
    /// Submitting the same envelope again may succeed.
    Retryable,
    /// Resubmitting the same envelope cannot help.
    Terminal,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Retryable => "retryable",
            Outcome::Terminal => "terminal",
        }
    }
}

/// Result of a single submission.
#[derive(Debug)]
pub struct SubmissionResult {
    /// `None` iff core answered `PENDING`, `DUPLICATE` or `TRY_AGAIN_LATER`.
    pub err: Option<SubmitError>,
    /// Wall time of the submission, recorded on every path.
    pub duration: Duration,
    /// Status core answered with, when it answered with a known one.
    pub status: Option<TxStatus>,
    /// Result XDR core attached to an `ERROR` status.
    pub result_xdr: Option<String>,
}

impl SubmissionResult {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Classify this result for retry decisions.
    pub fn classify(&self) -> Outcome {
        match &self.err {
            None if self.status == Some(TxStatus::TryAgainLater) => Outcome::Retryable,
            None => Outcome::Accepted,
            Some(err) if err.is_timeout() => Outcome::Retryable,
            Some(_) => Outcome::Terminal,
        }
    }

    /// Consume the result, yielding the error a retry policy reports for it.
    pub fn into_cause(self) -> Option<SubmitError> {
        match self.err {
            Some(err) => Some(err),
            None if self.status == Some(TxStatus::TryAgainLater) => Some(SubmitError::TryAgainLater),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(err: Option<SubmitError>, status: Option<TxStatus>) -> SubmissionResult {
        SubmissionResult {
            err,
            duration: Duration::from_millis(3),
            status,
            result_xdr: None,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(result(None, Some(TxStatus::Pending)).classify(), Outcome::Accepted);
        assert_eq!(result(None, Some(TxStatus::Duplicate)).classify(), Outcome::Accepted);
        assert_eq!(
            result(None, Some(TxStatus::TryAgainLater)).classify(),
            Outcome::Retryable
        );
        assert_eq!(
            result(Some(SubmitError::Timeout(Duration::from_secs(1))), None).classify(),
            Outcome::Retryable
        );
        assert_eq!(
            result(Some(SubmitError::CoreException("Invalid XDR".into())), None).classify(),
            Outcome::Terminal
        );
        let failed = SubmitError::Failed(FailedTransactionError {
            result_xdr: "1234".into(),
        });
        assert_eq!(
            result(Some(failed), Some(TxStatus::Error)).classify(),
            Outcome::Terminal
        );
    }

    #[test]
    fn test_into_cause() {
        assert!(result(None, Some(TxStatus::Pending)).into_cause().is_none());
        assert!(matches!(
            result(None, Some(TxStatus::TryAgainLater)).into_cause(),
            Some(SubmitError::TryAgainLater)
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = SubmitError::UnrecognizedStatus("NOTREAL".into());
        assert!(err.to_string().contains("NOTREAL"));
        let err = SubmitError::Failed(FailedTransactionError {
            result_xdr: "1234".into(),
        });
        assert_eq!(err.to_string(), "transaction failed: 1234");
    }
}
