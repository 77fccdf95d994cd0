use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{FailedTransactionError, SubmissionResult, SubmitError, Submitter};
use crate::stellarcore::{self, TxResponse, TxStatus};

/// Submits directly to a core node over HTTP.
pub struct DefaultSubmitter {
    core: stellarcore::Client,
    timeout: Duration,
}

impl DefaultSubmitter {
    pub fn new(core: stellarcore::Client, timeout: Duration) -> Self {
        Self { core, timeout }
    }
}

#[async_trait]
impl Submitter for DefaultSubmitter {
    async fn submit(&self, envelope: &str) -> SubmissionResult {
        let start = Instant::now();
        let submission = self.core.submit_transaction(envelope);
        let (err, status, result_xdr) = match tokio::time::timeout(self.timeout, submission).await {
            Err(_) => (Some(SubmitError::Timeout(self.timeout)), None, None),
            Ok(Err(e)) => (Some(SubmitError::Transport(e)), None, None),
            Ok(Ok(resp)) => interpret(resp),
        };
        let result = SubmissionResult {
            err,
            duration: start.elapsed(),
            status,
            result_xdr,
        };

        let outcome = result.classify().as_str();
        match &result.err {
            Some(e) => tracing::info!(
                err = %e,
                duration = result.duration.as_secs_f64(),
                "submitter result"
            ),
            None => tracing::info!(
                status = result.status.map(|s| s.as_str()),
                duration = result.duration.as_secs_f64(),
                "submitter result"
            ),
        }
        metrics::counter!("txsub_submissions_total", "outcome" => outcome).increment(1);
        metrics::histogram!("txsub_submission_duration_seconds", "outcome" => outcome)
            .record(result.duration.as_secs_f64());

        result
    }
}

/// Turn core's answer into `(err, status, result_xdr)`.
fn interpret(resp: TxResponse) -> (Option<SubmitError>, Option<TxStatus>, Option<String>) {
    if resp.is_exception() {
        return (Some(SubmitError::CoreException(resp.exception)), None, None);
    }

    match resp.status.parse::<TxStatus>() {
        Ok(TxStatus::Error) => {
            let result_xdr = resp.error.unwrap_or_default();
            let err = SubmitError::Failed(FailedTransactionError {
                result_xdr: result_xdr.clone(),
            });
            (Some(err), Some(TxStatus::Error), Some(result_xdr))
        }
        Ok(status) => (None, Some(status), None),
        Err(()) => (Some(SubmitError::UnrecognizedStatus(resp.status)), None, None),
    }
}
