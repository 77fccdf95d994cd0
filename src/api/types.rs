use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{LedgerRow, TransactionRow};
use crate::ledger::Status;

/// JSON response wrapper that pretty-prints the output.
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
                .into_response(),
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Core's result XDR for a rejected transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_xdr: Option<String>,
}

/// Response for `GET /`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub core_latest_ledger: u32,
    pub history_latest_ledger: u32,
    pub history_latest_ledger_closed_at: Option<DateTime<Utc>>,
    pub history_elder_ledger: u32,
    pub transaction_submission_enabled: bool,
    pub version: &'static str,
}

impl RootResponse {
    pub fn new(status: Status, transaction_submission_enabled: bool) -> Self {
        Self {
            core_latest_ledger: status.core.core_latest,
            history_latest_ledger: status.history.history_latest,
            history_latest_ledger_closed_at: status.history.history_latest_closed_at,
            history_elder_ledger: status.history.history_elder,
            transaction_submission_enabled,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Request body for `POST /transactions`.
#[derive(Debug, Deserialize)]
pub struct SubmitTransactionRequest {
    /// Base64 transaction envelope.
    pub tx: String,
}

/// Response for an accepted transaction.
#[derive(Debug, Serialize)]
pub struct SubmitTransactionResponse {
    pub status: &'static str,
    pub duration_seconds: f64,
}

/// Response for `GET /ledgers/{sequence}`.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    #[serde(flatten)]
    pub ledger: LedgerRow,
    pub transactions: Vec<TransactionRow>,
}
