use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::error::ApiError;
use super::types::{
    LedgerResponse, PrettyJson, RootResponse, SubmitTransactionRequest, SubmitTransactionResponse,
};
use crate::AppState;

/// GET /
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    PrettyJson(RootResponse::new(
        state.ledger_state.current_status(),
        state.submitter.is_some(),
    ))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = state.health.check().await;
    let status = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, PrettyJson(response))
}

/// POST /transactions
#[tracing::instrument(skip_all)]
pub async fn submit_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submitter = state.submitter.as_ref().ok_or_else(|| ApiError::NotFound {
        message: "transaction submission is disabled".to_string(),
    })?;

    let envelope = req.tx.trim();
    if envelope.is_empty() {
        return Err(ApiError::BadRequest {
            message: "tx must be a base64 transaction envelope".to_string(),
            param: Some("tx".to_string()),
        });
    }

    let result = submitter.submit(envelope).await;
    let duration_seconds = result.duration.as_secs_f64();
    let status = result.status;
    if let Some(err) = result.err {
        return Err(err.into());
    }

    Ok(PrettyJson(SubmitTransactionResponse {
        status: status.map(|s| s.as_str()).unwrap_or_default(),
        duration_seconds,
    }))
}

/// GET /ledgers/{sequence}
#[tracing::instrument(skip(state))]
pub async fn ledger_by_sequence(
    State(state): State<Arc<AppState>>,
    Path(sequence): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sequence: u32 = sequence.parse().map_err(|_| ApiError::BadRequest {
        message: "sequence must be a positive integer".to_string(),
        param: Some("sequence".to_string()),
    })?;

    if state.ledger_state.is_before_history(sequence) {
        return Err(ApiError::Gone {
            message: format!("ledger {} is older than the oldest retained ledger", sequence),
        });
    }

    let ledger = state.db.ledger(sequence).ok_or_else(|| ApiError::NotFound {
        message: crate::Error::LedgerNotFound(sequence).to_string(),
    })?;

    Ok(PrettyJson(LedgerResponse {
        ledger,
        transactions: state.db.transactions_for_ledger(sequence),
    }))
}
