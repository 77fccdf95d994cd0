pub mod amount;
pub mod api;
pub mod db;
pub mod health;
pub mod ingest;
pub mod ledger;
pub mod reap;
pub mod stellarcore;
pub mod sync;
pub mod txsub;

use std::sync::Arc;

use db::HistoryDb;

/// Shared application state.
pub struct AppState {
    pub db: Arc<HistoryDb>,
    pub ledger_state: Arc<ledger::State>,
    pub health: health::HealthCheck,
    /// `None` when transaction submission is disabled.
    pub submitter: Option<Arc<dyn txsub::Submitter>>,
}

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Amount(#[from] amount::AmountError),

    /// A member of a processor group failed; `processor` names it.
    #[error("error {operation} {stage}[{processor}]: {source}")]
    Processor {
        stage: &'static str,
        operation: ingest::group::Operation,
        processor: String,
        source: Box<Error>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("ledger {0} not found")]
    LedgerNotFound(u32),

    #[error("internal error: {0}")]
    Internal(String),
}
