use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::db::HistoryDb;
use crate::ingest::{self, Ledger};
use crate::ledger::{self, CoreStatus, HistoryStatus};
use crate::stellarcore::CoreInfo;
use crate::Error;

/// How often to poll for a ledger that has not closed yet.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Source of closed ledgers, one per sequence.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Fetch the ledger with `sequence`. Returns [`Error::LedgerNotFound`]
    /// while the ledger has not closed yet.
    async fn ledger(&self, sequence: u32) -> Result<Ledger, Error>;
}

/// Ledger source backed by memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerSource {
    ledgers: DashMap<u32, Ledger>,
}

impl MemoryLedgerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, ledger: Ledger) {
        self.ledgers.insert(ledger.sequence, ledger);
    }
}

#[async_trait]
impl LedgerSource for MemoryLedgerSource {
    async fn ledger(&self, sequence: u32) -> Result<Ledger, Error> {
        self.ledgers
            .get(&sequence)
            .map(|ledger| ledger.clone())
            .ok_or(Error::LedgerNotFound(sequence))
    }
}

/// Fetch, process and publish a single ledger.
#[tracing::instrument(skip(source, db, state, network_passphrase))]
pub async fn ingest_one(
    source: &dyn LedgerSource,
    db: &Arc<HistoryDb>,
    state: &ledger::State,
    network_passphrase: &str,
    sequence: u32,
) -> Result<(), Error> {
    let ledger = source.ledger(sequence).await?;
    ingest::process_ledger(db, &ledger, network_passphrase).await?;
    state.record_ingested(ledger.sequence, ledger.closed_at);
    Ok(())
}

/// Publish the range of ledgers already stored in `db`, if any.
pub fn publish_stored_range(db: &HistoryDb, state: &ledger::State) {
    let (Some(history_elder), Some(history_latest)) =
        (db.elder_ledger_sequence(), db.latest_ledger_sequence())
    else {
        return;
    };
    state.set_history_status(HistoryStatus {
        history_latest,
        history_latest_closed_at: db.ledger(history_latest).map(|row| row.closed_at),
        history_elder,
    });
}

/// Background task that ingests ledgers in order until cancelled.
///
/// Resumes after the latest ledger already in `db`, or at `start_ledger` for
/// an empty database. The stored range is published before the first ledger. A ledger that fails is retried with exponential backoff;
/// later ledgers are never ingested ahead of it.
pub async fn run_ingestion(
    source: Arc<dyn LedgerSource>,
    db: Arc<HistoryDb>,
    state: Arc<ledger::State>,
    network_passphrase: String,
    start_ledger: u32,
    cancel: CancellationToken,
) {
    publish_stored_range(&db, &state);
    let mut current_ledger = match db.latest_ledger_sequence() {
        Some(seq) => seq + 1,
        None => start_ledger,
    };
    tracing::info!(start = current_ledger, "starting ledger ingestion");

    let mut consecutive_failures = 0u32;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let delay = match ingest_one(source.as_ref(), &db, &state, &network_passphrase, current_ledger).await {
            Ok(()) => {
                tracing::info!(ledger = current_ledger, "ingested ledger");
                current_ledger += 1;
                consecutive_failures = 0;
                None
            }
            Err(Error::LedgerNotFound(_)) => {
                tracing::debug!(ledger = current_ledger, "ledger not yet available, waiting");
                Some(POLL_INTERVAL)
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    ledger = current_ledger,
                    error = %e,
                    consecutive_failures,
                    "failed to ingest ledger"
                );
                Some(backoff(consecutive_failures))
            }
        };

        if let Some(delay) = delay {
            if !sleep_or_cancel(delay, &cancel).await {
                break;
            }
        }
    }

    tracing::info!(next = current_ledger, "ledger ingestion stopped");
}

/// Background task that publishes the core node's latest ledger.
pub async fn run_core_poller(
    core: Arc<dyn CoreInfo>,
    state: Arc<ledger::State>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut consecutive_failures = 0u32;

    loop {
        let delay = match core.info().await {
            Ok(info) => {
                consecutive_failures = 0;
                if let Some(core_latest) = info.latest_ledger() {
                    state.set_core_status(CoreStatus { core_latest });
                    tracing::trace!(core_latest, "updated core status");
                }
                interval
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(error = %e, consecutive_failures, "failed to load core info");
                backoff(consecutive_failures)
            }
        };

        if !sleep_or_cancel(delay, &cancel).await {
            break;
        }
    }
}

fn backoff(consecutive_failures: u32) -> Duration {
    Duration::from_secs((2u64.pow(consecutive_failures.min(6))).min(60))
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
