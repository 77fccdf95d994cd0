//! History reaping: removes ledgers older than the retention window so the
//! history store does not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::HistoryStore;
use crate::ledger::{self, FIRST_LEDGER};
use crate::Error;

/// The history reaping subsystem.
pub struct System {
    store: Arc<dyn HistoryStore>,
    /// Number of most recent ledgers to keep. 0 keeps everything.
    retention_count: u32,
    ledger_state: Arc<ledger::State>,
}

impl System {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        retention_count: u32,
        ledger_state: Arc<ledger::State>,
    ) -> Self {
        Self {
            store,
            retention_count,
            ledger_state,
        }
    }

    pub fn retention_count(&self) -> u32 {
        self.retention_count
    }

    /// Delete every ledger older than the retention window and advance
    /// `history_elder` to the new oldest retained ledger.
    ///
    /// Returns the number of ledgers deleted.
    pub async fn delete_unretained_history(&self) -> Result<u64, Error> {
        if self.retention_count == 0 {
            return Ok(0);
        }

        let history = self.ledger_state.current_status().history;
        let Some(cutoff) = cutoff(history.history_latest, self.retention_count) else {
            return Ok(0);
        };

        let deleted = self.store.delete_ledgers_before(cutoff).await?;
        self.ledger_state.advance_history_elder(cutoff);

        metrics::counter!("reap_deleted_ledgers_total").increment(deleted);
        tracing::info!(
            new_elder = cutoff,
            deleted,
            retention_count = self.retention_count,
            "reaper succeeded"
        );
        Ok(deleted)
    }

    /// Reap every `interval` until `cancel` fires. Failures are logged and
    /// retried on the next tick.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("reaper stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.delete_unretained_history().await {
                tracing::warn!(error = %e, "reaper failed");
            }
        }
    }
}

/// First sequence to keep, or `None` when there is nothing to delete.
fn cutoff(history_latest: u32, retention_count: u32) -> Option<u32> {
    if history_latest == 0 {
        return None;
    }
    let cutoff = history_latest.saturating_sub(retention_count).max(FIRST_LEDGER);
    (cutoff > FIRST_LEDGER).then_some(cutoff)
}
