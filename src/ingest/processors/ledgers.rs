use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Processor;
use crate::db::{HistoryDb, LedgerRow};
use crate::ingest::LedgerTransaction;
use crate::Error;

/// Writes one summary row per ledger.
pub struct LedgersProcessor {
    db: Arc<HistoryDb>,
    sequence: u32,
    closed_at: DateTime<Utc>,
    successful: u32,
    failed: u32,
    operations: u32,
}

impl LedgersProcessor {
    pub fn new(db: Arc<HistoryDb>, sequence: u32, closed_at: DateTime<Utc>) -> Self {
        Self {
            db,
            sequence,
            closed_at,
            successful: 0,
            failed: 0,
            operations: 0,
        }
    }
}

#[async_trait]
impl Processor<LedgerTransaction> for LedgersProcessor {
    fn name(&self) -> &str {
        "ledgers"
    }

    async fn process(&mut self, transaction: &LedgerTransaction) -> Result<(), Error> {
        if transaction.successful() {
            self.successful += 1;
            self.operations += transaction.operation_count();
        } else {
            self.failed += 1;
        }
        Ok(())
    }

    /// Writes the row even for a ledger without transactions.
    async fn commit(&mut self) -> Result<(), Error> {
        self.db.insert_ledger(LedgerRow {
            sequence: self.sequence,
            closed_at: self.closed_at,
            successful_transaction_count: self.successful,
            failed_transaction_count: self.failed,
            operation_count: self.operations,
        });
        Ok(())
    }
}
