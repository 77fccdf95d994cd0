use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::amount::Amount;
use crate::Error;

/// Storage operations the ingestion core relies on outside of processors.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Check that storage is reachable within `timeout`.
    async fn ping(&self, timeout: Duration) -> Result<(), Error>;

    /// Delete every ledger-scoped row for sequences strictly below `cutoff`.
    /// Returns the number of ledgers removed. Running it again with the same
    /// or a lower cutoff deletes nothing new.
    async fn delete_ledgers_before(&self, cutoff: u32) -> Result<u64, Error>;
}

/// An ingested ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub sequence: u32,
    pub closed_at: DateTime<Utc>,
    pub successful_transaction_count: u32,
    pub failed_transaction_count: u32,
    pub operation_count: u32,
}

/// A transaction applied in an ingested ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    pub hash: String,
    pub ledger_sequence: u32,
    pub application_order: u32,
    pub successful: bool,
    pub fee_charged: Amount,
    pub operation_count: u32,
}

/// Current state of an account. Not ledger-scoped, so never reaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRow {
    pub account_id: String,
    pub balance: Amount,
    pub sequence: i64,
    pub last_modified_ledger: u32,
}

/// In-memory history database.
///
/// Ledger and transaction rows are keyed by ledger sequence so reaping can
/// drop whole ledgers. Writers for new ledgers and readers of any ledger may
/// run concurrently with a reap.
#[derive(Debug, Default)]
pub struct HistoryDb {
    ledgers: DashMap<u32, LedgerRow>,
    transactions: DashMap<u32, Vec<TransactionRow>>,
    accounts: DashMap<String, AccountRow>,
}

impl HistoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ledger row.
    pub fn insert_ledger(&self, row: LedgerRow) {
        self.ledgers.insert(row.sequence, row);
    }

    /// Replace all transaction rows of a ledger.
    pub fn insert_transactions(&self, ledger_sequence: u32, rows: Vec<TransactionRow>) {
        self.transactions.insert(ledger_sequence, rows);
    }

    pub fn upsert_account(&self, row: AccountRow) {
        self.accounts.insert(row.account_id.clone(), row);
    }

    pub fn remove_account(&self, account_id: &str) {
        self.accounts.remove(account_id);
    }

    pub fn ledger(&self, sequence: u32) -> Option<LedgerRow> {
        self.ledgers.get(&sequence).map(|row| row.clone())
    }

    pub fn transactions_for_ledger(&self, sequence: u32) -> Vec<TransactionRow> {
        self.transactions
            .get(&sequence)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    pub fn account(&self, account_id: &str) -> Option<AccountRow> {
        self.accounts.get(account_id).map(|row| row.clone())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    /// Get the highest ingested ledger sequence.
    pub fn latest_ledger_sequence(&self) -> Option<u32> {
        self.ledgers.iter().map(|entry| *entry.key()).max()
    }

    /// Get the lowest retained ledger sequence.
    pub fn elder_ledger_sequence(&self) -> Option<u32> {
        self.ledgers.iter().map(|entry| *entry.key()).min()
    }
}

#[async_trait]
impl HistoryStore for HistoryDb {
    async fn ping(&self, _timeout: Duration) -> Result<(), Error> {
        Ok(())
    }

    async fn delete_ledgers_before(&self, cutoff: u32) -> Result<u64, Error> {
        let mut deleted = 0u64;
        self.ledgers.retain(|sequence, _| {
            let keep = *sequence >= cutoff;
            if !keep {
                deleted += 1;
            }
            keep
        });
        self.transactions.retain(|sequence, _| *sequence >= cutoff);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ledger_row(sequence: u32) -> LedgerRow {
        LedgerRow {
            sequence,
            closed_at: Utc.timestamp_opt(1_700_000_000 + i64::from(sequence) * 5, 0).unwrap(),
            successful_transaction_count: 1,
            failed_transaction_count: 0,
            operation_count: 1,
        }
    }

    fn transaction_row(ledger_sequence: u32) -> TransactionRow {
        TransactionRow {
            hash: format!("{:064x}", ledger_sequence),
            ledger_sequence,
            application_order: 1,
            successful: true,
            fee_charged: Amount::from_raw(100),
            operation_count: 1,
        }
    }

    #[tokio::test]
    async fn test_delete_ledgers_before_cutoff() {
        let db = HistoryDb::new();
        for seq in 1..=10 {
            db.insert_ledger(ledger_row(seq));
            db.insert_transactions(seq, vec![transaction_row(seq)]);
        }

        assert_eq!(db.delete_ledgers_before(6).await.unwrap(), 5);
        assert_eq!(db.elder_ledger_sequence(), Some(6));
        assert_eq!(db.latest_ledger_sequence(), Some(10));
        assert!(db.transactions_for_ledger(5).is_empty());
        assert_eq!(db.transactions_for_ledger(6).len(), 1);

        // Same or lower cutoff is a no-op.
        assert_eq!(db.delete_ledgers_before(6).await.unwrap(), 0);
        assert_eq!(db.delete_ledgers_before(3).await.unwrap(), 0);
        assert_eq!(db.ledger_count(), 5);
    }

    #[test]
    fn test_accounts_upsert_and_remove() {
        let db = HistoryDb::new();
        let mut row = AccountRow {
            account_id: "GA".to_string(),
            balance: Amount::from_raw(10),
            sequence: 1,
            last_modified_ledger: 3,
        };
        db.upsert_account(row.clone());
        row.balance = Amount::from_raw(20);
        db.upsert_account(row.clone());
        assert_eq!(db.account("GA"), Some(row));
        db.remove_account("GA");
        assert_eq!(db.account("GA"), None);
    }

    #[test]
    fn test_empty_db_has_no_range() {
        let db = HistoryDb::new();
        assert_eq!(db.latest_ledger_sequence(), None);
        assert_eq!(db.elder_ledger_sequence(), None);
    }
}
