use std::sync::Arc;

use async_trait::async_trait;

use super::Processor;
use crate::amount::Amount;
use crate::db::{HistoryDb, TransactionRow};
use crate::ingest::LedgerTransaction;
use crate::Error;

/// Writes one row per applied transaction, in application order.
pub struct TransactionsProcessor {
    db: Arc<HistoryDb>,
    ledger_sequence: u32,
    rows: Vec<TransactionRow>,
}

impl TransactionsProcessor {
    pub fn new(db: Arc<HistoryDb>, ledger_sequence: u32) -> Self {
        Self {
            db,
            ledger_sequence,
            rows: Vec::new(),
        }
    }
}

#[async_trait]
impl Processor<LedgerTransaction> for TransactionsProcessor {
    fn name(&self) -> &str {
        "transactions"
    }

    async fn process(&mut self, transaction: &LedgerTransaction) -> Result<(), Error> {
        if transaction.fee_charged() < 0 {
            return Err(Error::Internal(format!(
                "transaction {} charged a negative fee",
                transaction.hash_hex()
            )));
        }
        self.rows.push(TransactionRow {
            hash: transaction.hash_hex(),
            ledger_sequence: self.ledger_sequence,
            application_order: transaction.index,
            successful: transaction.successful(),
            fee_charged: Amount::from_raw(transaction.fee_charged()),
            operation_count: transaction.operation_count(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Error> {
        let rows = std::mem::take(&mut self.rows);
        self.db.insert_transactions(self.ledger_sequence, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testutil::transaction;

    #[tokio::test]
    async fn test_rows_keep_application_order() {
        let db = Arc::new(HistoryDb::new());
        let mut processor = TransactionsProcessor::new(Arc::clone(&db), 12);

        processor.process(&transaction(1, true, 100)).await.unwrap();
        processor.process(&transaction(2, false, 300)).await.unwrap();
        processor.commit().await.unwrap();

        let rows = db.transactions_for_ledger(12);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].application_order, 1);
        assert_eq!(rows[1].hash, "02".repeat(32));
        assert!(!rows[1].successful);
        assert_eq!(rows[1].fee_charged.to_string(), "0.000300");
    }

    #[tokio::test]
    async fn test_negative_fee_rejected() {
        let db = Arc::new(HistoryDb::new());
        let mut processor = TransactionsProcessor::new(db, 12);
        let err = processor.process(&transaction(1, true, -1)).await.unwrap_err();
        assert!(err.to_string().contains("negative fee"));
    }
}
