use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use stellar_xdr::curr::{AccountEntry, AccountId, LedgerEntryData, LedgerEntryType, PublicKey};

use super::Processor;
use crate::amount::Amount;
use crate::db::{AccountRow, HistoryDb};
use crate::ingest::Change;
use crate::Error;

/// Maintains the current state of every account.
pub struct AccountsProcessor {
    db: Arc<HistoryDb>,
    ledger_sequence: u32,
    /// Latest state per account address; `None` marks a removal.
    pending: HashMap<String, Option<AccountRow>>,
}

impl AccountsProcessor {
    pub fn new(db: Arc<HistoryDb>, ledger_sequence: u32) -> Self {
        Self {
            db,
            ledger_sequence,
            pending: HashMap::new(),
        }
    }
}

/// Render an account ID as a `G...` strkey.
pub(crate) fn account_address(id: &AccountId) -> String {
    match &id.0 {
        PublicKey::PublicKeyTypeEd25519(key) => stellar_strkey::ed25519::PublicKey(key.0).to_string(),
    }
}

fn account_row(account: &AccountEntry, last_modified_ledger: u32) -> AccountRow {
    AccountRow {
        account_id: account_address(&account.account_id),
        balance: Amount::from_raw(account.balance),
        sequence: account.seq_num.0,
        last_modified_ledger,
    }
}

#[async_trait]
impl Processor<Change> for AccountsProcessor {
    fn name(&self) -> &str {
        "accounts"
    }

    async fn process(&mut self, change: &Change) -> Result<(), Error> {
        if change.entry_type() != LedgerEntryType::Account {
            return Ok(());
        }

        let entry = match change.post().or(change.pre()) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        let LedgerEntryData::Account(account) = &entry.data else {
            return Err(Error::Internal(format!(
                "account change carries {} entry",
                entry.data.name()
            )));
        };

        let row = account_row(account, entry.last_modified_ledger_seq);
        if change.post().is_some() {
            self.pending.insert(row.account_id.clone(), Some(row));
        } else {
            self.pending.insert(row.account_id, None);
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Error> {
        let count = self.pending.len();
        for (account_id, row) in self.pending.drain() {
            match row {
                Some(row) => self.db.upsert_account(row),
                None => self.db.remove_account(&account_id),
            }
        }
        tracing::trace!(ledger = self.ledger_sequence, accounts = count, "committed accounts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testutil::account_entry;

    fn address(key_byte: u8) -> String {
        stellar_strkey::ed25519::PublicKey([key_byte; 32]).to_string()
    }

    #[test]
    fn test_account_address_is_strkey() {
        let addr = address(7);
        assert!(addr.starts_with('G'));
        assert_eq!(addr.len(), 56);
    }

    #[tokio::test]
    async fn test_nothing_written_before_commit() {
        let db = Arc::new(HistoryDb::new());
        let mut processor = AccountsProcessor::new(Arc::clone(&db), 10);

        processor
            .process(&Change::created(account_entry(1, 15_000_000, 10)))
            .await
            .unwrap();
        assert_eq!(db.account_count(), 0);

        processor.commit().await.unwrap();
        let row = db.account(&address(1)).unwrap();
        assert_eq!(row.balance.to_string(), "15.000000");
        assert_eq!(row.last_modified_ledger, 10);
    }

    #[tokio::test]
    async fn test_last_change_in_ledger_wins() {
        let db = Arc::new(HistoryDb::new());
        let mut processor = AccountsProcessor::new(Arc::clone(&db), 11);

        processor
            .process(&Change::created(account_entry(1, 100, 11)))
            .await
            .unwrap();
        processor
            .process(&Change::updated(account_entry(1, 100, 11), account_entry(1, 250, 11)))
            .await
            .unwrap();
        processor
            .process(&Change::created(account_entry(2, 5, 11)))
            .await
            .unwrap();
        processor
            .process(&Change::removed(account_entry(2, 5, 11)))
            .await
            .unwrap();
        processor.commit().await.unwrap();

        assert_eq!(db.account(&address(1)).unwrap().balance, Amount::from_raw(250));
        assert!(db.account(&address(2)).is_none());
    }
}
