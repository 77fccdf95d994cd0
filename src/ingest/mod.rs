//! Ledger ingestion: the data produced by closing a ledger, the processors
//! that turn it into queryable rows, and the per-ledger pipeline that drives
//! them.

pub mod genesis;
pub mod group;
pub mod processors;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use stellar_xdr::curr::{
    LedgerEntry, LedgerEntryType, TransactionResult, TransactionResultPair,
    TransactionResultResult,
};

use crate::db::HistoryDb;
use crate::ledger::FIRST_LEDGER;
use crate::Error;
use group::{ChangeProcessorGroup, TransactionProcessorGroup};
use processors::{AccountsProcessor, LedgersProcessor, TransactionsProcessor};

/// Kind of mutation a [`Change`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Updated,
    Removed,
}

/// A single ledger entry mutation: the entry before and after the ledger
/// closed. A created entry has no `pre`, a removed entry has no `post`.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    entry_type: LedgerEntryType,
    pre: Option<LedgerEntry>,
    post: Option<LedgerEntry>,
}

impl Change {
    pub fn created(post: LedgerEntry) -> Self {
        Self {
            entry_type: post.data.discriminant(),
            pre: None,
            post: Some(post),
        }
    }

    pub fn updated(pre: LedgerEntry, post: LedgerEntry) -> Self {
        Self {
            entry_type: post.data.discriminant(),
            pre: Some(pre),
            post: Some(post),
        }
    }

    pub fn removed(pre: LedgerEntry) -> Self {
        Self {
            entry_type: pre.data.discriminant(),
            pre: Some(pre),
            post: None,
        }
    }

    pub fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }

    pub fn pre(&self) -> Option<&LedgerEntry> {
        self.pre.as_ref()
    }

    pub fn post(&self) -> Option<&LedgerEntry> {
        self.post.as_ref()
    }

    pub fn change_type(&self) -> ChangeType {
        match (&self.pre, &self.post) {
            (None, _) => ChangeType::Created,
            (Some(_), Some(_)) => ChangeType::Updated,
            (Some(_), None) => ChangeType::Removed,
        }
    }
}

/// All entry changes produced by closing one ledger, in application order.
pub type ChangeBatch = Vec<Change>;

/// A transaction applied in a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    /// 1-based position of the transaction within its ledger.
    pub index: u32,
    pub hash: [u8; 32],
    pub result: TransactionResult,
}

impl LedgerTransaction {
    pub fn from_result_pair(index: u32, pair: TransactionResultPair) -> Self {
        Self {
            index,
            hash: pair.transaction_hash.0,
            result: pair.result,
        }
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn successful(&self) -> bool {
        matches!(
            self.result.result,
            TransactionResultResult::TxSuccess(_)
                | TransactionResultResult::TxFeeBumpInnerSuccess(_)
        )
    }

    pub fn fee_charged(&self) -> i64 {
        self.result.fee_charged
    }

    /// Number of operation results recorded for the transaction.
    pub fn operation_count(&self) -> u32 {
        match &self.result.result {
            TransactionResultResult::TxSuccess(ops) | TransactionResultResult::TxFailed(ops) => {
                ops.len() as u32
            }
            _ => 0,
        }
    }
}

/// Everything ingestion needs from one closed ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub sequence: u32,
    pub closed_at: DateTime<Utc>,
    pub changes: ChangeBatch,
    pub transactions: Vec<LedgerTransaction>,
}

/// Apply one ledger to the history database.
///
/// The processor groups are assembled fresh for this ledger. Every change is
/// fed to the change group (preceded by the root account's creation for the
/// first ledger), then every transaction to the transaction group;
/// each group is committed only after all of its input was processed. The
/// first failure aborts the ledger and is returned as is: retrying or halting
/// is up to the caller.
#[tracing::instrument(skip_all, fields(ledger = ledger.sequence))]
pub async fn process_ledger(
    db: &Arc<HistoryDb>,
    ledger: &Ledger,
    network_passphrase: &str,
) -> Result<(), Error> {
    let mut change_group = ChangeProcessorGroup::new(vec![Box::new(AccountsProcessor::new(
        Arc::clone(db),
        ledger.sequence,
    ))]);
    if ledger.sequence == FIRST_LEDGER {
        change_group
            .process_change(&genesis::genesis_change(network_passphrase))
            .await?;
    }
    for change in &ledger.changes {
        change_group.process_change(change).await?;
    }
    change_group.commit().await?;

    let mut transaction_group = TransactionProcessorGroup::new(vec![
        Box::new(LedgersProcessor::new(
            Arc::clone(db),
            ledger.sequence,
            ledger.closed_at,
        )),
        Box::new(TransactionsProcessor::new(Arc::clone(db), ledger.sequence)),
    ]);
    for transaction in &ledger.transactions {
        transaction_group.process_transaction(transaction).await?;
    }
    transaction_group.commit().await?;

    tracing::debug!(
        changes = ledger.changes.len(),
        transactions = ledger.transactions.len(),
        "ingested ledger"
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use stellar_xdr::curr::{
        AccountEntry, AccountEntryExt, AccountId, Hash, LedgerEntry, LedgerEntryData,
        LedgerEntryExt, OperationResult, PublicKey, SequenceNumber, String32, Thresholds,
        TransactionResult, TransactionResultExt, TransactionResultPair,
        TransactionResultResult, Uint256, VecM,
    };

    use super::LedgerTransaction;

    pub fn account_entry(key_byte: u8, balance: i64, last_modified: u32) -> LedgerEntry {
        LedgerEntry {
            last_modified_ledger_seq: last_modified,
            data: LedgerEntryData::Account(AccountEntry {
                account_id: AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([key_byte; 32]))),
                balance,
                seq_num: SequenceNumber(1),
                num_sub_entries: 0,
                inflation_dest: None,
                flags: 0,
                home_domain: String32::default(),
                thresholds: Thresholds([1, 0, 0, 0]),
                signers: VecM::default(),
                ext: AccountEntryExt::V0,
            }),
            ext: LedgerEntryExt::V0,
        }
    }

    pub fn transaction(index: u32, successful: bool, fee: i64) -> LedgerTransaction {
        let ops: VecM<OperationResult> = VecM::default();
        let result = if successful {
            TransactionResultResult::TxSuccess(ops)
        } else {
            TransactionResultResult::TxFailed(ops)
        };
        LedgerTransaction::from_result_pair(
            index,
            TransactionResultPair {
                transaction_hash: Hash([index as u8; 32]),
                result: TransactionResult {
                    fee_charged: fee,
                    result,
                    ext: TransactionResultExt::V0,
                },
            },
        )
    }
}
