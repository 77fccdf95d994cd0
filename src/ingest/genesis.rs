//! State of the first ledger, which no ledger-close feed carries.

use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountEntry, AccountEntryExt, AccountId, LedgerEntry, LedgerEntryData, LedgerEntryExt,
    PublicKey, SequenceNumber, String32, Thresholds, Uint256, VecM,
};

use super::Change;
use crate::ledger::FIRST_LEDGER;

/// Raw balance of the root account in the first ledger.
pub const GENESIS_BALANCE: i64 = 1_000_000_000_000_000_000;

/// Public key of the root account, whose seed is the hash of the network
/// passphrase.
pub fn root_account_id(network_passphrase: &str) -> AccountId {
    let seed: [u8; 32] = Sha256::digest(network_passphrase.as_bytes()).into();
    let public = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(public)))
}

/// The creation of the root account, the only entry of the first ledger.
pub fn genesis_change(network_passphrase: &str) -> Change {
    Change::created(LedgerEntry {
        last_modified_ledger_seq: FIRST_LEDGER,
        data: LedgerEntryData::Account(AccountEntry {
            account_id: root_account_id(network_passphrase),
            balance: GENESIS_BALANCE,
            seq_num: SequenceNumber(0),
            num_sub_entries: 0,
            inflation_dest: None,
            flags: 0,
            home_domain: String32::default(),
            thresholds: Thresholds([1, 0, 0, 0]),
            signers: VecM::default(),
            ext: AccountEntryExt::V0,
        }),
        ext: LedgerEntryExt::V0,
    })
}
