use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// State text core reports once it tracks the network.
pub const SYNCED_STATE: &str = "Synced!";

/// Status values the core node's `/tx` endpoint answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    /// The transaction was rejected; the response carries its result XDR.
    Error,
    /// Accepted for inclusion in an upcoming ledger.
    Pending,
    /// Already known to core.
    Duplicate,
    /// Core is shedding load or the transaction was recently banned.
    TryAgainLater,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Error => "ERROR",
            TxStatus::Pending => "PENDING",
            TxStatus::Duplicate => "DUPLICATE",
            TxStatus::TryAgainLater => "TRY_AGAIN_LATER",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERROR" => Ok(TxStatus::Error),
            "PENDING" => Ok(TxStatus::Pending),
            "DUPLICATE" => Ok(TxStatus::Duplicate),
            "TRY_AGAIN_LATER" => Ok(TxStatus::TryAgainLater),
            _ => Err(()),
        }
    }
}

/// Body of a `/tx` response.
///
/// `status` is kept as raw text so unknown values can be reported verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub exception: String,
    /// Base64 `TransactionResult` XDR, present when `status` is `ERROR`.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl TxResponse {
    pub fn is_exception(&self) -> bool {
        !self.exception.is_empty()
    }
}

/// Body of an `/info` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfoResponse {
    pub info: Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ledger: Option<InfoLedger>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InfoLedger {
    pub num: u32,
}

impl InfoResponse {
    pub fn is_synced(&self) -> bool {
        self.info.state == SYNCED_STATE
    }

    /// Latest ledger core has closed, if it reported one.
    pub fn latest_ledger(&self) -> Option<u32> {
        self.info.ledger.map(|ledger| ledger.num)
    }
}
