//! Processors that build the history projections from one ledger.
//!
//! A processor is created for a single ledger, fed that ledger's items, then
//! committed once. It buffers what it learns and only writes on commit.

mod accounts;
mod ledgers;
mod transactions;

use async_trait::async_trait;

use crate::Error;

pub(crate) use accounts::account_address;
pub use accounts::AccountsProcessor;
pub use ledgers::LedgersProcessor;
pub use transactions::TransactionsProcessor;

/// A stateful consumer of one ledger's items of type `T`.
#[async_trait]
pub trait Processor<T: ?Sized + Sync>: Send {
    /// Name used to identify the processor in errors.
    fn name(&self) -> &str;

    async fn process(&mut self, item: &T) -> Result<(), Error>;

    /// Persist everything buffered for the ledger.
    async fn commit(&mut self) -> Result<(), Error>;
}
