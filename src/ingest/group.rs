//! Ordered fan-out of ledger data to a fixed set of processors.

use std::fmt;

use async_trait::async_trait;

use super::processors::Processor;
use super::{Change, LedgerTransaction};
use crate::Error;

/// Which processor call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Process,
    Commit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Process => write!(f, "in"),
            Operation::Commit => write!(f, "committing"),
        }
    }
}

/// A group of processors that behaves like a single processor.
///
/// Members are invoked strictly in registration order, for processing and for
/// commit alike. The first member to fail stops the fan-out for that call, so
/// later members never see an item an earlier one rejected. The error names
/// the failing member. The group keeps no state besides its members and does
/// not roll anything back.
pub struct ProcessorGroup<T: ?Sized + Sync> {
    stage: &'static str,
    processors: Vec<Box<dyn Processor<T>>>,
}

/// Group over individual ledger entry changes.
pub type ChangeProcessorGroup = ProcessorGroup<Change>;

/// Group over whole ledger transactions.
pub type TransactionProcessorGroup = ProcessorGroup<LedgerTransaction>;

impl<T: ?Sized + Sync> ProcessorGroup<T> {
    pub fn with_stage(stage: &'static str, processors: Vec<Box<dyn Processor<T>>>) -> Self {
        Self { stage, processors }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Commits every member in registration order.
    pub async fn commit(&mut self) -> Result<(), Error> {
        self.fan_out_commit().await
    }

    async fn fan_out_process(&mut self, item: &T) -> Result<(), Error> {
        let stage = self.stage;
        for processor in &mut self.processors {
            processor
                .process(item)
                .await
                .map_err(|e| wrap(stage, Operation::Process, processor.name(), e))?;
        }
        Ok(())
    }

    async fn fan_out_commit(&mut self) -> Result<(), Error> {
        let stage = self.stage;
        for processor in &mut self.processors {
            processor
                .commit()
                .await
                .map_err(|e| wrap(stage, Operation::Commit, processor.name(), e))?;
        }
        Ok(())
    }
}

fn wrap(stage: &'static str, operation: Operation, processor: &str, source: Error) -> Error {
    Error::Processor {
        stage,
        operation,
        processor: processor.to_string(),
        source: Box::new(source),
    }
}

impl ChangeProcessorGroup {
    pub fn new(processors: Vec<Box<dyn Processor<Change>>>) -> Self {
        Self::with_stage("change-processor", processors)
    }

    pub async fn process_change(&mut self, change: &Change) -> Result<(), Error> {
        self.fan_out_process(change).await
    }
}

impl TransactionProcessorGroup {
    pub fn new(processors: Vec<Box<dyn Processor<LedgerTransaction>>>) -> Self {
        Self::with_stage("transaction-processor", processors)
    }

    pub async fn process_transaction(
        &mut self,
        transaction: &LedgerTransaction,
    ) -> Result<(), Error> {
        self.fan_out_process(transaction).await
    }
}

#[async_trait]
impl<T: ?Sized + Sync> Processor<T> for ProcessorGroup<T> {
    fn name(&self) -> &str {
        self.stage
    }

    async fn process(&mut self, item: &T) -> Result<(), Error> {
        self.fan_out_process(item).await
    }

    async fn commit(&mut self) -> Result<(), Error> {
        self.fan_out_commit().await
    }
}
