//! Ledger progress tracking shared by ingestion, reaping and request handlers.
//!
//! Keep this module free of dependencies on the rest of the crate: it sits at
//! the bottom of the dependency tree.

pub mod state;

pub use state::{CoreStatus, HistoryStatus, State, Status};

/// Sequence number of the network's first ledger.
pub const FIRST_LEDGER: u32 = 1;
