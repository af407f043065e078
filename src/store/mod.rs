//! Ledger Store Access
//!
//! The ledger store is maintained by an external chain indexer; this crate
//! only reads it. Two tables matter:
//!
//! - `libinfo`: a single row holding the last irreversible block the indexer
//!   has fully applied (the watermark)
//! - `transfer_records`: append-only transfer events, indexed by block height
//!   and by sender / receiver account
//!
//! The wire protocol is hidden behind [`ReplicaConnector`] and
//! [`LedgerConnection`]. [`MySqlConnector`] talks to real replicas;
//! [`MemoryConnector`] backs tests.

mod errors;
mod memory;
mod mysql;

use std::future::Future;
use std::pin::Pin;

pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryConnector, MemoryReplica};
pub use mysql::MySqlConnector;

use crate::ledger::Direction;
use crate::replication::ReplicaDescriptor;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Which block heights a transfer read covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSelector {
    /// Inclusive range `[start, end]`
    Range { start: u64, end: u64 },
    /// A single block
    Exact(u64),
}

impl BlockSelector {
    /// Whether `height` falls inside the selection.
    pub fn contains(&self, height: u64) -> bool {
        match *self {
            BlockSelector::Range { start, end } => start <= height && height <= end,
            BlockSelector::Exact(h) => h == height,
        }
    }
}

/// Filter for a transfer read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFilter {
    pub blocks: BlockSelector,
    pub account: String,
    pub direction: Direction,
}

impl TransferFilter {
    pub fn new(blocks: BlockSelector, account: impl Into<String>, direction: Direction) -> Self {
        Self {
            blocks,
            account: account.into(),
            direction,
        }
    }

    /// Whether a stored transfer satisfies the filter.
    pub fn matches(&self, transfer: &StoredTransfer) -> bool {
        let party = match self.direction {
            Direction::Outgoing => &transfer.from,
            Direction::Incoming => &transfer.to,
        };
        self.blocks.contains(transfer.block_height) && *party == self.account
    }
}

/// A transfer row as stored by the indexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransfer {
    pub operation_id: String,
    pub from: String,
    pub to: String,
    pub memo: String,
    pub amount: u64,
    pub block_height: u64,
}

impl StoredTransfer {
    pub fn new(
        operation_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        memo: impl Into<String>,
        amount: u64,
        block_height: u64,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            from: from.into(),
            to: to.into(),
            memo: memo.into(),
            amount,
            block_height,
        }
    }
}

/// An open, read-only connection to one ledger replica.
///
/// Implementations must be safe to share: many queries may read through the
/// same connection concurrently.
pub trait LedgerConnection: Send + Sync {
    /// Current watermark from the `libinfo` row.
    fn watermark(&self) -> StoreFuture<'_, u64>;

    /// Highest block height in `transfer_records`, `None` when the table is empty.
    fn max_block_height(&self) -> StoreFuture<'_, Option<u64>>;

    /// Transfers matching `filter`, ascending by block height then operation id.
    fn transfers(&self, filter: TransferFilter) -> StoreFuture<'_, Vec<StoredTransfer>>;

    /// Release the underlying resources. Further reads fail with `Closed`.
    fn close(&self) -> StoreFuture<'_, ()>;
}

/// Opens connections to replicas described by configuration.
pub trait ReplicaConnector: Send + Sync {
    fn connect<'a>(
        &'a self,
        descriptor: &'a ReplicaDescriptor,
    ) -> StoreFuture<'a, Box<dyn LedgerConnection>>;
}
