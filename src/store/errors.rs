//! Ledger store errors

use std::time::Duration;

use thiserror::Error;

/// Result type for ledger store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a replica connector or an open ledger connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Descriptor names a driver this build cannot speak
    #[error("unsupported driver '{0}'")]
    UnsupportedDriver(String),

    /// Replica refused or could not be reached
    #[error("connect failed: {0}")]
    Connect(String),

    /// Operation exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The single-row watermark table is empty
    #[error("watermark row missing")]
    WatermarkMissing,

    /// A read failed for a reason other than "no rows"
    #[error("query failed: {0}")]
    Query(String),

    /// Connection was released before the call
    #[error("connection closed")]
    Closed,
}
