//! Service lifecycle errors

use thiserror::Error;

use crate::replication::PoolError;

/// Failures from [`TransferHistoryService`](super::TransferHistoryService) lifecycle calls
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service already running")]
    AlreadyRunning,

    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),

    /// No replica accepted a connection at startup
    #[error("no ledger replica available: {0}")]
    NoReplica(#[from] PoolError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
