//! Replica Pool Error Types
//!
//! Opening never retries within one call; when every replica fails the
//! caller gets one error naming each replica and why it was rejected.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Why one replica was rejected during an open attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaFailure {
    /// `host:port` of the replica
    pub endpoint: String,
    pub error: StoreError,
}

impl fmt::Display for ReplicaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Replica pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Descriptor list is empty (or every entry was excluded)
    #[error("no replicas configured")]
    NoReplicasConfigured,

    /// Every candidate replica failed
    #[error("all {} replicas failed: {}", .failures.len(), join_failures(.failures))]
    AllReplicasFailed { failures: Vec<ReplicaFailure> },
}

impl PoolError {
    /// Per-replica failures, empty for `NoReplicasConfigured`.
    pub fn failures(&self) -> &[ReplicaFailure] {
        match self {
            PoolError::NoReplicasConfigured => &[],
            PoolError::AllReplicasFailed { failures } => failures,
        }
    }
}

fn join_failures(failures: &[ReplicaFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
