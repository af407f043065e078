//! Transfer records and query results

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, STATUS_SUCCESS};
use crate::store::StoredTransfer;

/// Which side of a transfer the queried account is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Account is the sender (`from`)
    Outgoing,
    /// Account is the receiver (`to`)
    Incoming,
}

impl Direction {
    /// Wire code used by the HTTP API: `1` send, `2` receive.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Direction::Outgoing),
            2 => Some(Direction::Incoming),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Direction::Outgoing => 1,
            Direction::Incoming => 2,
        }
    }
}

/// A transfer as returned to callers.
///
/// Amount and block height are decimal strings so consumers without 64-bit
/// integers do not lose precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferRecord {
    pub operation_id: String,
    pub from: String,
    pub to: String,
    pub memo: String,
    pub amount: String,
    pub block_height: String,
}

impl From<StoredTransfer> for TransferRecord {
    fn from(t: StoredTransfer) -> Self {
        Self {
            operation_id: t.operation_id,
            from: t.from,
            to: t.to,
            memo: t.memo,
            amount: t.amount.to_string(),
            block_height: t.block_height.to_string(),
        }
    }
}

/// Result of one range or point query. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Matching transfers, ascending by block height
    pub records: Vec<TransferRecord>,
    /// `max(watermark, max stored height)` for range queries, 0 for point queries
    pub watermark: u64,
    /// Highest stored block height the range covered
    pub max_query_block_height: u64,
    pub error: Option<QueryError>,
}

impl QueryResult {
    /// Successful result with no records.
    pub fn empty(watermark: u64, max_query_block_height: u64) -> Self {
        Self {
            records: Vec::new(),
            watermark,
            max_query_block_height,
            error: None,
        }
    }

    pub fn failed(error: QueryError) -> Self {
        Self {
            records: Vec::new(),
            watermark: 0,
            max_query_block_height: 0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Successful and nothing matched. Not an error.
    pub fn is_empty(&self) -> bool {
        self.is_ok() && self.records.is_empty()
    }

    /// Status code for the wire: 200 on success, the error's code otherwise.
    pub fn status_code(&self) -> u16 {
        self.error.as_ref().map_or(STATUS_SUCCESS, QueryError::code)
    }
}
