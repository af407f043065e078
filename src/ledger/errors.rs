//! Query Errors
//!
//! Every query failure reaches the caller as a structured error with a
//! numeric code; none of them is fatal to the process. "No matching rows" is
//! not an error.

use thiserror::Error;

use crate::store::StoreError;

/// Query answered
pub const STATUS_SUCCESS: u16 = 200;
/// No replica connection available
pub const STATUS_INTERNAL_ERROR: u16 = 500;
/// Watermark row unreadable
pub const STATUS_WATERMARK_ERROR: u16 = 501;
/// Transfer table read failed
pub const STATUS_TRANSFER_RECORD_ERROR: u16 = 502;

/// Query failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No replica reachable
    #[error("system error, no ledger replica connection available")]
    ConnectionUnavailable,

    /// `libinfo` row unreadable
    #[error("fail to get lib: {0}")]
    WatermarkRead(StoreError),

    /// Transfer read failed
    #[error("fail to get transfer record: {0}")]
    Query(StoreError),
}

impl QueryError {
    pub fn code(&self) -> u16 {
        match self {
            QueryError::ConnectionUnavailable => STATUS_INTERNAL_ERROR,
            QueryError::WatermarkRead(_) => STATUS_WATERMARK_ERROR,
            QueryError::Query(_) => STATUS_TRANSFER_RECORD_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(QueryError::ConnectionUnavailable.code(), 500);
        assert_eq!(QueryError::WatermarkRead(StoreError::Closed).code(), 501);
        assert_eq!(
            QueryError::Query(StoreError::Query("boom".to_string())).code(),
            502
        );
    }

    #[test]
    fn test_message_keeps_store_cause() {
        let err = QueryError::Query(StoreError::Query("deadlock".to_string()));
        assert_eq!(err.to_string(), "fail to get transfer record: query failed: deadlock");
    }
}
