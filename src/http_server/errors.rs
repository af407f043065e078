//! HTTP request errors
//!
//! Parameter problems are reported in the response body's `Status` field
//! next to the query error codes (500-502); the HTTP status stays 200.

use thiserror::Error;

/// Required parameter absent or empty
pub const STATUS_MISSING_PARAM: u16 = 503;
/// Parameter present but unparsable
pub const STATUS_INVALID_PARAM: u16 = 504;
/// Verification code not on the allow-list
pub const STATUS_INVALID_VERIFICATION_CODE: u16 = 505;
/// Direction other than 1 (send) or 2 (receive)
pub const STATUS_INVALID_DIRECTION: u16 = 506;

/// Request rejected before it reached the query engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("lack parameter {0}")]
    MissingParam(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("verification code is invalid")]
    InvalidVerificationCode,

    #[error("transfer direction {0} is invalid")]
    InvalidDirection(i64),
}

impl HttpError {
    pub fn code(&self) -> u16 {
        match self {
            HttpError::MissingParam(_) => STATUS_MISSING_PARAM,
            HttpError::InvalidParam { .. } => STATUS_INVALID_PARAM,
            HttpError::InvalidVerificationCode => STATUS_INVALID_VERIFICATION_CODE,
            HttpError::InvalidDirection(_) => STATUS_INVALID_DIRECTION,
        }
    }
}
