//! Transfer History Queries
//!
//! Range queries are bounded below by a caller-supplied start block and
//! above by the highest stored block; point queries read one block.
//! Results carry either records or a coded [`QueryError`].

mod engine;
mod errors;
mod record;

pub use engine::{QueryEngine, DEFAULT_QUERY_TIMEOUT};
pub use errors::{
    QueryError, STATUS_INTERNAL_ERROR, STATUS_SUCCESS, STATUS_TRANSFER_RECORD_ERROR,
    STATUS_WATERMARK_ERROR,
};
pub use record::{Direction, QueryResult, TransferRecord};
