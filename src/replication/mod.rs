//! Replica Management
//!
//! Redundant read replicas of the ledger store, maintained by an external
//! indexer:
//!
//! - [`ReplicaPool`] opens the first reachable replica in configured order
//! - [`ActiveConnection`] holds the one active [`ConnectionHandle`]; swaps are
//!   atomic and readers keep their own snapshot
//! - [`HealthMonitor`] fails over when the active replica's watermark stops
//!   advancing
//!
//! A stalled replica with no healthy alternative keeps serving: lagging data
//! is preferred over no data.

mod descriptor;
mod errors;
mod handle;
mod monitor;
mod pool;

pub use descriptor::ReplicaDescriptor;
pub use errors::{PoolError, PoolResult, ReplicaFailure};
pub use handle::{ActiveConnection, ConnectionHandle};
pub use monitor::{
    HealthMonitor, MonitorState, MonitorStatus, TickOutcome, DEFAULT_CHECK_INTERVAL,
};
pub use pool::ReplicaPool;
