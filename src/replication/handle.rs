//! Active Connection Handle
//!
//! Exactly one connection is active at a time. The health monitor is the only
//! writer; queries are readers. Readers take an `Arc` snapshot and use it for
//! the whole query, so a swap never affects a query already running and no
//! reader can observe a half-built handle.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::store::LedgerConnection;

/// A live connection plus the replica it was opened from.
pub struct ConnectionHandle {
    endpoint: String,
    connection: Box<dyn LedgerConnection>,
}

impl ConnectionHandle {
    pub fn new(endpoint: impl Into<String>, connection: Box<dyn LedgerConnection>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connection,
        }
    }

    /// `host:port` of the replica behind this handle.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connection(&self) -> &dyn LedgerConnection {
        self.connection.as_ref()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Slot holding the active [`ConnectionHandle`].
///
/// The lock only guards an `Arc` clone or replace, never I/O.
#[derive(Debug, Default)]
pub struct ActiveConnection {
    current: RwLock<Option<Arc<ConnectionHandle>>>,
}

impl ActiveConnection {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active handle, if any.
    pub fn snapshot(&self) -> Option<Arc<ConnectionHandle>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `handle` as the active connection, returning the previous one.
    pub fn replace(&self, handle: ConnectionHandle) -> Option<Arc<ConnectionHandle>> {
        let handle = Arc::new(handle);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.replace(handle)
    }

    /// Empty the slot, returning what was active.
    pub fn take(&self) -> Option<Arc<ConnectionHandle>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Endpoint of the active handle.
    pub fn endpoint(&self) -> Option<String> {
        self.snapshot().map(|h| h.endpoint().to_string())
    }

    pub fn is_connected(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
