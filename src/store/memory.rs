//! In-memory ledger replicas
//!
//! Each [`MemoryReplica`] is a shared, mutable stand-in for one replica's
//! database. Tests keep a clone of the replica and change its watermark,
//! reachability or latency while the service holds a connection to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{
    LedgerConnection, ReplicaConnector, StoreError, StoreFuture, StoredTransfer, TransferFilter,
};
use crate::replication::ReplicaDescriptor;

#[derive(Debug)]
struct ReplicaState {
    watermark: Option<u64>,
    transfers: Vec<StoredTransfer>,
    reachable: bool,
    fail_queries: bool,
    read_delay: Duration,
    connects: usize,
    open_connections: usize,
}

impl Default for ReplicaState {
    fn default() -> Self {
        Self {
            watermark: Some(0),
            transfers: Vec::new(),
            reachable: true,
            fail_queries: false,
            read_delay: Duration::ZERO,
            connects: 0,
            open_connections: 0,
        }
    }
}

/// One in-memory replica. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryReplica {
    state: Arc<Mutex<ReplicaState>>,
}

impl MemoryReplica {
    /// A reachable replica with watermark 0 and no transfers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_watermark`](Self::set_watermark).
    pub fn with_watermark(self, watermark: u64) -> Self {
        self.set_watermark(watermark);
        self
    }

    /// Builder form of [`push_transfer`](Self::push_transfer).
    pub fn with_transfer(self, transfer: StoredTransfer) -> Self {
        self.push_transfer(transfer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ReplicaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_watermark(&self, watermark: u64) {
        self.lock().watermark = Some(watermark);
    }

    /// Make the `libinfo` row unreadable.
    pub fn clear_watermark(&self) {
        self.lock().watermark = None;
    }

    pub fn push_transfer(&self, transfer: StoredTransfer) {
        self.lock().transfers.push(transfer);
    }

    /// Unreachable replicas refuse new connections; open ones keep working.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Make every transfer read fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.lock().fail_queries = fail;
    }

    /// Latency added to every read.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// Connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }
}

/// Connector resolving descriptors to [`MemoryReplica`]s by endpoint.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    replicas: Mutex<HashMap<String, MemoryReplica>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `replica` under `endpoint` (`host:port`).
    pub fn insert(&self, endpoint: impl Into<String>, replica: MemoryReplica) {
        self.replicas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.into(), replica);
    }

    pub fn with_replica(self, endpoint: impl Into<String>, replica: MemoryReplica) -> Self {
        self.insert(endpoint, replica);
        self
    }

    fn lookup(&self, endpoint: &str) -> Option<MemoryReplica> {
        self.replicas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()
    }
}

impl ReplicaConnector for MemoryConnector {
    fn connect<'a>(
        &'a self,
        descriptor: &'a ReplicaDescriptor,
    ) -> StoreFuture<'a, Box<dyn LedgerConnection>> {
        Box::pin(async move {
            let endpoint = descriptor.endpoint();
            let replica = self
                .lookup(&endpoint)
                .ok_or_else(|| StoreError::Connect(format!("no route to {}", endpoint)))?;

            let delay = replica.lock().read_delay;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            {
                let mut state = replica.lock();
                if !state.reachable {
                    return Err(StoreError::Connect(format!("{} refused connection", endpoint)));
                }
                state.connects += 1;
                state.open_connections += 1;
            }

            Ok(Box::new(MemoryLedger {
                replica,
                closed: AtomicBool::new(false),
            }) as Box<dyn LedgerConnection>)
        })
    }
}

struct MemoryLedger {
    replica: MemoryReplica,
    closed: AtomicBool,
}

impl MemoryLedger {
    async fn pause(&self) -> Result<(), StoreError> {
        let delay = self.replica.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Drop for MemoryLedger {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.replica.lock().open_connections -= 1;
        }
    }
}

impl LedgerConnection for MemoryLedger {
    fn watermark(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.pause().await?;
            self.replica
                .lock()
                .watermark
                .ok_or(StoreError::WatermarkMissing)
        })
    }

    fn max_block_height(&self) -> StoreFuture<'_, Option<u64>> {
        Box::pin(async move {
            self.pause().await?;
            let state = self.replica.lock();
            if state.fail_queries {
                return Err(StoreError::Query("transfer table unavailable".to_string()));
            }
            Ok(state.transfers.iter().map(|t| t.block_height).max())
        })
    }

    fn transfers(&self, filter: TransferFilter) -> StoreFuture<'_, Vec<StoredTransfer>> {
        Box::pin(async move {
            self.pause().await?;
            let state = self.replica.lock();
            if state.fail_queries {
                return Err(StoreError::Query("transfer table unavailable".to_string()));
            }
            let mut matched: Vec<StoredTransfer> = state
                .transfers
                .iter()
                .filter(|t| filter.matches(t))
                .cloned()
                .collect();
            matched.sort_by(|a, b| {
                a.block_height
                    .cmp(&b.block_height)
                    .then_with(|| a.operation_id.cmp(&b.operation_id))
            });
            Ok(matched)
        })
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::AcqRel) {
                self.replica.lock().open_connections -= 1;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Direction;
    use crate::store::BlockSelector;

    fn descriptor(host: &str) -> ReplicaDescriptor {
        ReplicaDescriptor::new("mysql", "reader", "secret", host, 3306, "ledger")
    }

    #[tokio::test]
    async fn test_connect_unknown_endpoint_fails() {
        let connector = MemoryConnector::new();
        let result = connector.connect(&descriptor("nowhere")).await;
        assert!(matches!(result, Err(StoreError::Connect(_))));
    }

    #[tokio::test]
    async fn test_unreachable_replica_refuses() {
        let replica = MemoryReplica::new();
        replica.set_reachable(false);
        let connector = MemoryConnector::new().with_replica("a:3306", replica.clone());

        assert!(connector.connect(&descriptor("a")).await.is_err());
        assert_eq!(replica.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_reads_reflect_shared_state() {
        let replica = MemoryReplica::new().with_watermark(7);
        let connector = MemoryConnector::new().with_replica("a:3306", replica.clone());
        let conn = connector.connect(&descriptor("a")).await.unwrap();

        assert_eq!(conn.watermark().await.unwrap(), 7);
        assert_eq!(conn.max_block_height().await.unwrap(), None);

        replica.set_watermark(9);
        replica.push_transfer(StoredTransfer::new("b", "alice", "bob", "", 1, 12));
        replica.push_transfer(StoredTransfer::new("a", "alice", "carol", "", 2, 12));
        replica.push_transfer(StoredTransfer::new("c", "alice", "bob", "", 3, 4));

        assert_eq!(conn.watermark().await.unwrap(), 9);
        assert_eq!(conn.max_block_height().await.unwrap(), Some(12));

        let filter = TransferFilter::new(
            BlockSelector::Range { start: 0, end: 12 },
            "alice",
            Direction::Outgoing,
        );
        let ids: Vec<String> = conn
            .transfers(filter)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.operation_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_watermark_row() {
        let replica = MemoryReplica::new();
        replica.clear_watermark();
        let connector = MemoryConnector::new().with_replica("a:3306", replica);
        let conn = connector.connect(&descriptor("a")).await.unwrap();

        assert_eq!(conn.watermark().await, Err(StoreError::WatermarkMissing));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_reads() {
        let replica = MemoryReplica::new();
        let connector = MemoryConnector::new().with_replica("a:3306", replica.clone());
        let conn = connector.connect(&descriptor("a")).await.unwrap();
        assert_eq!(replica.open_connections(), 1);

        conn.close().await.unwrap();
        conn.close().await.unwrap();

        assert_eq!(replica.open_connections(), 0);
        assert_eq!(conn.watermark().await, Err(StoreError::Closed));

        drop(conn);
        assert_eq!(replica.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_connection() {
        let replica = MemoryReplica::new();
        let connector = MemoryConnector::new().with_replica("a:3306", replica.clone());
        let conn = connector.connect(&descriptor("a")).await.unwrap();
        assert_eq!(replica.open_connections(), 1);

        drop(conn);
        assert_eq!(replica.open_connections(), 0);
    }
}
