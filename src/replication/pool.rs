//! Replica Pool
//!
//! Static, ordered list of replicas. Opening walks the list front to back and
//! returns the first replica that accepts a connection within the connect
//! timeout. There are no retries inside one call; the next health-check tick
//! is the retry.

use std::sync::Arc;
use std::time::Duration;

use super::descriptor::ReplicaDescriptor;
use super::errors::{PoolError, PoolResult, ReplicaFailure};
use super::handle::ConnectionHandle;
use crate::observability::{log_event, Event};
use crate::store::{ReplicaConnector, StoreError};

/// Ordered replica list plus the connector used to reach them.
#[derive(Clone)]
pub struct ReplicaPool {
    descriptors: Arc<[ReplicaDescriptor]>,
    connector: Arc<dyn ReplicaConnector>,
    connect_timeout: Duration,
}

impl ReplicaPool {
    pub fn new(
        descriptors: Vec<ReplicaDescriptor>,
        connector: Arc<dyn ReplicaConnector>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            descriptors: descriptors.into(),
            connector,
            connect_timeout,
        }
    }

    /// Open the first reachable replica in configured order.
    pub async fn open(&self) -> PoolResult<ConnectionHandle> {
        self.open_filtered(|_| true).await
    }

    /// Open the first reachable replica other than `endpoint`.
    pub async fn open_excluding(&self, endpoint: &str) -> PoolResult<ConnectionHandle> {
        self.open_filtered(|d| d.endpoint() != endpoint).await
    }

    async fn open_filtered<F>(&self, include: F) -> PoolResult<ConnectionHandle>
    where
        F: Fn(&ReplicaDescriptor) -> bool,
    {
        let mut failures = Vec::new();
        let mut tried = 0usize;

        for descriptor in self.descriptors.iter().filter(|d| include(d)) {
            tried += 1;
            let endpoint = descriptor.endpoint();
            match self.connect_one(descriptor).await {
                Ok(handle) => {
                    log_event(Event::ReplicaConnected, &[("replica", &endpoint)]);
                    return Ok(handle);
                }
                Err(error) => {
                    let cause = error.to_string();
                    log_event(
                        Event::ReplicaConnectFailed,
                        &[("replica", &endpoint), ("error", &cause)],
                    );
                    failures.push(ReplicaFailure { endpoint, error });
                }
            }
        }

        if tried == 0 {
            return Err(PoolError::NoReplicasConfigured);
        }
        Err(PoolError::AllReplicasFailed { failures })
    }

    async fn connect_one(&self, descriptor: &ReplicaDescriptor) -> Result<ConnectionHandle, StoreError> {
        let connection =
            tokio::time::timeout(self.connect_timeout, self.connector.connect(descriptor))
                .await
                .map_err(|_| StoreError::Timeout(self.connect_timeout))??;
        Ok(ConnectionHandle::new(descriptor.endpoint(), connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryConnector, MemoryReplica};

    fn descriptor(host: &str) -> ReplicaDescriptor {
        ReplicaDescriptor::new("mysql", "reader", "secret", host, 3306, "cos")
    }

    fn pool(connector: MemoryConnector, hosts: &[&str]) -> ReplicaPool {
        ReplicaPool::new(
            hosts.iter().map(|h| descriptor(h)).collect(),
            Arc::new(connector),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_open_prefers_configured_order() {
        let a = MemoryReplica::new();
        let b = MemoryReplica::new();
        let connector = MemoryConnector::new()
            .with_replica("a:3306", a.clone())
            .with_replica("b:3306", b.clone());

        let handle = pool(connector, &["a", "b"]).open().await.unwrap();

        assert_eq!(handle.endpoint(), "a:3306");
        assert_eq!(a.connect_count(), 1);
        assert_eq!(b.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_open_skips_unreachable() {
        let a = MemoryReplica::new();
        a.set_reachable(false);
        let connector = MemoryConnector::new()
            .with_replica("a:3306", a)
            .with_replica("b:3306", MemoryReplica::new());

        let handle = pool(connector, &["a", "b"]).open().await.unwrap();
        assert_eq!(handle.endpoint(), "b:3306");
    }

    #[tokio::test]
    async fn test_open_aggregates_every_failure() {
        let a = MemoryReplica::new();
        a.set_reachable(false);
        let connector = MemoryConnector::new().with_replica("a:3306", a);

        let err = pool(connector, &["a", "missing"]).open().await.unwrap_err();

        let endpoints: Vec<&str> = err.failures().iter().map(|f| f.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["a:3306", "missing:3306"]);
    }

    #[tokio::test]
    async fn test_open_empty_list() {
        let err = pool(MemoryConnector::new(), &[]).open().await.unwrap_err();
        assert_eq!(err, PoolError::NoReplicasConfigured);
    }

    #[tokio::test]
    async fn test_open_excluding_skips_current() {
        let connector = MemoryConnector::new()
            .with_replica("a:3306", MemoryReplica::new())
            .with_replica("b:3306", MemoryReplica::new());

        let handle = pool(connector, &["a", "b"])
            .open_excluding("a:3306")
            .await
            .unwrap();
        assert_eq!(handle.endpoint(), "b:3306");
    }

    #[tokio::test]
    async fn test_open_excluding_only_replica() {
        let connector = MemoryConnector::new().with_replica("a:3306", MemoryReplica::new());
        let err = pool(connector, &["a"]).open_excluding("a:3306").await.unwrap_err();
        assert_eq!(err, PoolError::NoReplicasConfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_replica_times_out() {
        let slow = MemoryReplica::new();
        slow.set_read_delay(Duration::from_secs(30));
        let connector = MemoryConnector::new()
            .with_replica("slow:3306", slow)
            .with_replica("b:3306", MemoryReplica::new());

        let handle = pool(connector, &["slow", "b"]).open().await.unwrap();
        assert_eq!(handle.endpoint(), "b:3306");
    }
}
