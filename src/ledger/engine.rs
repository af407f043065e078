//! Query Engine
//!
//! Range and point reads against whichever replica is active when the query
//! starts. Each query takes one snapshot of the active handle and uses it
//! for every read, so a failover mid-query never mixes two replicas.

use std::sync::Arc;
use std::time::Duration;

use super::errors::QueryError;
use super::record::{Direction, QueryResult, TransferRecord};
use crate::observability::{log_event, Event, MetricsRegistry, Severity};
use crate::replication::ActiveConnection;
use crate::store::{BlockSelector, StoreError, StoreFuture, StoreResult, TransferFilter};

/// Default deadline for a single store read.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only query surface over the active replica.
pub struct QueryEngine {
    active: Arc<ActiveConnection>,
    metrics: Arc<MetricsRegistry>,
    query_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        active: Arc<ActiveConnection>,
        metrics: Arc<MetricsRegistry>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            active,
            metrics,
            query_timeout,
        }
    }

    /// All transfers for `account` in `direction` from `start` up to the
    /// highest stored block.
    ///
    /// The reported watermark is `max(watermark, max stored height)`. When
    /// either bound is below `start` the result is empty but successful.
    pub async fn range_query(
        &self,
        start: u64,
        account: &str,
        direction: Direction,
    ) -> QueryResult {
        self.metrics.increment_range_queries();
        let result = self.run_range(start, account, direction).await;
        self.report("range", account, start, &result);
        result
    }

    /// All transfers for `account` in `direction` recorded at exactly `block`.
    ///
    /// Not bounded by the watermark; the watermark fields are left at 0.
    pub async fn point_query(&self, block: u64, account: &str, direction: Direction) -> QueryResult {
        self.metrics.increment_point_queries();
        let result = self.run_point(block, account, direction).await;
        self.report("point", account, block, &result);
        result
    }

    async fn run_range(&self, start: u64, account: &str, direction: Direction) -> QueryResult {
        let Some(handle) = self.active.snapshot() else {
            return QueryResult::failed(QueryError::ConnectionUnavailable);
        };
        let conn = handle.connection();

        let watermark = match self.bounded(conn.watermark()).await {
            Ok(w) => w,
            Err(e) => return QueryResult::failed(QueryError::WatermarkRead(e)),
        };

        // An empty transfer table has no maximum; treat it as height 0.
        let max_stored = match self.bounded(conn.max_block_height()).await {
            Ok(m) => m.unwrap_or(0),
            Err(e) => {
                let mut failed = QueryResult::failed(QueryError::Query(e));
                failed.watermark = watermark;
                return failed;
            }
        };

        let mut result = QueryResult::empty(watermark.max(max_stored), max_stored);
        if result.watermark < start || max_stored < start {
            return result;
        }

        let filter = TransferFilter::new(
            BlockSelector::Range {
                start,
                end: max_stored,
            },
            account,
            direction,
        );
        match self.bounded(conn.transfers(filter)).await {
            Ok(rows) => result.records = rows.into_iter().map(TransferRecord::from).collect(),
            Err(e) => result.error = Some(QueryError::Query(e)),
        }
        result
    }

    async fn run_point(&self, block: u64, account: &str, direction: Direction) -> QueryResult {
        let Some(handle) = self.active.snapshot() else {
            return QueryResult::failed(QueryError::ConnectionUnavailable);
        };

        let filter = TransferFilter::new(BlockSelector::Exact(block), account, direction);
        match self.bounded(handle.connection().transfers(filter)).await {
            Ok(rows) => QueryResult {
                records: rows.into_iter().map(TransferRecord::from).collect(),
                ..QueryResult::empty(0, 0)
            },
            Err(e) => QueryResult::failed(QueryError::Query(e)),
        }
    }

    async fn bounded<T>(&self, read: StoreFuture<'_, T>) -> StoreResult<T> {
        tokio::time::timeout(self.query_timeout, read)
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))?
    }

    fn report(&self, kind: &str, account: &str, block: u64, result: &QueryResult) {
        let block = block.to_string();
        match &result.error {
            None => {
                let count = result.records.len().to_string();
                let mut fields = query_fields(Event::QueryServed, kind, account, &block);
                fields.push(("records", count.as_str()));
                log_event(Event::QueryServed, &fields);
            }
            Some(e) => {
                self.metrics.increment_query_errors();
                let code = e.code().to_string();
                let error = e.to_string();
                let mut fields = query_fields(Event::QueryFailed, kind, account, &block);
                fields.push(("code", code.as_str()));
                fields.push(("error", error.as_str()));
                log_event(Event::QueryFailed, &fields);
            }
        }
    }
}

/// Common fields of a query log line. Accounts only appear on DEBUG lines.
fn query_fields<'a>(
    event: Event,
    kind: &'a str,
    account: &'a str,
    block: &'a str,
) -> Vec<(&'a str, &'a str)> {
    let mut fields = vec![("kind", kind), ("block", block)];
    if event.severity() <= Severity::Debug {
        fields.push(("account", account));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::{ConnectionHandle, ReplicaDescriptor};
    use crate::store::{MemoryConnector, MemoryReplica, ReplicaConnector, StoredTransfer};

    fn alice_replica() -> MemoryReplica {
        MemoryReplica::new()
            .with_watermark(100)
            .with_transfer(StoredTransfer::new("t10", "alice", "bob", "", 5, 10))
            .with_transfer(StoredTransfer::new("t50", "alice", "carol", "", 6, 50))
            .with_transfer(StoredTransfer::new("t150", "alice", "bob", "", 7, 150))
            .with_transfer(StoredTransfer::new("in", "bob", "alice", "", 8, 50))
    }

    async fn engine_on(replica: MemoryReplica) -> (QueryEngine, Arc<MetricsRegistry>) {
        let connector = MemoryConnector::new().with_replica("a:3306", replica);
        let descriptor = ReplicaDescriptor::new("mysql", "u", "p", "a", 3306, "cos");
        let conn = connector.connect(&descriptor).await.unwrap();

        let active = Arc::new(ActiveConnection::new());
        active.replace(ConnectionHandle::new("a:3306", conn));
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = QueryEngine::new(active, Arc::clone(&metrics), Duration::from_secs(5));
        (engine, metrics)
    }

    fn heights(result: &QueryResult) -> Vec<&str> {
        result.records.iter().map(|r| r.block_height.as_str()).collect()
    }

    #[tokio::test]
    async fn test_range_from_genesis_includes_blocks_past_watermark() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.range_query(0, "alice", Direction::Outgoing).await;

        assert!(result.is_ok());
        assert_eq!(heights(&result), vec!["10", "50", "150"]);
        assert_eq!(result.watermark, 150);
        assert_eq!(result.max_query_block_height, 150);
    }

    #[tokio::test]
    async fn test_range_from_middle() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.range_query(60, "alice", Direction::Outgoing).await;

        assert_eq!(heights(&result), vec!["150"]);
        assert_eq!(result.watermark, 150);
    }

    #[tokio::test]
    async fn test_range_start_past_everything_is_empty_success() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.range_query(200, "alice", Direction::Outgoing).await;

        assert!(result.is_empty());
        assert_eq!(result.watermark, 150);
        assert_eq!(result.max_query_block_height, 150);
    }

    #[tokio::test]
    async fn test_range_direction_selects_column() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.range_query(0, "alice", Direction::Incoming).await;

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].operation_id, "in");
    }

    #[tokio::test]
    async fn test_range_on_empty_table() {
        let (engine, _) = engine_on(MemoryReplica::new().with_watermark(40)).await;

        let result = engine.range_query(0, "alice", Direction::Outgoing).await;

        assert!(result.is_empty());
        assert_eq!(result.watermark, 40);
        assert_eq!(result.max_query_block_height, 0);
    }

    #[tokio::test]
    async fn test_range_reports_watermark_failure() {
        let replica = alice_replica();
        replica.clear_watermark();
        let (engine, metrics) = engine_on(replica).await;

        let result = engine.range_query(0, "alice", Direction::Outgoing).await;

        assert_eq!(
            result.error,
            Some(QueryError::WatermarkRead(StoreError::WatermarkMissing))
        );
        assert_eq!(result.status_code(), 501);
        assert!(result.records.is_empty());
        assert_eq!(metrics.snapshot().query_errors, 1);
    }

    #[tokio::test]
    async fn test_range_reports_transfer_failure() {
        let replica = alice_replica();
        replica.set_fail_queries(true);
        let (engine, _) = engine_on(replica).await;

        let result = engine.range_query(0, "alice", Direction::Outgoing).await;

        assert_eq!(result.status_code(), 502);
        assert_eq!(result.watermark, 100);
    }

    #[tokio::test]
    async fn test_no_connection() {
        let engine = QueryEngine::new(
            Arc::new(ActiveConnection::new()),
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(5),
        );

        let range = engine.range_query(0, "alice", Direction::Outgoing).await;
        let point = engine.point_query(10, "alice", Direction::Outgoing).await;

        assert_eq!(range.error, Some(QueryError::ConnectionUnavailable));
        assert_eq!(point.status_code(), 500);
    }

    #[tokio::test]
    async fn test_point_query_exact_block() {
        let replica = alice_replica()
            .with_transfer(StoredTransfer::new("t50b", "alice", "dave", "", 9, 50));
        let (engine, metrics) = engine_on(replica).await;

        let result = engine.point_query(50, "alice", Direction::Outgoing).await;

        let ids: Vec<&str> = result.records.iter().map(|r| r.operation_id.as_str()).collect();
        assert_eq!(ids, vec!["t50", "t50b"]);
        assert_eq!(result.watermark, 0);
        assert_eq!(result.max_query_block_height, 0);
        assert_eq!(metrics.snapshot().point_queries, 1);
    }

    #[tokio::test]
    async fn test_point_query_ignores_watermark() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.point_query(150, "alice", Direction::Outgoing).await;

        assert_eq!(heights(&result), vec!["150"]);
    }

    #[tokio::test]
    async fn test_point_query_miss_is_empty_success() {
        let (engine, _) = engine_on(alice_replica()).await;

        let result = engine.point_query(11, "alice", Direction::Outgoing).await;

        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_times_out() {
        let replica = alice_replica();
        let (engine, _) = engine_on(replica.clone()).await;
        replica.set_read_delay(Duration::from_secs(60));

        let result = engine.point_query(10, "alice", Direction::Outgoing).await;

        assert_eq!(
            result.error,
            Some(QueryError::Query(StoreError::Timeout(Duration::from_secs(5))))
        );
    }

    #[test]
    fn test_account_only_logged_at_debug() {
        let served = query_fields(Event::QueryServed, "range", "alice", "10");
        assert!(served.contains(&("account", "alice")));

        let failed = query_fields(Event::QueryFailed, "range", "alice", "10");
        assert!(failed.iter().all(|(key, value)| *key != "account" && *value != "alice"));
        assert!(failed.contains(&("block", "10")));
    }
}
