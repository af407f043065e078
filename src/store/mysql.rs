//! MySQL replicas via sqlx
//!
//! Each replica connection is a small `sqlx` pool so concurrent queries do
//! not serialize on one socket. Unsigned columns are cast explicitly so the
//! decoded type is `BIGINT UNSIGNED` regardless of how the indexer declared
//! them.

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

use super::{
    BlockSelector, LedgerConnection, ReplicaConnector, StoreError, StoreFuture, StoreResult,
    StoredTransfer, TransferFilter,
};
use crate::ledger::Direction;
use crate::replication::ReplicaDescriptor;

/// Single-row watermark table
const LIB_TABLE: &str = "libinfo";

/// Transfer event table
const TRANSFER_TABLE: &str = "transfer_records";

/// Pooled sockets per replica
const MAX_CONNECTIONS: u32 = 8;

/// Opens MySQL-backed ledger connections.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    acquire_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { acquire_timeout }
    }
}

impl ReplicaConnector for MySqlConnector {
    fn connect<'a>(
        &'a self,
        descriptor: &'a ReplicaDescriptor,
    ) -> StoreFuture<'a, Box<dyn LedgerConnection>> {
        Box::pin(async move {
            if !descriptor.driver.eq_ignore_ascii_case("mysql") {
                return Err(StoreError::UnsupportedDriver(descriptor.driver.clone()));
            }

            let options = MySqlConnectOptions::new()
                .host(&descriptor.host)
                .port(descriptor.port)
                .username(&descriptor.user)
                .password(&descriptor.password)
                .database(&descriptor.database)
                .charset("utf8mb4");

            // connect_with opens one connection up front, so an unreachable
            // replica fails here rather than on the first query.
            let pool = MySqlPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(self.acquire_timeout)
                .connect_with(options)
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;

            Ok(Box::new(MySqlLedger { pool }) as Box<dyn LedgerConnection>)
        })
    }
}

struct MySqlLedger {
    pool: MySqlPool,
}

fn query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::Closed,
        other => StoreError::Query(other.to_string()),
    }
}

fn account_column(direction: Direction) -> &'static str {
    match direction {
        Direction::Outgoing => "`from`",
        Direction::Incoming => "`to`",
    }
}

fn transfer_from_row(row: &MySqlRow) -> StoreResult<StoredTransfer> {
    Ok(StoredTransfer {
        operation_id: row.try_get("operation_id").map_err(query_error)?,
        from: row.try_get("from").map_err(query_error)?,
        to: row.try_get("to").map_err(query_error)?,
        memo: row.try_get("memo").map_err(query_error)?,
        amount: row.try_get("amount").map_err(query_error)?,
        block_height: row.try_get("block_height").map_err(query_error)?,
    })
}

impl LedgerConnection for MySqlLedger {
    fn watermark(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let sql = format!("SELECT CAST(lib AS UNSIGNED) FROM {} LIMIT 1", LIB_TABLE);
            sqlx::query_scalar::<_, u64>(&sql)
                .fetch_optional(&self.pool)
                .await
                .map_err(query_error)?
                .ok_or(StoreError::WatermarkMissing)
        })
    }

    fn max_block_height(&self) -> StoreFuture<'_, Option<u64>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT CAST(MAX(block_height) AS UNSIGNED) FROM {}",
                TRANSFER_TABLE
            );
            sqlx::query_scalar::<_, Option<u64>>(&sql)
                .fetch_one(&self.pool)
                .await
                .map_err(query_error)
        })
    }

    fn transfers(&self, filter: TransferFilter) -> StoreFuture<'_, Vec<StoredTransfer>> {
        Box::pin(async move {
            let height_clause = match filter.blocks {
                BlockSelector::Range { .. } => "block_height >= ? AND block_height <= ?",
                BlockSelector::Exact(_) => "block_height = ?",
            };
            let sql = format!(
                "SELECT operation_id, `from`, `to`, memo, \
                 CAST(amount AS UNSIGNED) AS amount, \
                 CAST(block_height AS UNSIGNED) AS block_height \
                 FROM {} WHERE {} AND {} = ? \
                 ORDER BY block_height ASC, operation_id ASC",
                TRANSFER_TABLE,
                height_clause,
                account_column(filter.direction),
            );

            let query = match filter.blocks {
                BlockSelector::Range { start, end } => sqlx::query(&sql).bind(start).bind(end),
                BlockSelector::Exact(height) => sqlx::query(&sql).bind(height),
            };
            let rows = query
                .bind(&filter.account)
                .fetch_all(&self.pool)
                .await
                .map_err(query_error)?;

            rows.iter().map(transfer_from_row).collect()
        })
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            // Waits for checked-out connections, so in-flight reads finish.
            self.pool.close().await;
            Ok(())
        })
    }
}
