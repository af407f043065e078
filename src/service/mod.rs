//! Transfer History Service
//!
//! Wires the replica pool, the active connection slot, the health monitor
//! and the query engine into one lifecycle:
//!
//! - `start_service` opens the first reachable replica and starts the
//!   monitor timer
//! - `range_query` / `point_query` run against whichever replica is active
//! - `stop_service` stops the timer, waits for an in-flight check, then
//!   releases the active connection
//!
//! Queries issued before `start_service` or after `stop_service` fail with
//! code 500 rather than blocking.

mod config;
mod errors;

pub use config::{ServiceConfig, DEFAULT_CONNECT_TIMEOUT};
pub use errors::{ServiceError, ServiceResult};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ledger::{Direction, QueryEngine, QueryResult};
use crate::observability::{log_event, Event, MetricsRegistry, MetricsSnapshot};
use crate::replication::{
    ActiveConnection, ConnectionHandle, HealthMonitor, MonitorStatus, ReplicaPool, TickOutcome,
};
use crate::store::ReplicaConnector;

struct Running {
    monitor: Arc<HealthMonitor>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Snapshot of the service served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub configured_replicas: usize,
    pub active_replica: Option<String>,
    pub monitor: Option<MonitorStatus>,
}

/// Read-only transfer history over a pool of ledger replicas.
pub struct TransferHistoryService {
    config: ServiceConfig,
    pool: ReplicaPool,
    active: Arc<ActiveConnection>,
    metrics: Arc<MetricsRegistry>,
    engine: QueryEngine,
    running: Mutex<Option<Running>>,
}

impl TransferHistoryService {
    pub fn new(config: ServiceConfig, connector: Arc<dyn ReplicaConnector>) -> Self {
        let pool = ReplicaPool::new(config.replicas.clone(), connector, config.connect_timeout);
        let active = Arc::new(ActiveConnection::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = QueryEngine::new(
            Arc::clone(&active),
            Arc::clone(&metrics),
            config.query_timeout,
        );

        Self {
            config,
            pool,
            active,
            metrics,
            engine,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Open the first reachable replica and start the health monitor.
    ///
    /// Fails if the configuration is invalid, the service is already
    /// running, or no replica accepts a connection.
    pub async fn start_service(&self) -> ServiceResult<()> {
        self.config.validate()?;
        if self.is_running() {
            return Err(ServiceError::AlreadyRunning);
        }

        let replicas = self.config.replicas.len().to_string();
        log_event(Event::ServiceStart, &[("replicas", &replicas)]);

        let handle = match self.pool.open().await {
            Ok(handle) => handle,
            Err(e) => {
                log_event(Event::ServiceStartFailed, &[("error", &e.to_string())]);
                return Err(e.into());
            }
        };
        let endpoint = handle.endpoint().to_string();

        // A concurrent start may have won while we were connecting.
        if let Some(surplus) = self.install(handle) {
            release(&surplus).await;
            return Err(ServiceError::AlreadyRunning);
        }

        let interval = self.config.check_interval.as_secs().to_string();
        log_event(
            Event::ServiceReady,
            &[("replica", &endpoint), ("check_interval_secs", &interval)],
        );
        Ok(())
    }

    fn install(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Some(handle);
        }

        drop(self.active.replace(handle));
        let monitor = Arc::new(HealthMonitor::new(
            self.pool.clone(),
            Arc::clone(&self.active),
            Arc::clone(&self.metrics),
            self.config.query_timeout,
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = Arc::clone(&monitor).spawn(self.config.check_interval, shutdown_rx);

        *running = Some(Running {
            monitor,
            shutdown,
            task,
        });
        None
    }

    /// Stop the monitor and release the active connection. Idempotent.
    pub async fn stop_service(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        log_event(Event::ShutdownStart, &[]);

        // Send fails only if the loop already exited.
        let _ = running.shutdown.send(true);
        let monitor_exit = match running.task.await {
            Ok(()) => "clean".to_string(),
            Err(e) => e.to_string(),
        };

        // Queries still holding a snapshot keep the connection open; the last
        // one to finish drops it.
        if let Some(handle) = self.active.take() {
            match Arc::try_unwrap(handle) {
                Ok(handle) => release(&handle).await,
                Err(shared) => {
                    let in_flight = (Arc::strong_count(&shared) - 1).to_string();
                    log_event(
                        Event::ReplicaReleaseDeferred,
                        &[("replica", shared.endpoint()), ("in_flight", &in_flight)],
                    );
                }
            }
        }
        log_event(Event::ShutdownComplete, &[("monitor_exit", &monitor_exit)]);
    }

    pub async fn range_query(&self, start: u64, account: &str, direction: Direction) -> QueryResult {
        self.engine.range_query(start, account, direction).await
    }

    pub async fn point_query(&self, block: u64, account: &str, direction: Direction) -> QueryResult {
        self.engine.point_query(block, account, direction).await
    }

    /// Run one health check now, outside the timer.
    ///
    /// Returns `None` when the service is not running. Shares the
    /// single-flight guard with timer ticks.
    pub async fn check_health(&self) -> Option<TickOutcome> {
        let monitor = self.lock_running().as_ref().map(|r| Arc::clone(&r.monitor))?;
        Some(monitor.tick().await)
    }

    pub fn active_replica(&self) -> Option<String> {
        self.active.endpoint()
    }

    pub fn status(&self) -> ServiceStatus {
        let monitor = self.lock_running().as_ref().map(|r| r.monitor.status());
        ServiceStatus {
            running: monitor.is_some(),
            configured_replicas: self.config.replicas.len(),
            active_replica: self.active.endpoint(),
            monitor,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for TransferHistoryService {
    fn drop(&mut self) {
        if let Some(running) = self.lock_running().take() {
            let _ = running.shutdown.send(true);
        }
    }
}

async fn release(handle: &ConnectionHandle) {
    if let Err(e) = handle.connection().close().await {
        log_event(
            Event::ReplicaCloseFailed,
            &[("replica", handle.endpoint()), ("error", &e.to_string())],
        );
    }
}
