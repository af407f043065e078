//! Replica Health Monitor
//!
//! The only replica-health signal available is the watermark: the block
//! height the external indexer has fully applied. A replica whose watermark
//! did not advance since the previous tick is treated as stalled and the
//! monitor fails over to the next replica that accepts a connection.
//!
//! Per tick: `Idle → Checking → Idle`.
//!
//! 1. Read the watermark from the active connection. A read failure is
//!    logged and changes nothing (not even the baseline).
//! 2. Watermark not strictly greater than the baseline means stalled.
//! 3. On stall, one pass over the other replicas in configured order; the
//!    first that opens replaces the active connection. If none opens, the
//!    stalled connection keeps serving.
//! 4. The watermark read becomes the new baseline.
//!
//! Ticks are single-flight: a tick that fires while a check is still running
//! is dropped, not queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use super::handle::ActiveConnection;
use super::pool::ReplicaPool;
use crate::observability::{log_event, Event, MetricsRegistry};

/// Default tick period
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(120);

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another check was in flight; this tick was dropped
    Skipped,
    /// No active connection to sample
    NoConnection,
    /// Watermark read failed or timed out; nothing changed
    WatermarkUnavailable,
    /// Watermark advanced
    Healthy { watermark: u64 },
    /// Stalled replica replaced
    FailedOver {
        from: String,
        to: String,
        watermark: u64,
    },
    /// Stalled, but no other replica could be opened
    StalledNoCandidate { endpoint: String, watermark: u64 },
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::Skipped => "skipped",
            TickOutcome::NoConnection => "no_connection",
            TickOutcome::WatermarkUnavailable => "watermark_unavailable",
            TickOutcome::Healthy { .. } => "healthy",
            TickOutcome::FailedOver { .. } => "failed_over",
            TickOutcome::StalledNoCandidate { .. } => "stalled_no_candidate",
        }
    }
}

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Checking,
}

/// Point-in-time view of the monitor, served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub active_replica: Option<String>,
    pub baseline_watermark: u64,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct LastCheck {
    at: DateTime<Utc>,
    outcome: &'static str,
}

/// Releases the single-flight flag when the check finishes, even on panic.
struct CheckGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CheckGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Watermark-driven failover for the active connection.
pub struct HealthMonitor {
    pool: ReplicaPool,
    active: Arc<ActiveConnection>,
    metrics: Arc<MetricsRegistry>,
    read_timeout: Duration,
    checking: AtomicBool,
    // Written only while `checking` is held.
    baseline: AtomicU64,
    last_check: Mutex<Option<LastCheck>>,
}

impl HealthMonitor {
    pub fn new(
        pool: ReplicaPool,
        active: Arc<ActiveConnection>,
        metrics: Arc<MetricsRegistry>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            active,
            metrics,
            read_timeout,
            checking: AtomicBool::new(false),
            baseline: AtomicU64::new(0),
            last_check: Mutex::new(None),
        }
    }

    /// Watermark recorded by the last tick that read one.
    pub fn baseline(&self) -> u64 {
        self.baseline.load(Ordering::Acquire)
    }

    pub fn state(&self) -> MonitorState {
        if self.checking.load(Ordering::Acquire) {
            MonitorState::Checking
        } else {
            MonitorState::Idle
        }
    }

    pub fn status(&self) -> MonitorStatus {
        let last = *self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        MonitorStatus {
            state: self.state(),
            active_replica: self.active.endpoint(),
            baseline_watermark: self.baseline(),
            last_check_at: last.map(|l| l.at),
            last_outcome: last.map(|l| l.outcome),
        }
    }

    /// Run one health check, or drop it if one is already running.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = CheckGuard::acquire(&self.checking) else {
            self.metrics.increment_health_checks_skipped();
            log_event(Event::HealthCheckSkipped, &[]);
            return TickOutcome::Skipped;
        };

        self.metrics.increment_health_checks();
        log_event(Event::HealthCheckBegin, &[]);

        let outcome = self.check().await;

        *self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(LastCheck {
            at: Utc::now(),
            outcome: outcome.as_str(),
        });
        log_event(Event::HealthCheckComplete, &[("outcome", outcome.as_str())]);
        outcome
    }

    async fn check(&self) -> TickOutcome {
        let Some(handle) = self.active.snapshot() else {
            return TickOutcome::NoConnection;
        };
        let endpoint = handle.endpoint().to_string();

        let read = tokio::time::timeout(self.read_timeout, handle.connection().watermark()).await;
        let watermark = match read {
            Ok(Ok(watermark)) => watermark,
            Ok(Err(e)) => return self.watermark_unavailable(&endpoint, &e.to_string()),
            Err(_) => {
                let cause = format!("timed out after {:?}", self.read_timeout);
                return self.watermark_unavailable(&endpoint, &cause);
            }
        };

        let previous = self.baseline();
        let outcome = if watermark > previous {
            TickOutcome::Healthy { watermark }
        } else {
            self.metrics.increment_stalls();
            let (wm, prev) = (watermark.to_string(), previous.to_string());
            log_event(
                Event::ReplicaStalled,
                &[("replica", &endpoint), ("watermark", &wm), ("previous", &prev)],
            );
            self.fail_over(endpoint, watermark).await
        };

        self.baseline.store(watermark, Ordering::Release);
        outcome
    }

    async fn fail_over(&self, from: String, watermark: u64) -> TickOutcome {
        match self.pool.open_excluding(&from).await {
            Ok(handle) => {
                let to = handle.endpoint().to_string();
                // The previous handle is released once the last query holding
                // a snapshot of it finishes.
                drop(self.active.replace(handle));
                self.metrics.increment_failovers();
                log_event(Event::FailoverComplete, &[("from", &from), ("to", &to)]);
                TickOutcome::FailedOver { from, to, watermark }
            }
            Err(e) => {
                self.metrics.increment_failovers_failed();
                log_event(
                    Event::FailoverFailed,
                    &[("replica", &from), ("error", &e.to_string())],
                );
                TickOutcome::StalledNoCandidate {
                    endpoint: from,
                    watermark,
                }
            }
        }
    }

    fn watermark_unavailable(&self, endpoint: &str, cause: &str) -> TickOutcome {
        self.metrics.increment_watermark_read_failures();
        log_event(
            Event::WatermarkReadFailed,
            &[("replica", endpoint), ("error", cause)],
        );
        TickOutcome::WatermarkUnavailable
    }

    /// Start the timer loop. The first tick fires one `period` from now.
    ///
    /// Each tick runs in its own task so a slow check cannot delay the timer;
    /// overlapping ticks hit the single-flight guard and are dropped. The loop
    /// exits when `shutdown` flips to `true` (or its sender is dropped) and
    /// waits for an in-flight check before returning.
    pub fn spawn(
        self: Arc<Self>,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(period, shutdown))
    }

    async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let monitor = Arc::clone(&self);
                    in_flight.spawn(async move {
                        monitor.tick().await;
                    });
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        while in_flight.join_next().await.is_some() {}
    }
}
