//! Observable events
//!
//! Every log line the service emits is keyed by one of these events, so
//! operators can grep a stable name instead of free text.

use std::fmt;

use super::logger::Severity;

/// Observable events in the transfer history service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Service startup begins
    ServiceStart,
    /// Initial replica connection established, monitor running
    ServiceReady,
    /// Service startup failed
    ServiceStartFailed,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,
    /// Configuration loaded
    ConfigLoaded,
    /// HTTP listener bound
    HttpServing,
    /// Termination signal received
    SignalReceived,

    // Replica pool
    /// A replica accepted a connection
    ReplicaConnected,
    /// A replica refused or timed out
    ReplicaConnectFailed,
    /// Closing a replica connection failed
    ReplicaCloseFailed,
    /// Connection left to close when its last in-flight query finishes
    ReplicaReleaseDeferred,

    // Health monitor
    /// Health check tick started
    HealthCheckBegin,
    /// Health check tick finished
    HealthCheckComplete,
    /// Tick dropped because a check was still running
    HealthCheckSkipped,
    /// Watermark could not be read from the active replica
    WatermarkReadFailed,
    /// Active replica watermark did not advance
    ReplicaStalled,
    /// Active connection swapped to another replica
    FailoverComplete,
    /// No other replica could be opened
    FailoverFailed,

    // Queries
    /// Range or point query answered
    QueryServed,
    /// Query failed with a structured error
    QueryFailed,
    /// HTTP request rejected before reaching the query engine
    RequestRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServiceStart => "SERVICE_START",
            Event::ServiceReady => "SERVICE_READY",
            Event::ServiceStartFailed => "SERVICE_START_FAILED",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::HttpServing => "HTTP_SERVING",
            Event::SignalReceived => "SIGNAL_RECEIVED",

            Event::ReplicaConnected => "REPLICA_CONNECTED",
            Event::ReplicaConnectFailed => "REPLICA_CONNECT_FAILED",
            Event::ReplicaCloseFailed => "REPLICA_CLOSE_FAILED",
            Event::ReplicaReleaseDeferred => "REPLICA_RELEASE_DEFERRED",

            Event::HealthCheckBegin => "HEALTH_CHECK_BEGIN",
            Event::HealthCheckComplete => "HEALTH_CHECK_COMPLETE",
            Event::HealthCheckSkipped => "HEALTH_CHECK_SKIPPED",
            Event::WatermarkReadFailed => "WATERMARK_READ_FAILED",
            Event::ReplicaStalled => "REPLICA_STALLED",
            Event::FailoverComplete => "FAILOVER_COMPLETE",
            Event::FailoverFailed => "FAILOVER_FAILED",

            Event::QueryServed => "QUERY_SERVED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::RequestRejected => "REQUEST_REJECTED",
        }
    }

    /// Default severity for the event
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryServed | Event::HealthCheckBegin | Event::HealthCheckComplete => {
                Severity::Debug
            }
            Event::HealthCheckSkipped | Event::ReplicaStalled | Event::RequestRejected => {
                Severity::Warn
            }
            Event::ServiceStartFailed
            | Event::ReplicaConnectFailed
            | Event::ReplicaCloseFailed
            | Event::WatermarkReadFailed
            | Event::FailoverFailed
            | Event::QueryFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
