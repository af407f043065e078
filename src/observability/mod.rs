//! Observability
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Operational counters
//!
//! Observability is read-only: a failure to log never changes what a query
//! returns or whether a failover happens.
//!
//! # Usage
//!
//! ```ignore
//! use transfer_history::observability::{log_event, Event};
//!
//! log_event(Event::ReplicaStalled, &[("replica", "10.0.0.1:3306")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
