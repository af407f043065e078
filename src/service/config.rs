//! Service configuration

use std::time::Duration;

use super::errors::{ServiceError, ServiceResult};
use crate::ledger::DEFAULT_QUERY_TIMEOUT;
use crate::replication::{ReplicaDescriptor, DEFAULT_CHECK_INTERVAL};

/// Default deadline for opening one replica connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime settings for [`TransferHistoryService`](super::TransferHistoryService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Replicas in failover order
    pub replicas: Vec<ReplicaDescriptor>,
    /// Health monitor tick period
    pub check_interval: Duration,
    pub connect_timeout: Duration,
    /// Deadline for each store read, monitor and queries alike
    pub query_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(replicas: Vec<ReplicaDescriptor>) -> Self {
        Self {
            replicas,
            check_interval: DEFAULT_CHECK_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.replicas.is_empty() {
            return Err(ServiceError::InvalidConfig(
                "at least one replica must be configured".to_string(),
            ));
        }
        for (name, value) in [
            ("check_interval", self.check_interval),
            ("connect_timeout", self.connect_timeout),
            ("query_timeout", self.query_timeout),
        ] {
            if value.is_zero() {
                return Err(ServiceError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}
