//! Replica Descriptors
//!
//! Loaded once from configuration, immutable afterwards. The order of the
//! descriptor list is significant: it is the order replicas are tried in.

use std::fmt;

/// Connection parameters for one ledger replica.
#[derive(Clone, PartialEq, Eq)]
pub struct ReplicaDescriptor {
    /// Store driver name (`mysql`)
    pub driver: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Database (schema) name
    pub database: String,
}

impl ReplicaDescriptor {
    pub fn new(
        driver: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            database: database.into(),
        }
    }

    /// Identifier of the replica, `host:port`.
    ///
    /// Failover excludes the active replica by this identifier.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ReplicaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaDescriptor")
            .field("driver", &self.driver)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}
