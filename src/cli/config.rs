//! Configuration file
//!
//! One JSON file holds a section per environment:
//!
//! ```json
//! {
//!   "pro": {
//!     "httpPort": "8000",
//!     "logPath": "/var/log/transfer_history/service.log",
//!     "fullNodeDbList": [{
//!       "fullNodeDbDriver": "mysql", "fullNodeDbUser": "reader",
//!       "fullNodeDbPassword": "secret", "fullNodeDbName": "cos",
//!       "fullNodeDbHost": "10.0.0.1", "fullNodeDbPort": "3306"
//!     }],
//!     "verificationCodeList": ["..."]
//!   }
//! }
//! ```
//!
//! Ports are strings in the file; they are parsed and range-checked here.
//! `httpHost` (default `0.0.0.0`), `corsOrigins` (default: any origin),
//! `healthCheckIntervalSecs`, `connectTimeoutSecs`, `queryTimeoutSecs` and
//! `logLevel` are optional.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::http_server::{HttpServerConfig, VerificationCodes, DEFAULT_HTTP_HOST};
use crate::observability::Severity;
use crate::replication::ReplicaDescriptor;
use crate::service::ServiceConfig;

/// Configuration section selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Test,
    Pro,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Pro => "pro",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    dev: Option<EnvConfig>,
    test: Option<EnvConfig>,
    pro: Option<EnvConfig>,
}

/// One replica entry of `fullNodeDbList`
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbEntry {
    pub full_node_db_driver: String,
    pub full_node_db_user: String,
    pub full_node_db_password: String,
    pub full_node_db_name: String,
    pub full_node_db_host: String,
    pub full_node_db_port: String,
}

impl fmt::Debug for DbEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbEntry")
            .field("driver", &self.full_node_db_driver)
            .field("user", &self.full_node_db_user)
            .field("password", &"<redacted>")
            .field("database", &self.full_node_db_name)
            .field("host", &self.full_node_db_host)
            .field("port", &self.full_node_db_port)
            .finish()
    }
}

impl DbEntry {
    fn to_descriptor(&self) -> CliResult<ReplicaDescriptor> {
        if self.full_node_db_host.is_empty() {
            return Err(CliError::config_error("fullNodeDbHost must not be empty"));
        }
        let port = parse_port(&self.full_node_db_port, "fullNodeDbPort")?;
        Ok(ReplicaDescriptor::new(
            &self.full_node_db_driver,
            &self.full_node_db_user,
            &self.full_node_db_password,
            &self.full_node_db_host,
            port,
            &self.full_node_db_name,
        ))
    }
}

/// Settings for one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfig {
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: String,

    /// Origins allowed by CORS; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Log file; empty logs to stdout / stderr
    #[serde(default)]
    pub log_path: String,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Replicas in failover order
    #[serde(default)]
    pub full_node_db_list: Vec<DbEntry>,

    #[serde(default)]
    pub verification_code_list: Vec<String>,

    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_http_host() -> String {
    DEFAULT_HTTP_HOST.to_string()
}

fn default_http_port() -> String {
    "8000".to_string()
}

fn default_health_check_interval_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn parse_port(raw: &str, key: &str) -> CliResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(CliError::config_error(format!("Invalid {}: '{}'", key, raw))),
    }
}

impl EnvConfig {
    /// Load the section for `env` from the file at `path`.
    pub fn load(path: &Path, env: Environment) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        let section = match env {
            Environment::Dev => file.dev,
            Environment::Test => file.test,
            Environment::Pro => file.pro,
        };
        let config = section.ok_or_else(|| {
            CliError::config_error(format!("No '{}' section in config", env))
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        self.http_config()?;

        if self.full_node_db_list.is_empty() {
            return Err(CliError::config_error("fullNodeDbList must not be empty"));
        }
        self.replicas()?;

        for (key, value) in [
            ("healthCheckIntervalSecs", self.health_check_interval_secs),
            ("connectTimeoutSecs", self.connect_timeout_secs),
            ("queryTimeoutSecs", self.query_timeout_secs),
        ] {
            if value == 0 {
                return Err(CliError::config_error(format!("{} must be > 0", key)));
            }
        }

        self.severity()?;
        Ok(())
    }

    /// Replica descriptors in configured order.
    pub fn replicas(&self) -> CliResult<Vec<ReplicaDescriptor>> {
        self.full_node_db_list
            .iter()
            .map(DbEntry::to_descriptor)
            .collect()
    }

    pub fn service_config(&self) -> CliResult<ServiceConfig> {
        Ok(ServiceConfig::new(self.replicas()?)
            .with_check_interval(Duration::from_secs(self.health_check_interval_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_query_timeout(Duration::from_secs(self.query_timeout_secs)))
    }

    pub fn http_config(&self) -> CliResult<HttpServerConfig> {
        if self.http_host.trim().is_empty() {
            return Err(CliError::config_error("httpHost must not be empty"));
        }
        let port = parse_port(&self.http_port, "httpPort")?;
        HttpServerConfig::new(self.http_host.trim(), port)
            .with_cors_origins(&self.cors_origins)
            .map_err(CliError::config_error)
    }

    pub fn verification_codes(&self) -> VerificationCodes {
        VerificationCodes::new(self.verification_code_list.iter().cloned())
    }

    /// Configured minimum log severity, if any.
    pub fn severity(&self) -> CliResult<Option<Severity>> {
        self.log_level
            .as_deref()
            .map(|level| level.parse().map_err(CliError::config_error))
            .transpose()
    }

    pub fn log_file(&self) -> Option<&Path> {
        if self.log_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.log_path))
        }
    }
}
