//! transfer-history - queryable transfer history over redundant ledger replicas
//!
//! - [`replication`]: replica pool, active connection, watermark health monitor
//! - [`ledger`]: range and point transfer queries
//! - [`service`]: start / stop lifecycle tying the two together
//! - [`http_server`], [`cli`]: the runnable service around the core

pub mod cli;
pub mod http_server;
pub mod ledger;
pub mod observability;
pub mod replication;
pub mod service;
pub mod store;
