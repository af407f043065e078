//! # HTTP Server Module
//!
//! Axum front end for the transfer history service.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/getTransferHistory` - Transfers since a start block
//! - `/api/getTransferHistoryByBlock` - Transfers at one block
//! - `/observability/*` - Metrics and replica status

pub mod config;
pub mod errors;
pub mod history_routes;
pub mod observability_routes;
pub mod server;
pub mod verification;

pub use config::{HttpServerConfig, DEFAULT_HTTP_HOST};
pub use errors::HttpError;
pub use server::HttpServer;
pub use verification::VerificationCodes;
