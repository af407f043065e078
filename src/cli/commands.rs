//! CLI command implementations
//!
//! `start` boots in a fixed order: load config, configure logging, open a
//! replica and start the health monitor, then serve HTTP until SIGINT,
//! SIGTERM or SIGQUIT. On the way out the HTTP server drains, then the
//! service stops and releases its connection.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;

use super::args::Command;
use super::config::{EnvConfig, Environment};
use super::errors::{CliError, CliResult};
use crate::http_server::{HttpServer, HttpServerConfig, VerificationCodes};
use crate::observability::{log_event, Event, Logger};
use crate::service::{ServiceConfig, TransferHistoryService};
use crate::store::MySqlConnector;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { config, env } => start(&config, env),
        Command::CheckConfig { config, env } => check_config(&config, env),
    }
}

/// Start the service and serve until a termination signal arrives.
pub fn start(config_path: &Path, env: Environment) -> CliResult<()> {
    let config = load_config(config_path, env)?;

    let service_config = config.service_config()?;
    let http_config = config.http_config()?;
    let codes = config.verification_codes();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(serve(service_config, http_config, codes))
}

/// Validate the configuration and print a summary.
pub fn check_config(config_path: &Path, env: Environment) -> CliResult<()> {
    let config = EnvConfig::load(config_path, env)?;
    let replicas: Vec<String> = config.replicas()?.iter().map(|r| r.endpoint()).collect();
    let http = config.http_config()?;

    println!("config ok: env={} listen={}", env, http.socket_addr());
    println!("replicas (failover order): {}", replicas.join(", "));
    println!("verification codes: {}", config.verification_code_list.len());
    Ok(())
}

fn load_config(config_path: &Path, env: Environment) -> CliResult<EnvConfig> {
    let config = EnvConfig::load(config_path, env)?;

    if let Some(severity) = config.severity()? {
        Logger::set_min_severity(severity);
    }
    if let Some(path) = config.log_file() {
        Logger::set_output_file(path).map_err(|e| {
            CliError::config_error(format!("Cannot open log file {}: {}", path.display(), e))
        })?;
    }

    let path = config_path.display().to_string();
    let replicas = config.full_node_db_list.len().to_string();
    log_event(
        Event::ConfigLoaded,
        &[("path", &path), ("env", env.as_str()), ("replicas", &replicas)],
    );
    Ok(config)
}

async fn serve(
    service_config: ServiceConfig,
    http_config: HttpServerConfig,
    codes: VerificationCodes,
) -> CliResult<()> {
    let connector = Arc::new(MySqlConnector::new(service_config.connect_timeout));
    let service = Arc::new(TransferHistoryService::new(service_config, connector));

    service
        .start_service()
        .await
        .map_err(|e| CliError::boot_failed(e.to_string()))?;

    let server = HttpServer::new(http_config, Arc::clone(&service), codes);
    let served = server.start(shutdown_signal()).await;

    service.stop_service().await;
    served.map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        match (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::quit()),
        ) {
            (Ok(mut term), Ok(mut quit)) => tokio::select! {
                _ = term.recv() => "SIGTERM",
                _ = quit.recv() => "SIGQUIT",
            },
            _ => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    };
    log_event(Event::SignalReceived, &[("signal", received)]);
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("transfer_history.json");
        let config = json!({
            "test": {
                "httpPort": "18000",
                "fullNodeDbList": [{
                    "fullNodeDbDriver": "mysql",
                    "fullNodeDbUser": "reader",
                    "fullNodeDbPassword": "secret",
                    "fullNodeDbName": "cos",
                    "fullNodeDbHost": "127.0.0.1",
                    "fullNodeDbPort": "3306"
                }],
                "verificationCodeList": ["abc"]
            }
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_check_config_accepts_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        check_config(&config_path, Environment::Test).unwrap();
    }

    #[test]
    fn test_start_without_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.json");

        let err = start(&missing, Environment::Pro).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_start_with_missing_section_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = run_command(Command::Start {
            config: config_path,
            env: Environment::Dev,
        })
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
