//! FindItNow server binary.
//!
//! Serves access code verification and the found-items catalog over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Ephemeral server, everything in memory
//! finditnow-server
//!
//! # Persistent code table and local catalog
//! finditnow-server --listen 0.0.0.0:8080 --data /var/lib/finditnow
//!
//! # Catalog in S3, credentials from AWS_* variables
//! FINDITNOW__DATA=/var/lib/finditnow \
//! FINDITNOW__CATALOG_URL=s3://found-items \
//! finditnow-server
//!
//! # Provision an access code (server stopped)
//! finditnow-server --data /var/lib/finditnow codes issue SPRING-24
//! ```

use std::io::IsTerminal;

use clap::Parser;
use finditnow_server::{
    bootstrap::{self, BootstrapError},
    config::{self, Cli, CliCommand, CodesAction, Config, ConfigAction, ConfigError, LogFormat},
    router, shutdown,
};
use finditnow_types::config::FindItNowConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level error type for the server binary.
#[derive(Debug)]
enum ServerError {
    Config(ConfigError),
    Bootstrap(BootstrapError),
    Server(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "configuration error: {}", e),
            ServerError::Bootstrap(e) => write!(f, "bootstrap error: {}", e),
            ServerError::Server(e) => write!(f, "server error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let settings = cli.config;

    if let Some(CliCommand::Config { action }) = &cli.command {
        match action {
            ConfigAction::Example => print!("{}", FindItNowConfig::example_toml()),
            ConfigAction::Schema => {
                println!("{}", config::config_schema().map_err(ServerError::Config)?);
            },
        }
        return Ok(());
    }

    init_logging(&settings);
    let config = settings.resolve().map_err(ServerError::Config)?;

    if let Some(CliCommand::Codes { action: CodesAction::Issue { code } }) = cli.command {
        let issued = bootstrap::issue_code(&config, &code).map_err(ServerError::Bootstrap)?;
        println!("{issued}");
        return Ok(());
    }

    let catalog_url = config
        .storage
        .resolved_catalog_url()
        .map_err(|e| ServerError::Config(ConfigError::Parse(e)))?;
    tracing::info!(
        listen_addr = %settings.listen_addr,
        catalog_url = %catalog_url,
        "Starting FindItNow"
    );

    if settings.is_localhost_only() {
        tracing::warn!(
            "Listening on localhost only. Remote connections will be rejected. \
             Set --listen or FINDITNOW__LISTEN to accept remote connections."
        );
    }

    if config.storage.is_ephemeral() {
        tracing::warn!(
            "Running in ephemeral mode. Access codes and catalog entries will be lost on \
             shutdown. Set --data or FINDITNOW__DATA for persistent storage."
        );
    }

    let state = bootstrap::bootstrap(&config).map_err(ServerError::Bootstrap)?;
    let app = router(state, &config);

    let listener =
        tokio::net::TcpListener::bind(settings.listen_addr).await.map_err(ServerError::Server)?;
    tracing::info!("Server ready, accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .map_err(ServerError::Server)?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the logging system.
///
/// Supports three formats:
/// - `Text`: Human-readable format (development)
/// - `Json`: JSON structured logging (production)
/// - `Auto`: JSON for non-TTY stdout, text otherwise
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}
