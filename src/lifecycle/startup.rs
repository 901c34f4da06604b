//! Startup orchestration.
//!
//! # Responsibilities
//! - Merge command-line overrides into the loaded configuration
//! - Install the log subscriber
//! - Start the metrics exporter when enabled
//! - Bind the listener and run the server until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;

use crate::config::{read_config, validate_config, ConfigError, ServerConfig, SiteConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{self, metrics, LoggingError, LoggingGuard};
use crate::routing::host::WILDCARD;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub bind: Option<String>,
    /// Serve this directory as the wildcard site.
    pub root: Option<PathBuf>,
}

/// Load the config file (if any), apply overrides, then validate.
pub fn resolve_config(overrides: &Overrides) -> Result<ServerConfig, ConfigError> {
    let mut config = match &overrides.config {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = &overrides.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(root) = &overrides.root {
        config.domains.insert(WILDCARD.to_string(), SiteConfig::serve(root));
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Install the global log subscriber. Keep the guard alive until exit.
pub fn init_logging(config: &ServerConfig) -> Result<LoggingGuard, ServerError> {
    Ok(observability::init_logging(&config.observability)?)
}

/// Run a validated configuration until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind { address, source })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signals = signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    let result = server.run(listener, shutdown.subscribe()).await;
    signals.abort();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
