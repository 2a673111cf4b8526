//! # Asana Connector Service
//!
//! Binary entry point for the Asana webhook connector.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Wires the user store, token provider, Asana client factory and event handler
//! - Starts the HTTP server from asana-connector-api

use anyhow::Context;
use asana_connector_api::{start_server, AppState, LoggingConfig, ServiceConfig};
use asana_connector_core::adapters::{
    AsanaClientFactory, FilesystemUserStore, InMemoryUserStore, LoggingEventHandler,
    StoredTokenProvider,
};
use asana_connector_core::UserStore;
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for configuration that cannot be loaded or is invalid.
const EXIT_INVALID_CONFIG: i32 = 3;

/// Environment variable naming an operator-supplied configuration file.
const CONFIG_FILE_ENV: &str = "ASANA_CONNECTOR_CONFIG_FILE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty());

    // Logging is configured from the loaded file, so a broken configuration
    // can only be reported on stderr.
    let service_config = match load_config(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load service configuration; aborting: {e}");
            std::process::exit(EXIT_INVALID_CONFIG);
        }
    };

    init_tracing(&service_config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Asana connector service");
    if let Some(path) = &explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(EXIT_INVALID_CONFIG);
    }

    let store = build_store(&service_config)
        .await
        .context("failed to initialise user store")?;

    let tokens = Arc::new(StoredTokenProvider::new());
    let clients = Arc::new(AsanaClientFactory::new(
        tokens,
        service_config.asana.client_config(),
    ));
    let handler = Arc::new(LoggingEventHandler::new());

    let state = AppState::new(service_config, store, clients, handler)
        .context("failed to build application state")?;

    start_server(state).await.context("HTTP server failed")?;

    info!("Asana connector service stopped");
    Ok(())
}

/// Load configuration, later sources overriding earlier ones:
///
/// 1. `/etc/asana-connector/service.yaml`
/// 2. `./config/service.yaml`
/// 3. the file named by `ASANA_CONNECTOR_CONFIG_FILE` (must exist when set)
/// 4. environment variables prefixed `AC__`, e.g. `AC__SERVER__PORT=9090`
///
/// Missing optional files fall back to the built-in defaults.
fn load_config(explicit_path: Option<&str>) -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/asana-connector/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    builder
        .add_source(config::Environment::with_prefix("AC").separator("__"))
        .build()?
        .try_deserialize()
}

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn default_filter(level: &str) -> String {
    format!(
        "asana_connector_service={level},asana_connector_api={level},\
         asana_connector_core={level},tower_http=debug"
    )
}

/// Filesystem store under `storage.data_dir`, in-memory otherwise.
async fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match &config.storage.data_dir {
        Some(dir) => {
            let store = FilesystemUserStore::new(PathBuf::from(dir)).await?;
            info!(data_dir = %dir, "Using filesystem user store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No storage.data_dir configured; user profiles are kept in memory only");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
