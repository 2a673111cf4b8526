//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use asana_sdk::client::{ClientConfig, WebhookFilter, WebhookFilterOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service configuration
///
/// Every field has a default, so an empty configuration source yields a
/// runnable local service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Connector behaviour: public URL, self-relay and onboarding example
    pub connector: ConnectorConfig,

    /// Asana API client settings
    pub asana: AsanaConfig,

    /// User profile storage
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than zero".to_string(),
            });
        }

        if self.connector.base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "connector.base_url".to_string(),
            });
        }

        let base_url =
            url::Url::parse(&self.connector.base_url).map_err(|e| ConfigError::Invalid {
                message: format!("connector.base_url is not a valid URL: {}", e),
            })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                message: format!(
                    "connector.base_url must use http or https, got '{}'",
                    base_url.scheme()
                ),
            });
        }

        if self.connector.relay.marker.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "connector.relay.marker must not be empty".to_string(),
            });
        }

        if self.asana.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "asana.timeout_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Connector behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Public URL Asana calls back on; webhook targets are built from it
    pub base_url: String,

    pub relay: RelayConfig,

    pub onboarding: OnboardingConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            relay: RelayConfig::default(),
            onboarding: OnboardingConfig::default(),
        }
    }
}

/// Self-relay ("acknowledge fast, process on a second request") settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,

    /// Delay before acknowledging the original delivery
    pub delay_ms: u64,

    /// Query flag marking the relayed copy
    pub marker: String,
}

impl RelayConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 100,
            marker: "dispatch".to_string(),
        }
    }
}

/// Subscription created by the `/start` onboarding route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// gid of the Asana resource to subscribe to
    pub example_resource_id: String,

    pub example_filters: Vec<WebhookFilter>,
}

impl OnboardingConfig {
    pub fn filter_options(&self) -> WebhookFilterOptions {
        WebhookFilterOptions {
            filters: self.example_filters.clone(),
        }
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            example_resource_id: "1199170056173519".to_string(),
            example_filters: vec![
                WebhookFilter::new("task", "changed").with_fields(["custom_fields"])
            ],
        }
    }
}

/// Asana API client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsanaConfig {
    pub api_url: String,

    /// Upper bound for every Asana API call
    pub timeout_seconds: u64,

    pub user_agent: String,
}

impl AsanaConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_asana_api_url(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_user_agent(self.user_agent.clone())
    }
}

impl Default for AsanaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://app.asana.com/api/1.0".to_string(),
            timeout_seconds: 30,
            user_agent: format!("asana-connector/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// User profile storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the filesystem store; profiles are kept in memory when unset
    pub data_dir: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
