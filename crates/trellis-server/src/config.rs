//! Configuration for the Trellis server, loaded from environment
//! variables with sensible defaults.

use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Remote catalog URL; absent means an empty allow-list catalog
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// Token for the catalog's Basic-auth header
    #[serde(default)]
    pub catalog_auth_token: Option<String>,

    /// Verbatim Authorization header for the catalog, overriding the token
    #[serde(default)]
    pub catalog_auth_header: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        let mut config = Self::default();

        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Ok(catalog_url) = env::var("CATALOG_URL") {
            if catalog_url.is_empty() {
                return Err(ServerError::ConfigError(
                    "CATALOG_URL must not be empty when set".to_string(),
                ));
            }
            config.catalog_url = Some(catalog_url);
        }

        if let Ok(token) = env::var("CATALOG_AUTH_TOKEN") {
            config.catalog_auth_token = Some(token);
        }

        if let Ok(header) = env::var("CATALOG_AUTH_HEADER") {
            config.catalog_auth_header = Some(header);
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if config.catalog_url.is_none() {
            warn!("No CATALOG_URL provided - endpoint validation will pass everything through");
        }
        if config.catalog_url.is_some()
            && config.catalog_auth_token.is_none()
            && config.catalog_auth_header.is_none()
        {
            warn!("Catalog URL set but no auth configured - requests will be anonymous");
        }

        info!("Loaded server configuration");
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            catalog_url: None,
            catalog_auth_token: None,
            catalog_auth_header: None,
            log_level: default_log_level(),
        }
    }
}
