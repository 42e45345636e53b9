// crates/viper-daemon/src/config.rs
//
// Runtime configuration for the dispatcher daemon.
// Loaded from a TOML file or populated with sensible defaults.

use std::collections::HashSet;
use std::fs;

use serde::Deserialize;
use thiserror::Error;

use viper_core::{ChainId, Endpoint, EndpointId, HealthStatus};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate endpoint id {0}")]
    DuplicateEndpoint(EndpointId),

    #[error("Endpoint {0} uses the reserved Viper Network chain id")]
    ReservedChain(EndpointId),
}

/// One statically configured backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub id: EndpointId,
    pub chain_id: i64,
    pub url: String,

    /// Lower values are preferred.
    #[serde(default)]
    pub priority: i32,

    /// Disabled endpoints are never returned as active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl EndpointConfig {
    /// Build the directory record for this endpoint.
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint {
            id: self.id,
            chain_id: ChainId(self.chain_id),
            url: self.url.clone(),
            priority: self.priority,
            status: HealthStatus::Unknown,
        }
    }
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Host address for the RPC front end.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC front end.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ceiling on a single outbound call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL of the Viper Network gateway.
    #[serde(default = "default_viper_gateway_url")]
    pub viper_gateway_url: String,

    /// Backend endpoints for pass-through chains.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    8545
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_viper_gateway_url() -> String {
    "http://127.0.0.1:8082".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            viper_gateway_url: default_viper_gateway_url(),
            endpoints: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate endpoint ids and endpoints on the reserved chain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.id) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.id));
            }
            if ChainId(endpoint.chain_id).is_viper_network() {
                return Err(ConfigError::ReservedChain(endpoint.id));
            }
        }
        Ok(())
    }
}
