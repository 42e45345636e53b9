// crates/viper-core/src/endpoint.rs
//
// Endpoint records and chain identifiers.
//
// Endpoint records are owned by the endpoint directory. The dispatcher only
// reads them and requests health changes through the directory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Integer discriminator selecting which backend family a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub i64);

impl ChainId {
    /// The reserved chain served by the Viper Network, which needs format
    /// translation in both directions. Changing this value breaks clients.
    pub const VIPER_NETWORK: ChainId = ChainId(0);

    /// Whether requests for this chain go through the translation path.
    pub fn is_viper_network(self) -> bool {
        self == Self::VIPER_NETWORK
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(ChainId)
    }
}

impl From<i64> for ChainId {
    fn from(value: i64) -> Self {
        ChainId(value)
    }
}

/// Directory-assigned endpoint identifier.
pub type EndpointId = i64;

/// Health classification of an endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The last call through this endpoint succeeded.
    Healthy,
    /// The last call through this endpoint failed at the transport level.
    Error,
    /// No call has been made yet.
    #[default]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Error => "error",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate backend address for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    /// Chain this endpoint serves.
    pub chain_id: ChainId,
    /// Full URL the raw request is POSTed to.
    pub url: String,
    /// Preference rank; lower is preferred.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub status: HealthStatus,
}
