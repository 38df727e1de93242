//! HTTP server configuration settings.

use std::{borrow::Cow, fmt, net::SocketAddr, str::FromStr, time::Duration};

use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize};

use crate::{CorsConfig, HealthConfig, RateLimitConfig};

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// The deployment environment, reported by the health endpoint.
    #[serde(default)]
    pub environment: Environment,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// CORS configuration
    pub cors: Option<CorsConfig>,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Graceful shutdown configuration
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    /// Operational variables endpoint configuration
    #[serde(default)]
    pub debug_vars: DebugVarsConfig,
}

/// The environment the server runs in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Pre-production.
    Staging,
    /// Production.
    Production,
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            _ => Err(format!("Unknown environment: {s}")),
        }
    }
}

/// Graceful shutdown settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// How long to wait for outstanding background tasks before exiting anyway.
    #[serde(deserialize_with = "deserialize_duration")]
    pub drain_deadline: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_deadline: Duration::from_secs(30),
        }
    }
}

/// Operational variables endpoint configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugVarsConfig {
    /// Whether the endpoint is exposed.
    pub enabled: bool,
    /// The path for the endpoint.
    pub path: Cow<'static, str>,
}

impl Default for DebugVarsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: Cow::Borrowed("/debug/vars"),
        }
    }
}
