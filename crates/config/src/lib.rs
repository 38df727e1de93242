//! Reel configuration structures to map the reel.toml configuration.

#![deny(missing_docs)]

mod auth;
mod cors;
mod health;
mod loader;
mod mailer;
mod rate_limit;
mod server;
mod telemetry;

use std::path::Path;

pub use auth::AuthConfig;
pub use cors::*;
pub use health::HealthConfig;
pub use mailer::MailerConfig;
pub use rate_limit::RateLimitConfig;
pub use server::{DebugVarsConfig, Environment, ServerConfig, ShutdownConfig};
pub use telemetry::{MetricsConfig, OtlpExporterConfig, OtlpProtocol, TelemetryConfig};
use serde::Deserialize;

/// Main configuration structure for the Reel service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token lifetimes.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Outbound email settings.
    #[serde(default)]
    pub mailer: MailerConfig,
    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates settings that cannot be expressed through deserialization alone.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}
