//! Token lifetimes for user activation and authentication.

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Token configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Lifetime of bearer tokens issued by `POST /v1/tokens/authentication`.
    #[serde(deserialize_with = "deserialize_duration")]
    pub token_ttl: Duration,
    /// Lifetime of activation tokens mailed to newly registered users.
    #[serde(deserialize_with = "deserialize_duration")]
    pub activation_ttl: Duration,
    /// Permission codes granted to every newly registered user.
    pub default_permissions: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(24 * 60 * 60),
            activation_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            default_permissions: vec!["movies:read".to_string()],
        }
    }
}
