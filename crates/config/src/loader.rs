use std::path::Path;

use anyhow::Context;

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

    validate(&config)?;

    log::debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    config.server.rate_limits.validate()?;

    if config.server.shutdown.drain_deadline.is_zero() {
        log::warn!("server.shutdown.drain_deadline is zero; background tasks will not be waited for on shutdown");
    }

    if config.auth.token_ttl.is_zero() {
        anyhow::bail!("auth.token_ttl must be greater than zero");
    }

    if !config.server.health.path.starts_with('/') {
        anyhow::bail!("server.health.path must start with '/', got '{}'", config.server.health.path);
    }

    if !config.server.debug_vars.path.starts_with('/') {
        anyhow::bail!(
            "server.debug_vars.path must start with '/', got '{}'",
            config.server.debug_vars.path
        );
    }

    Ok(())
}
