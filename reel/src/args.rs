use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use config::{Config, CorsConfig, Environment};
use logforth::filter::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "Reel", version, long_about = concat!("Reel movie catalog API v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address on which the server will listen for incoming connections.
    /// Default: 127.0.0.1:4000
    #[arg(short, long, env = "REEL_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "REEL_CONFIG_PATH", default_value = "./reel.toml")]
    pub config: PathBuf,
    /// Environment (development|staging|production)
    #[arg(long = "env", env = "REEL_ENV")]
    pub environment: Option<Environment>,
    /// Rate limiter maximum requests per second
    #[arg(long, env = "REEL_LIMITER_RPS")]
    pub limiter_rps: Option<f64>,
    /// Rate limiter maximum burst
    #[arg(long, env = "REEL_LIMITER_BURST")]
    pub limiter_burst: Option<u32>,
    /// Enable rate limiter
    #[arg(long, env = "REEL_LIMITER_ENABLED")]
    pub limiter_enabled: Option<bool>,
    /// Trusted CORS origins (space separated)
    #[arg(long, env = "REEL_CORS_TRUSTED_ORIGINS", value_delimiter = ' ', num_args = 1..)]
    pub cors_trusted_origins: Vec<Url>,
    /// Set the logging level for all log events.
    #[arg(long = "log", env = "REEL_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "REEL_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    /// The configuration file, if it exists, with command line overrides applied.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            Config::default()
        };

        if let Some(environment) = self.environment {
            config.server.environment = environment;
        }

        let limits = &mut config.server.rate_limits;

        if let Some(rps) = self.limiter_rps {
            limits.requests_per_second = rps;
        }

        if let Some(burst) = self.limiter_burst {
            limits.burst = burst;
        }

        if let Some(enabled) = self.limiter_enabled {
            limits.enabled = enabled;
        }

        if !self.cors_trusted_origins.is_empty() {
            config.server.cors = Some(CorsConfig::with_trusted_origins(self.cors_trusted_origins.clone()));
        }

        config.validate().context("Invalid command line overrides")?;

        Ok(config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

const WORKSPACE_CRATES: &[&str] = &[
    "reel",
    "server",
    "catalog",
    "config",
    "rate_limit",
    "background",
    "telemetry",
];

impl LogLevel {
    pub fn env_filter(self) -> anyhow::Result<EnvFilter> {
        let filter = match self {
            LogLevel::Off => Cow::Borrowed("off"),
            // Dependencies stay at warn, workspace crates use the selected level.
            level => {
                let mut filter = String::from("warn");

                for name in WORKSPACE_CRATES {
                    filter.push_str(&format!(",{name}={level}"));
                }

                Cow::Owned(filter)
            }
        };

        EnvFilter::from_str(&filter).map_err(|e| anyhow::anyhow!("Invalid log filter '{filter}': {e}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
