//! Environment-driven configuration.
//!
//! Everything is read once at startup. The store URL is mandatory and the
//! process refuses to start without it; every other setting falls back to a
//! default, logging a warning when the supplied value cannot be parsed.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `MONGODB_URL` | (required) | MongoDB connection string |
//! | `PORT` | 3001 | Listening port (consumed by the CLI layer) |
//! | `PARKNET_ALLOWED_ORIGINS` | local dev origins | Comma-separated exact allow-list |
//! | `PARKNET_TRUSTED_ORIGIN_SUFFIX` | `.vercel.app` | Wildcard origin suffix; empty disables |
//! | `PARKNET_RATE_LIMIT_WINDOW_SECS` | 900 | Throttling window |
//! | `PARKNET_RATE_LIMIT_MAX` | 100 | Requests allowed per client per window |
//! | `PARKNET_ENV` | `development` | Deployment mode; gates 500-detail echoing |

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Default listening port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:8080",
    "http://127.0.0.1:8080",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

const DEFAULT_TRUSTED_ORIGIN_SUFFIX: &str = ".vercel.app";
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Configuration errors that prevent startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MONGODB_URL environment variable is not defined")]
    MissingMongoUrl,
}

/// Deployment mode. Controls whether internal error detail is echoed to
/// clients on 500-class responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Process-wide application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// MongoDB connection string.
    pub mongodb_url: String,
    /// Exact origin allow-list for the gatekeeper.
    pub allowed_origins: Vec<String>,
    /// Trusted wildcard origin suffix (e.g. `.vercel.app`); `None` disables
    /// suffix matching.
    pub trusted_origin_suffix: Option<String>,
    /// Throttling window duration.
    pub rate_limit_window: Duration,
    /// Requests allowed per client address per window.
    pub rate_limit_max: u32,
    /// Deployment mode.
    pub environment: Environment,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails only when `MONGODB_URL` is absent; all other settings default
    /// with a warning on invalid input.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongodb_url =
            std::env::var("MONGODB_URL").map_err(|_| ConfigError::MissingMongoUrl)?;

        let allowed_origins = match std::env::var("PARKNET_ALLOWED_ORIGINS") {
            Ok(raw) => {
                let origins = parse_origin_list(&raw);
                if origins.is_empty() {
                    warn!(
                        env_var = "PARKNET_ALLOWED_ORIGINS",
                        value = %raw,
                        "Empty origin allow-list, using defaults"
                    );
                    default_allowed_origins()
                } else {
                    origins
                }
            }
            Err(_) => default_allowed_origins(),
        };

        let trusted_origin_suffix = match std::env::var("PARKNET_TRUSTED_ORIGIN_SUFFIX") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(raw.trim().to_string()),
            Err(_) => Some(DEFAULT_TRUSTED_ORIGIN_SUFFIX.to_string()),
        };

        let rate_limit_window = Duration::from_secs(env_u64(
            "PARKNET_RATE_LIMIT_WINDOW_SECS",
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        ));
        let rate_limit_max = env_u32("PARKNET_RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX);

        let environment = match std::env::var("PARKNET_ENV") {
            Ok(raw) => parse_environment(&raw),
            Err(_) => Environment::Development,
        };

        Ok(Self {
            mongodb_url,
            allowed_origins,
            trusted_origin_suffix,
            rate_limit_window,
            rate_limit_max,
            environment,
        })
    }
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
}

/// Split a comma-separated origin list, dropping blank entries.
fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_environment(raw: &str) -> Environment {
    match raw.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "development" | "dev" => Environment::Development,
        other => {
            warn!(
                env_var = "PARKNET_ENV",
                value = %other,
                "Unknown deployment mode, assuming development"
            );
            Environment::Development
        }
    }
}

fn env_u64(name: &'static str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!(
                    env_var = name,
                    value = %raw,
                    default,
                    "Invalid value for environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u32(name: &'static str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!(
                    env_var = name,
                    value = %raw,
                    default,
                    "Invalid value for environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}
