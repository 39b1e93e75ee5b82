//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CART_HOST` - Bind address (default: 127.0.0.1)
//! - `CART_PORT` - Listen port (default: 3000)
//! - `CART_MAILBOX_CAPACITY` - Queued commands per cart (default: 64, min 1)
//! - `CART_MAX_LIVE_SESSIONS` - Registered cart limit (default: 100000, min 1)
//! - `CART_COMMAND_TIMEOUT_MS` - Caller wait limit in milliseconds (default: unbounded)
//! - `CART_ATTACH_ATTEMPTS` - Create-or-attach attempts per command (default: 3, min 1)
//! - `CART_ATTACH_BACKOFF_MS` - Base delay between attempts (default: 25)
//! - `CART_EVICT_INTERVAL_MS` - Period between checked-out cart sweeps (default: 30000, min 1)
//! - `CART_SECURE_COOKIES` - Mark the session cookie `Secure` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cart::{
    CartSettings, DEFAULT_ATTACH_ATTEMPTS, DEFAULT_EVICT_INTERVAL, DEFAULT_MAILBOX_CAPACITY,
    DEFAULT_MAX_LIVE_SESSIONS,
};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Whether the session cookie requires HTTPS
    pub secure_cookies: bool,
    /// Cart engine tuning
    pub cart: CartSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            secure_cookies: false,
            cart: CartSettings::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_or("CART_HOST", lookup("CART_HOST"), IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or("CART_PORT", lookup("CART_PORT"), 3000_u16)?;
        let secure_cookies = parse_or("CART_SECURE_COOKIES", lookup("CART_SECURE_COOKIES"), false)?;

        let cart = CartSettings {
            mailbox_capacity: at_least_one(
                "CART_MAILBOX_CAPACITY",
                parse_or(
                    "CART_MAILBOX_CAPACITY",
                    lookup("CART_MAILBOX_CAPACITY"),
                    DEFAULT_MAILBOX_CAPACITY,
                )?,
            )?,
            max_live_sessions: at_least_one(
                "CART_MAX_LIVE_SESSIONS",
                parse_or(
                    "CART_MAX_LIVE_SESSIONS",
                    lookup("CART_MAX_LIVE_SESSIONS"),
                    DEFAULT_MAX_LIVE_SESSIONS,
                )?,
            )?,
            command_timeout: lookup("CART_COMMAND_TIMEOUT_MS")
                .map(|raw| parse_value::<u64>("CART_COMMAND_TIMEOUT_MS", &raw))
                .transpose()?
                .map(Duration::from_millis),
            attach_attempts: at_least_one(
                "CART_ATTACH_ATTEMPTS",
                parse_or(
                    "CART_ATTACH_ATTEMPTS",
                    lookup("CART_ATTACH_ATTEMPTS"),
                    DEFAULT_ATTACH_ATTEMPTS,
                )?,
            )?,
            attach_backoff: Duration::from_millis(parse_or(
                "CART_ATTACH_BACKOFF_MS",
                lookup("CART_ATTACH_BACKOFF_MS"),
                25_u64,
            )?),
            evict_interval: Duration::from_millis(at_least_one(
                "CART_EVICT_INTERVAL_MS",
                parse_or(
                    "CART_EVICT_INTERVAL_MS",
                    lookup("CART_EVICT_INTERVAL_MS"),
                    DEFAULT_EVICT_INTERVAL.as_secs() * 1_000,
                )?,
            )?),
        };

        Ok(Self {
            host,
            port,
            secure_cookies,
            cart,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a raw variable value.
fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a variable if present, otherwise use `default`.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |raw| parse_value(key, &raw))
}

/// Reject zero for counts that must be positive.
fn at_least_one<T>(key: &str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + From<u8>,
{
    if value == T::from(0) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}
