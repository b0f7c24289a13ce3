//! Server configuration from environment variables.
//!
//! DESIGN
//! ======
//! `USE_MOCK=true` runs the in-process responder; otherwise `API_HOST` +
//! `MY_API_KEY` select the reverse-proxy mode and both are required at
//! startup. Session eviction knobs are tunable for tests and long-lived
//! dev servers.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;

/// Errors raised while assembling the startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_HOST is not set in environment variables and USE_MOCK is false")]
    MissingApiHost,
    #[error("MY_API_KEY is not set in environment variables and USE_MOCK is false")]
    MissingApiKey,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Serve turns from the in-process rule-based responder.
    pub use_mock: bool,
    /// Upstream workflow API base URL, e.g. `https://api.example.com`.
    pub api_host: Option<String>,
    /// Bearer key presented to the upstream on every forwarded request.
    pub api_key: Option<String>,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when proxy mode is selected but the upstream host
    /// or key is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source (test seam).
    ///
    /// # Errors
    ///
    /// Same contract as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let use_mock = lookup_bool(&lookup, "USE_MOCK").unwrap_or(false);
        let api_host = lookup("API_HOST").filter(|v| !v.is_empty());
        let api_key = lookup("MY_API_KEY").filter(|v| !v.is_empty());

        if !use_mock {
            if api_host.is_none() {
                return Err(ConfigError::MissingApiHost);
            }
            if api_key.is_none() {
                return Err(ConfigError::MissingApiKey);
            }
        }

        Ok(Self {
            port: lookup_parse(&lookup, "PORT", DEFAULT_PORT),
            use_mock,
            api_host,
            api_key,
            session_ttl: Duration::from_secs(lookup_parse(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)),
            sweep_interval: Duration::from_secs(lookup_parse(
                &lookup,
                "SESSION_SWEEP_SECS",
                DEFAULT_SESSION_SWEEP_SECS,
            )),
        })
    }
}

fn lookup_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key).and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

fn lookup_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    lookup(key).and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
