//! Configuration for the Quay client.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the registry base URL.
pub const ENV_URL: &str = "QUAY_URL";
/// Environment variable holding the API bearer token.
pub const ENV_TOKEN: &str = "QUAY_TOKEN";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "QUAY_TIMEOUT_SECS";

/// Configuration for the `QuayClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the registry, e.g. `https://quay.example.com`.
    pub url: Url,

    /// OAuth application token. An empty token sends no Authorization header.
    #[serde(default)]
    pub token: String,

    /// Timeout for each request.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the given registry URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            token: String::new(),
            timeout: default_timeout(),
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `QUAY_URL` is unset or not a valid URL, or if
    /// `QUAY_TIMEOUT_SECS` is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(ENV_URL)
            .ok_or_else(|| Error::config_error(format!("{ENV_URL} is not set")))?
            .parse::<Url>()?;

        let mut config = Self::new(url);

        if let Some(token) = lookup(ENV_TOKEN) {
            config.token = token;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                Error::config_error(format!("{ENV_TIMEOUT_SECS} must be whole seconds: {e}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Load configuration from a TOML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::config_error(format!("Failed to parse config: {e}")))
        }
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
