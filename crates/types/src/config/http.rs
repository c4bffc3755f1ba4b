//! HTTP binding configuration.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// HTTP service configuration.
///
/// # Validation Rules
///
/// - `request_timeout` must be between 1s and 10m
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HttpConfig {
    /// Upper bound on handling a single request, store round-trips included.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub request_timeout: Duration,
    /// Send `Access-Control-Allow-Origin: *` on every response.
    #[serde(default = "default_permissive_cors")]
    pub permissive_cors: bool,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_permissive_cors() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            permissive_cors: default_permissive_cors(),
        }
    }
}

#[bon::bon]
impl HttpConfig {
    /// Creates a new HTTP configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `request_timeout` is out of range.
    #[builder]
    pub fn new(
        #[builder(default = default_request_timeout())] request_timeout: Duration,
        #[builder(default = default_permissive_cors())] permissive_cors: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self { request_timeout, permissive_cors };
        config.validate()?;
        Ok(config)
    }
}

impl HttpConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `request_timeout` is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout < Duration::from_secs(1)
            || self.request_timeout > Duration::from_secs(600)
        {
            return Err(ConfigError::Validation {
                message: format!(
                    "request_timeout must be between 1s and 10m, got {}",
                    humantime::format_duration(self.request_timeout)
                ),
            });
        }
        Ok(())
    }
}
