//! Input size limits applied at the request boundary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Input validation limits.
///
/// # Validation Rules
///
/// - `max_code_bytes` must be >= 1
/// - `max_name_bytes` must be 1-1024 (object store key limit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationConfig {
    /// Maximum access code length in bytes. Default: 64.
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
    /// Maximum catalog entry name length in bytes. Default: 255.
    #[serde(default = "default_max_name_bytes")]
    pub max_name_bytes: usize,
}

fn default_max_code_bytes() -> usize {
    64
}

fn default_max_name_bytes() -> usize {
    255
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_code_bytes: default_max_code_bytes(), max_name_bytes: default_max_name_bytes() }
    }
}

#[bon::bon]
impl ValidationConfig {
    /// Creates a new validation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is out of range.
    #[builder]
    pub fn new(
        #[builder(default = default_max_code_bytes())] max_code_bytes: usize,
        #[builder(default = default_max_name_bytes())] max_name_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_code_bytes, max_name_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl ValidationConfig {
    /// Validates the configured limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_code_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "max_code_bytes must be >= 1".to_string(),
            });
        }
        if self.max_name_bytes == 0 || self.max_name_bytes > 1024 {
            return Err(ConfigError::Validation {
                message: format!("max_name_bytes must be 1-1024, got {}", self.max_name_bytes),
            });
        }
        Ok(())
    }
}
