//! Configuration types for FindItNow.
//!
//! Configuration is loaded from a TOML file and then overridden by CLI flags
//! and environment variables in the server binary. All config structs
//! validate their values at construction time via fallible builders.
//! Post-deserialization validation is available via the `validate()` method
//! on each struct.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// expansions.
#![allow(clippy::disallowed_methods)]

mod catalog;
mod http;
mod storage;
mod validation;

pub use catalog::*;
pub use http::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
pub use storage::*;
pub use validation::*;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The configuration file could not be parsed.
    #[snafu(display("invalid config file: {source}"))]
    Parse {
        /// The underlying TOML error.
        source: toml::de::Error,
    },
}

/// Complete service configuration, the shape of the `--config` TOML file.
///
/// Every section is optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FindItNowConfig {
    /// Code table and catalog locations.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload and listing limits.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Input size limits.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// HTTP binding settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl FindItNowConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Validation`] for out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Validation`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.catalog.validate()?;
        self.validation.validate()?;
        self.http.validate()
    }

    /// Renders the defaults as an annotated TOML document.
    #[must_use]
    pub fn example_toml() -> String {
        let defaults = Self::default();
        let extensions = defaults
            .catalog
            .allowed_extensions
            .iter()
            .map(|ext| format!("\"{ext}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"# FindItNow configuration. CLI flags and FINDITNOW__* variables override these.

[storage]
# Omit data_dir to run entirely in memory.
# data_dir = "/var/lib/finditnow"
# catalog_url = "s3://found-items"

[catalog]
allowed_extensions = [{extensions}]
list_page_size = {page}
max_upload_bytes = {max_upload}

[validation]
max_code_bytes = {max_code}
max_name_bytes = {max_name}

[http]
request_timeout = "{timeout}"
permissive_cors = {cors}
"#,
            page = defaults.catalog.list_page_size,
            max_upload = defaults.catalog.max_upload_bytes,
            max_code = defaults.validation.max_code_bytes,
            max_name = defaults.validation.max_name_bytes,
            timeout = humantime::format_duration(defaults.http.request_timeout),
            cors = defaults.http.permissive_cors,
        )
    }
}

/// Duration serialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
