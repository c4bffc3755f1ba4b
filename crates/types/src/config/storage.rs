//! Storage configuration for the code table and the catalog object store.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// File name of the redb code table inside the data directory.
pub const CODE_TABLE_FILE: &str = "access_codes.redb";

/// Directory name of the local catalog inside the data directory.
pub const CATALOG_DIR: &str = "found-items";

/// URL schemes accepted for `catalog_url`.
const SUPPORTED_SCHEMES: [&str; 3] = ["memory", "file", "s3"];

/// Storage layer configuration.
///
/// # Resolution
///
/// - `data_dir` unset: ephemeral mode. The code table is in memory and the
///   catalog defaults to `memory://`.
/// - `data_dir` set: the code table lives at `<data_dir>/access_codes.redb`
///   and the catalog defaults to `file://<data_dir>/found-items`. A relative
///   `data_dir` is resolved against the working directory.
/// - `catalog_url` set: overrides the catalog location in either mode, e.g.
///   `s3://found-items` for the production bucket.
///
/// # Validation Rules
///
/// - `catalog_url`, if set, must use one of `memory://`, `file://`, `s3://`
/// - `data_dir`, if set, must not be empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Directory for persistent data. `None` runs fully in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Object store URL for catalog images.
    #[serde(default)]
    pub catalog_url: Option<String>,
}

#[bon::bon]
impl StorageConfig {
    /// Creates a new storage configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `catalog_url` has an
    /// unsupported scheme or `data_dir` is empty.
    #[builder]
    pub fn new(
        #[builder(into)] data_dir: Option<PathBuf>,
        #[builder(into)] catalog_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self { data_dir, catalog_url };
        config.validate()?;
        Ok(config)
    }
}

impl StorageConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.data_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation {
                message: "data_dir must not be empty when set".to_string(),
            });
        }
        if let Some(url) = &self.catalog_url {
            let scheme = url.split_once("://").map(|(scheme, _)| scheme);
            match scheme {
                Some(s) if SUPPORTED_SCHEMES.contains(&s) => {},
                _ => {
                    return Err(ConfigError::Validation {
                        message: format!(
                            "catalog_url must start with one of memory://, file://, s3://, got '{}'",
                            url
                        ),
                    });
                },
            }
        }
        Ok(())
    }

    /// Whether all state is lost when the process exits.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// Path of the code table file, or `None` in ephemeral mode.
    #[must_use]
    pub fn code_table_path(&self) -> Option<PathBuf> {
        self.data_dir.as_deref().map(|dir| dir.join(CODE_TABLE_FILE))
    }

    /// Effective catalog URL after applying the defaults described above.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `data_dir` cannot be made
    /// absolute.
    pub fn resolved_catalog_url(&self) -> Result<String, ConfigError> {
        match (&self.catalog_url, &self.data_dir) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(dir)) => local_catalog_url(dir),
            (None, None) => Ok("memory://".to_string()),
        }
    }
}

/// `file://` URL of the catalog directory, with reserved characters such as
/// `#` and spaces percent-encoded.
fn local_catalog_url(dir: &Path) -> Result<String, ConfigError> {
    let catalog_dir = std::path::absolute(dir.join(CATALOG_DIR)).map_err(|e| {
        ConfigError::Validation {
            message: format!("cannot resolve data_dir '{}': {}", dir.display(), e),
        }
    })?;
    Url::from_directory_path(&catalog_dir).map(String::from).map_err(|()| {
        ConfigError::Validation {
            message: format!("data_dir '{}' is not a valid local path", dir.display()),
        }
    })
}
