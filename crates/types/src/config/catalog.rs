//! Catalog upload and listing limits.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest page a single list call may request.
const MAX_LIST_PAGE_SIZE: usize = 10_000;

/// Catalog behavior configuration.
///
/// # Validation Rules
///
/// - `allowed_extensions` must be non-empty; each entry lowercase ASCII
///   alphanumeric without a leading dot
/// - `list_page_size` must be 1-10000
/// - `max_upload_bytes` must be > 0
///
/// # Example
///
/// ```no_run
/// # use finditnow_types::config::CatalogConfig;
/// let config = CatalogConfig::builder()
///     .allowed_extensions(vec!["jpg".to_string(), "png".to_string()])
///     .list_page_size(500)
///     .build()
///     .expect("valid catalog config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogConfig {
    /// File extensions accepted on upload, compared case-insensitively.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Names fetched per store round-trip while listing.
    ///
    /// The lister keeps fetching until a short page, so this bounds memory
    /// per request, not the size of the returned listing.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
    /// Maximum accepted image size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_list_page_size() -> usize {
    1000 // S3 ListObjectsV2 maximum
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[bon::bon]
impl CatalogConfig {
    /// Creates a new catalog configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value violates the rules
    /// listed on [`CatalogConfig`].
    #[builder]
    pub fn new(
        #[builder(default = default_allowed_extensions())] allowed_extensions: Vec<String>,
        #[builder(default = default_list_page_size())] list_page_size: usize,
        #[builder(default = default_max_upload_bytes())] max_upload_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { allowed_extensions, list_page_size, max_upload_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl CatalogConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Validation {
                message: "allowed_extensions must not be empty".to_string(),
            });
        }
        for ext in &self.allowed_extensions {
            let well_formed = !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
            if !well_formed {
                return Err(ConfigError::Validation {
                    message: format!(
                        "allowed_extensions entries must be lowercase alphanumeric without a dot, got '{}'",
                        ext
                    ),
                });
            }
        }
        if self.list_page_size == 0 || self.list_page_size > MAX_LIST_PAGE_SIZE {
            return Err(ConfigError::Validation {
                message: format!(
                    "list_page_size must be 1-{}, got {}",
                    MAX_LIST_PAGE_SIZE, self.list_page_size
                ),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "max_upload_bytes must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Whether `extension` is on the allow-list, ignoring ASCII case.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            list_page_size: default_list_page_size(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
