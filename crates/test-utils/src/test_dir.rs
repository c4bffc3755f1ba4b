//! Temporary directory management for tests.
//!
//! [`TestDir`] wraps [`tempfile::TempDir`] and knows where the service keeps
//! its code table and catalog inside a data directory.

// Test utilities are expected to panic on failure - that's their purpose
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use finditnow_types::config::{CATALOG_DIR, CODE_TABLE_FILE};
use tempfile::TempDir;
use url::Url;

/// A managed temporary data directory for tests.
///
/// The directory is removed when this struct is dropped.
///
/// # Example
///
/// ```
/// use finditnow_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let table = dir.code_table_path();
/// assert!(table.starts_with(dir.path()));
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Create a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Join a relative path to the temporary directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Path the server uses for the code table under this data directory.
    #[must_use]
    pub fn code_table_path(&self) -> PathBuf {
        self.join(CODE_TABLE_FILE)
    }

    /// `file://` URL of the catalog directory under this data directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary path is not absolute.
    #[must_use]
    pub fn catalog_url(&self) -> String {
        Url::from_directory_path(self.join(CATALOG_DIR))
            .expect("temp directory path is absolute")
            .to_string()
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
