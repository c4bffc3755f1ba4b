//! Store doubles for exercising infrastructure failure paths.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use finditnow_storage::{
    CatalogStore, CodeMutation, CodeTable, CodeTableError, RedbCodeTable, StorageEngine,
};
use finditnow_types::{AccessCode, SetCondition};
use object_store::{ClientOptions, RetryConfig, aws::AmazonS3Builder, path::Path as ObjectPath};

/// Code table whose every call fails as if the backing store were down.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCodeTable;

impl UnavailableCodeTable {
    fn error() -> CodeTableError {
        CodeTableError::Unavailable { message: "connection refused".to_string() }
    }
}

impl CodeTable for UnavailableCodeTable {
    fn get(&self, _code: &str) -> Result<Option<AccessCode>, CodeTableError> {
        Err(Self::error())
    }

    fn update_if(
        &self,
        _code: &str,
        _condition: SetCondition,
        _mutation: CodeMutation,
    ) -> Result<AccessCode, CodeTableError> {
        Err(Self::error())
    }
}

/// Catalog backed by an S3 endpoint nothing listens on.
///
/// Every call fails fast with a transport error: retries are disabled and
/// static credentials skip the instance metadata lookup.
///
/// # Panics
///
/// Panics if the S3 client cannot be configured.
#[allow(clippy::expect_used)]
#[must_use]
pub fn unreachable_catalog() -> CatalogStore {
    let store = AmazonS3Builder::new()
        .with_bucket_name("found-items")
        .with_region("us-east-1")
        .with_endpoint("http://127.0.0.1:1")
        .with_allow_http(true)
        .with_access_key_id("test")
        .with_secret_access_key("test")
        .with_retry(RetryConfig { max_retries: 0, ..RetryConfig::default() })
        .with_client_options(ClientOptions::new().with_connect_timeout(Duration::from_millis(200)))
        .build()
        .expect("static S3 configuration is valid");
    CatalogStore::new(Arc::new(store), ObjectPath::default(), true)
}

/// Fixed instant used for records created by fixtures.
#[must_use]
pub fn fixture_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}

/// In-memory code table pre-populated with `(code, is_used)` records.
///
/// # Panics
///
/// Panics if the in-memory engine cannot be opened or a code repeats.
#[allow(clippy::expect_used)]
#[must_use]
pub fn seeded_code_table(codes: &[(&str, bool)]) -> Arc<RedbCodeTable> {
    let table = RedbCodeTable::new(StorageEngine::in_memory().expect("in-memory engine"));
    for &(code, is_used) in codes {
        let mut record = AccessCode::issue(code, fixture_time());
        if is_used {
            record = record.spent(fixture_time());
        }
        table
            .update_if(code, SetCondition::MustNotExist, CodeMutation::Issue(record))
            .expect("seed code");
    }
    Arc::new(table)
}
