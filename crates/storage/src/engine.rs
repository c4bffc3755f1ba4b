//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management
//! - Table creation on open, so read transactions never see a missing table
//! - File-backed and in-memory constructors

use std::{path::Path, sync::Arc};

use redb::{Database, backends::InMemoryBackend};
use snafu::{ResultExt, Snafu};

use crate::tables::Tables;

/// Error context for engine lifecycle operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open { path: String, source: redb::DatabaseError },

    #[snafu(display("Failed to create parent directory for {path}: {source}"))]
    CreateDir { path: String, source: std::io::Error },

    #[snafu(display("Failed to initialize tables in {path}: {source}"))]
    Init { path: String, source: redb::Error },
}

/// Storage engine backed by redb.
///
/// Cloning is cheap; all clones share the same database handle.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<Database>,
    location: Arc<str>,
}

#[allow(clippy::result_large_err)]
impl StorageEngine {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu { path: display.clone() })?;
        }
        let db = Database::create(path).context(OpenSnafu { path: display.clone() })?;
        Self::initialize(db, display)
    }

    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, EngineError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context(OpenSnafu { path: ":memory:" })?;
        Self::initialize(db, ":memory:".to_string())
    }

    fn initialize(db: Database, location: String) -> Result<Self, EngineError> {
        let create = || -> Result<(), redb::Error> {
            let txn = db.begin_write()?;
            txn.open_table(Tables::ACCESS_CODES)?;
            txn.commit()?;
            Ok(())
        };
        create().context(InitSnafu { path: location.clone() })?;

        tracing::debug!(location = %location, "Code table opened");
        Ok(Self { db: Arc::new(db), location: location.into() })
    }

    /// Get a clone of the database handle.
    pub fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    /// Where the database lives, `:memory:` for in-memory engines.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine").field("location", &self.location).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use redb::ReadableTable;

    use super::*;

    #[test]
    fn test_open_in_memory_creates_tables() {
        let engine = StorageEngine::in_memory().expect("should open");
        let db = engine.db();
        let read = db.begin_read().expect("should begin read");
        let table = read.open_table(Tables::ACCESS_CODES).expect("table exists");
        assert!(table.get("missing").expect("get").is_none());
        assert_eq!(engine.location(), ":memory:");
    }

    #[test]
    fn test_file_engine_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("codes.redb");

        {
            let engine = StorageEngine::open(&path).expect("open");
            let db = engine.db();
            let txn = db.begin_write().expect("begin write");
            {
                let mut table = txn.open_table(Tables::ACCESS_CODES).expect("table");
                table.insert("XYZ789", &b"record"[..]).expect("insert");
            }
            txn.commit().expect("commit");
        }

        let engine = StorageEngine::open(&path).expect("reopen");
        let db = engine.db();
        let read = db.begin_read().expect("begin read");
        let table = read.open_table(Tables::ACCESS_CODES).expect("table");
        let value = table.get("XYZ789").expect("get").expect("present");
        assert_eq!(value.value(), b"record");
    }
}
