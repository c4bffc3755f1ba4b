//! Access code table with conditional writes.
//!
//! Every mutation evaluates its [`SetCondition`] against the current record
//! inside the same redb write transaction that applies it. redb admits one
//! writer at a time, so the check and the write are indivisible and two
//! concurrent spends of one code cannot both observe it live.

use chrono::{DateTime, Utc};
use finditnow_types::{
    AccessCode, Classify, CodeState, ErrorKind, SetCondition,
    codec::{self, CodecError},
};
use redb::ReadableTable;
use snafu::{Location, ResultExt, Snafu};

use crate::{engine::StorageEngine, tables::Tables};

/// Code table error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CodeTableError {
    #[snafu(display("Storage error at {location}: {source}"))]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Table error at {location}: {source}"))]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Transaction error at {location}: {source}"))]
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Commit error at {location}: {source}"))]
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Corrupt record for code {code}: {source}"))]
    Codec { code: String, source: CodecError },

    #[snafu(display("Precondition {condition:?} failed for code {code} (current: {current:?})"))]
    PreconditionFailed { code: String, condition: SetCondition, current: Option<CodeState> },

    #[snafu(display("Code store unavailable: {message}"))]
    Unavailable { message: String },
}

impl Classify for CodeTableError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionFailed { current: None, .. } => ErrorKind::NotFound,
            Self::PreconditionFailed { current: Some(_), .. } => ErrorKind::Conflict,
            Self::Codec { .. } => ErrorKind::Internal,
            Self::Storage { .. }
            | Self::Table { .. }
            | Self::Transaction { .. }
            | Self::Commit { .. }
            | Self::Unavailable { .. } => ErrorKind::StoreUnavailable,
        }
    }
}

/// Result type for code table operations.
pub type Result<T> = std::result::Result<T, CodeTableError>;

/// A write applied to a code's record once its condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeMutation {
    /// Store a freshly issued record. Fails if the key already exists.
    Issue(AccessCode),
    /// Mark the existing record spent at the given instant.
    Spend { at: DateTime<Utc> },
}

/// Key-value table of access codes supporting conditional updates.
///
/// Implementations must evaluate `condition` and apply `mutation` atomically
/// with respect to every other call on the same table.
pub trait CodeTable: Send + Sync {
    /// Reads a code's current record.
    fn get(&self, code: &str) -> Result<Option<AccessCode>>;

    /// Applies `mutation` if `condition` holds for the current record.
    ///
    /// Returns the record as written.
    ///
    /// # Errors
    ///
    /// Returns [`CodeTableError::PreconditionFailed`] carrying the state that
    /// was observed when the condition does not hold. Nothing is written.
    fn update_if(
        &self,
        code: &str,
        condition: SetCondition,
        mutation: CodeMutation,
    ) -> Result<AccessCode>;
}

/// Code table stored in a redb database.
#[derive(Debug, Clone)]
pub struct RedbCodeTable {
    engine: StorageEngine,
}

impl RedbCodeTable {
    /// Create a code table over an opened engine.
    pub fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }

    fn decode_record(code: &str, bytes: &[u8]) -> Result<AccessCode> {
        codec::decode(bytes).context(CodecSnafu { code })
    }
}

impl CodeTable for RedbCodeTable {
    fn get(&self, code: &str) -> Result<Option<AccessCode>> {
        let db = self.engine.db();
        let txn = db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::ACCESS_CODES).context(TableSnafu)?;
        match table.get(code).context(StorageSnafu)? {
            Some(value) => Ok(Some(Self::decode_record(code, value.value())?)),
            None => Ok(None),
        }
    }

    fn update_if(
        &self,
        code: &str,
        condition: SetCondition,
        mutation: CodeMutation,
    ) -> Result<AccessCode> {
        let db = self.engine.db();
        let txn = db.begin_write().context(TransactionSnafu)?;

        let record = {
            let mut table = txn.open_table(Tables::ACCESS_CODES).context(TableSnafu)?;

            // Extract the current record and drop the borrow before mutation
            let current = match table.get(code).context(StorageSnafu)? {
                Some(value) => Some(Self::decode_record(code, value.value())?),
                None => None,
            };
            let current_state = current.as_ref().map(AccessCode::state);

            if !condition.holds(current_state) {
                // Dropping the transaction aborts it
                return PreconditionFailedSnafu { code, condition, current: current_state }.fail();
            }

            // An issue never overwrites, whatever the condition admitted
            let record = match (mutation, current) {
                (CodeMutation::Issue(record), None) => record,
                (CodeMutation::Issue(_), Some(_)) => {
                    return PreconditionFailedSnafu { code, condition, current: current_state }
                        .fail();
                },
                (CodeMutation::Spend { at }, Some(existing)) => existing.spent(at),
                (CodeMutation::Spend { .. }, None) => {
                    return PreconditionFailedSnafu { code, condition, current: None }.fail();
                },
            };

            let encoded = codec::encode(&record).context(CodecSnafu { code })?;
            table.insert(code, &encoded[..]).context(StorageSnafu)?;
            record
        };

        txn.commit().context(CommitSnafu)?;
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use std::sync::{
        Arc, Barrier,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn table() -> RedbCodeTable {
        RedbCodeTable::new(StorageEngine::in_memory().expect("engine"))
    }

    fn issue(table: &RedbCodeTable, code: &str) {
        table
            .update_if(
                code,
                SetCondition::MustNotExist,
                CodeMutation::Issue(AccessCode::issue(code, ts(100))),
            )
            .expect("issue");
    }

    fn spend(table: &RedbCodeTable, code: &str) -> Result<AccessCode> {
        table.update_if(
            code,
            SetCondition::StateEquals(CodeState::Live),
            CodeMutation::Spend { at: ts(200) },
        )
    }

    #[test]
    fn test_get_missing_code() {
        assert!(table().get("ABC123").unwrap().is_none());
    }

    #[test]
    fn test_issue_then_get() {
        let table = table();
        issue(&table, "XYZ789");
        let record = table.get("XYZ789").unwrap().expect("present");
        assert_eq!(record.state(), CodeState::Live);
        assert_eq!(record.issued_at, ts(100));
    }

    #[test]
    fn test_reissue_fails_and_keeps_record() {
        let table = table();
        issue(&table, "XYZ789");
        spend(&table, "XYZ789").unwrap();

        let err = table
            .update_if(
                "XYZ789",
                SetCondition::MustNotExist,
                CodeMutation::Issue(AccessCode::issue("XYZ789", ts(300))),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CodeTableError::PreconditionFailed { current: Some(CodeState::Spent), .. }
        ));
        assert_eq!(table.get("XYZ789").unwrap().unwrap().state(), CodeState::Spent);
    }

    #[test]
    fn test_issue_never_overwrites_spent_record() {
        let table = table();
        issue(&table, "XYZ789");
        spend(&table, "XYZ789").unwrap();

        // The condition admits the current state, but an issue needs an empty key
        let err = table
            .update_if(
                "XYZ789",
                SetCondition::StateEquals(CodeState::Spent),
                CodeMutation::Issue(AccessCode::issue("XYZ789", ts(300))),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CodeTableError::PreconditionFailed { current: Some(CodeState::Spent), .. }
        ));
        let record = table.get("XYZ789").unwrap().unwrap();
        assert_eq!(record.state(), CodeState::Spent);
        assert_eq!(record.used_at, Some(ts(200)));
    }

    #[test]
    fn test_spend_sets_used_at() {
        let table = table();
        issue(&table, "XYZ789");
        let record = spend(&table, "XYZ789").unwrap();
        assert!(record.is_used);
        assert_eq!(record.used_at, Some(ts(200)));
        assert_eq!(table.get("XYZ789").unwrap().unwrap(), record);
    }

    #[test]
    fn test_spend_missing_code_is_not_found() {
        let err = spend(&table(), "ABC123").unwrap_err();
        assert!(matches!(err, CodeTableError::PreconditionFailed { current: None, .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn test_second_spend_is_conflict() {
        let table = table();
        issue(&table, "XYZ789");
        spend(&table, "XYZ789").unwrap();

        let err = spend(&table, "XYZ789").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(table.get("XYZ789").unwrap().unwrap().used_at, Some(ts(200)));
    }

    #[test]
    fn test_concurrent_spends_exactly_one_wins() {
        const THREADS: usize = 16;
        let table = Arc::new(table());
        issue(&table, "XYZ789");

        let barrier = Arc::new(Barrier::new(THREADS));
        let wins = Arc::new(AtomicUsize::new(0));
        let conflicts = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let table = Arc::clone(&table);
                let barrier = Arc::clone(&barrier);
                let wins = Arc::clone(&wins);
                let conflicts = Arc::clone(&conflicts);
                std::thread::spawn(move || {
                    barrier.wait();
                    match spend(&table, "XYZ789") {
                        Ok(_) => wins.fetch_add(1, Ordering::SeqCst),
                        Err(e) => {
                            assert_eq!(e.kind(), ErrorKind::Conflict);
                            conflicts.fetch_add(1, Ordering::SeqCst)
                        },
                    };
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(conflicts.load(Ordering::SeqCst), THREADS - 1);
    }

    #[test]
    fn test_corrupt_record_is_internal() {
        let engine = StorageEngine::in_memory().unwrap();
        {
            let db = engine.db();
            let txn = db.begin_write().unwrap();
            {
                let mut t = txn.open_table(Tables::ACCESS_CODES).unwrap();
                t.insert("BROKEN", &[0xffu8, 0xff, 0xff][..]).unwrap();
            }
            txn.commit().unwrap();
        }
        let table = RedbCodeTable::new(engine);
        let err = table.get("BROKEN").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
