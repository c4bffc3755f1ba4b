//! Out-of-band provisioning of new access codes.

use std::sync::Arc;

use chrono::Utc;
use finditnow_storage::{CodeMutation, CodeTable, CodeTableError};
use finditnow_types::{AccessCode, SetCondition, config::ValidationConfig, validation};
use snafu::ResultExt;

use crate::error::{AccessError, InvalidInputAccessSnafu};

/// Inserts new live codes.
///
/// Issuing never overwrites: an existing code, live or spent, is rejected,
/// so a spent code can never be made live again.
#[derive(Clone)]
pub struct AccessCodeIssuer {
    table: Arc<dyn CodeTable>,
    limits: ValidationConfig,
}

impl AccessCodeIssuer {
    /// Create an issuer over a code table.
    pub fn new(table: Arc<dyn CodeTable>, limits: ValidationConfig) -> Self {
        Self { table, limits }
    }

    /// Issues `code` as a new live record and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::AlreadyIssued`] if the code exists.
    #[tracing::instrument(skip(self))]
    pub fn issue(&self, code: &str) -> Result<AccessCode, AccessError> {
        let code =
            validation::normalize_code(code, &self.limits).context(InvalidInputAccessSnafu)?;
        let record = AccessCode::issue(code, Utc::now());

        match self.table.update_if(code, SetCondition::MustNotExist, CodeMutation::Issue(record)) {
            Ok(record) => {
                tracing::info!(code, "Access code issued");
                Ok(record)
            },
            Err(CodeTableError::PreconditionFailed { .. }) => {
                Err(AccessError::AlreadyIssued { code: code.to_string() })
            },
            Err(source) => Err(AccessError::Store { source }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use finditnow_test_utils::seeded_code_table;
    use finditnow_types::{Classify, CodeState, ErrorKind};

    use super::*;

    #[test]
    fn test_issue_creates_live_code() {
        let table: Arc<dyn CodeTable> = seeded_code_table(&[]);
        let issuer = AccessCodeIssuer::new(Arc::clone(&table), ValidationConfig::default());

        let record = issuer.issue(" SPRING-24 ").unwrap();
        assert_eq!(record.code, "SPRING-24");
        assert_eq!(table.get("SPRING-24").unwrap().unwrap().state(), CodeState::Live);
    }

    #[test]
    fn test_issue_never_revives_spent_code() {
        let table: Arc<dyn CodeTable> = seeded_code_table(&[("XYZ789", true)]);
        let issuer = AccessCodeIssuer::new(Arc::clone(&table), ValidationConfig::default());

        let err = issuer.issue("XYZ789").unwrap_err();
        assert!(matches!(err, AccessError::AlreadyIssued { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(table.get("XYZ789").unwrap().unwrap().state(), CodeState::Spent);
    }
}
