//! Read-only access code verification.

use std::sync::Arc;

use finditnow_storage::CodeTable;
use finditnow_types::{AccessCode, Verdict, config::ValidationConfig, validation};
use snafu::ResultExt;

use crate::error::{AccessError, InvalidInputAccessSnafu, StoreAccessSnafu};

/// Key read by [`AccessCodeVerifier::check_store`]; never a valid code.
const HEALTH_CHECK_KEY: &str = "health check";

/// Checks whether a code may be used to start signup.
///
/// A [`Verdict::Valid`] result reserves nothing. Only
/// [`AccessCodeConsumer::consume`](crate::AccessCodeConsumer::consume)
/// decides who redeems a code.
#[derive(Clone)]
pub struct AccessCodeVerifier {
    table: Arc<dyn CodeTable>,
    limits: ValidationConfig,
}

impl AccessCodeVerifier {
    /// Create a verifier over a code table.
    pub fn new(table: Arc<dyn CodeTable>, limits: ValidationConfig) -> Self {
        Self { table, limits }
    }

    /// Reports whether `code` is valid, never issued, or already used.
    ///
    /// Blank input fails with `MissingInput` before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidInput`] for malformed codes and
    /// [`AccessError::Store`] when the code table cannot be read.
    #[tracing::instrument(skip(self))]
    pub fn verify(&self, code: &str) -> Result<Verdict, AccessError> {
        let code =
            validation::normalize_code(code, &self.limits).context(InvalidInputAccessSnafu)?;
        let record = self
            .table
            .get(code)
            .inspect_err(|e| {
                tracing::error!(code, error = %e, "Code store failed during verify");
            })
            .context(StoreAccessSnafu)?;
        let verdict = Verdict::from_state(record.as_ref().map(AccessCode::state));
        tracing::debug!(?verdict, "Access code verified");
        Ok(verdict)
    }

    /// Confirms the code table answers reads.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Store`] if the read fails.
    pub fn check_store(&self) -> Result<(), AccessError> {
        self.table
            .get(HEALTH_CHECK_KEY)
            .inspect_err(|e| {
                tracing::warn!(error = %e, "Code table health check failed");
            })
            .context(StoreAccessSnafu)?;
        Ok(())
    }
}
