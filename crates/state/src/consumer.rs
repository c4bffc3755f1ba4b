//! Single-use redemption of access codes.

use std::sync::Arc;

use chrono::Utc;
use finditnow_storage::{CodeMutation, CodeTable, CodeTableError};
use finditnow_types::{CodeState, SetCondition, config::ValidationConfig, validation};
use snafu::ResultExt;

use crate::error::{AccessError, InvalidInputAccessSnafu};

/// Marks access codes as used once signup completes.
///
/// The live check and the write happen in one conditional update, so among
/// any number of concurrent calls for the same code exactly one succeeds.
#[derive(Clone)]
pub struct AccessCodeConsumer {
    table: Arc<dyn CodeTable>,
    limits: ValidationConfig,
}

impl AccessCodeConsumer {
    /// Create a consumer over a code table.
    pub fn new(table: Arc<dyn CodeTable>, limits: ValidationConfig) -> Self {
        Self { table, limits }
    }

    /// Spends `code`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the code was never issued
    /// - [`AccessError::Conflict`] if it was already spent, including by a
    ///   concurrent caller that won the race
    /// - [`AccessError::Store`] if the code table failed
    ///
    /// None of these is retryable except a store failure.
    #[tracing::instrument(skip(self))]
    pub fn consume(&self, code: &str) -> Result<(), AccessError> {
        let code =
            validation::normalize_code(code, &self.limits).context(InvalidInputAccessSnafu)?;
        let outcome = self.table.update_if(
            code,
            SetCondition::StateEquals(CodeState::Live),
            CodeMutation::Spend { at: Utc::now() },
        );

        match outcome {
            Ok(record) => {
                tracing::info!(code, used_at = ?record.used_at, "Access code spent");
                Ok(())
            },
            Err(CodeTableError::PreconditionFailed { current: None, .. }) => {
                tracing::debug!(code, "Consume rejected: code not issued");
                Err(AccessError::NotFound { code: code.to_string() })
            },
            Err(CodeTableError::PreconditionFailed { current: Some(_), .. }) => {
                tracing::warn!(code, "Consume rejected: code already spent");
                Err(AccessError::Conflict { code: code.to_string() })
            },
            Err(source) => {
                tracing::error!(code, error = %source, "Code store failed during consume");
                Err(AccessError::Store { source })
            },
        }
    }
}
