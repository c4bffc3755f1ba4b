//! Core type definitions for FindItNow.
//!
//! - Access code records and their lifecycle state
//! - Verification verdicts
//! - Conditional write predicates
//! - Catalog upload and stored-object shapes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Access Codes
// ============================================================================

/// Lifecycle state of an issued access code.
///
/// An unissued code has no record at all, so it has no `CodeState`. The only
/// permitted transition is `Live -> Spent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeState {
    /// Issued and not yet redeemed.
    Live,
    /// Redeemed by a completed signup. Terminal.
    Spent,
}

impl CodeState {
    /// Whether a transition from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: CodeState) -> bool {
        matches!((self, next), (CodeState::Live, CodeState::Spent))
    }
}

impl fmt::Display for CodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeState::Live => f.write_str("live"),
            CodeState::Spent => f.write_str("spent"),
        }
    }
}

/// Persisted access code record.
///
/// Keyed by `code` in the code table. `is_used` flips from `false` to `true`
/// exactly once, and `used_at` is set in the same write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCode {
    /// Opaque unique code string, the primary key.
    pub code: String,
    /// Whether the code has been redeemed.
    pub is_used: bool,
    /// When the code was provisioned.
    pub issued_at: DateTime<Utc>,
    /// When the code was redeemed, if it has been.
    pub used_at: Option<DateTime<Utc>>,
}

impl AccessCode {
    /// Creates a new live code record.
    pub fn issue(code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self { code: code.into(), is_used: false, issued_at, used_at: None }
    }

    /// Returns the lifecycle state derived from `is_used`.
    #[must_use]
    pub fn state(&self) -> CodeState {
        if self.is_used { CodeState::Spent } else { CodeState::Live }
    }

    /// Returns this record in the spent state.
    #[must_use]
    pub fn spent(mut self, used_at: DateTime<Utc>) -> Self {
        self.is_used = true;
        self.used_at = Some(used_at);
        self
    }
}

/// Outcome of a read-only access code check.
///
/// `Valid` is a point-in-time observation. It reserves nothing: a concurrent
/// consumer may spend the code before the caller gets to consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The code exists and is live.
    Valid,
    /// The code was never issued.
    Invalid,
    /// The code exists but has been spent.
    AlreadyUsed,
}

impl Verdict {
    /// Derives the verdict for an optional stored state.
    #[must_use]
    pub fn from_state(state: Option<CodeState>) -> Self {
        match state {
            None => Verdict::Invalid,
            Some(CodeState::Live) => Verdict::Valid,
            Some(CodeState::Spent) => Verdict::AlreadyUsed,
        }
    }

    /// Whether signup may proceed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Conditional write predicates for compare-and-swap on the code table.
///
/// The predicate is evaluated against the current record inside the same
/// write transaction that applies the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetCondition {
    /// Key must not exist.
    MustNotExist,
    /// Key must exist and be in the given state.
    StateEquals(CodeState),
}

impl SetCondition {
    /// Evaluates the predicate against the current state of a key.
    #[must_use]
    pub fn holds(self, current: Option<CodeState>) -> bool {
        match self {
            SetCondition::MustNotExist => current.is_none(),
            SetCondition::StateEquals(expected) => current == Some(expected),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A request to add a found item to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Desired entry name. When it has no extension, the extension of
    /// `original_name` is appended.
    pub name: String,
    /// Name of the file as supplied by the client, if known.
    pub original_name: Option<String>,
    /// Image bytes.
    pub content: Vec<u8>,
    /// Declared media type, e.g. `image/jpeg`.
    pub media_type: Option<String>,
}

impl UploadRequest {
    /// Creates an upload request for an already-final name.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            original_name: None,
            content: content.into(),
            media_type: Some(media_type.into()),
        }
    }

    /// Sets the client's original file name, used for extension inference.
    #[must_use]
    pub fn with_original_name(mut self, original_name: impl Into<String>) -> Self {
        self.original_name = Some(original_name.into());
        self
    }
}

/// A catalog entry read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Unique entry name, also the public locator.
    pub name: String,
    /// Image bytes.
    pub content: Vec<u8>,
    /// Media type derived from the name's extension.
    pub media_type: String,
}

/// Result of a catalog delete.
///
/// Absence is reported, not raised: deleting a name that is already gone
/// leaves the catalog in the requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deletion {
    /// The entry existed and was removed.
    Removed,
    /// The store reported no entry under that name.
    Absent,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_code_state_only_moves_forward() {
        assert!(CodeState::Live.can_transition_to(CodeState::Spent));
        assert!(!CodeState::Spent.can_transition_to(CodeState::Live));
        assert!(!CodeState::Live.can_transition_to(CodeState::Live));
        assert!(!CodeState::Spent.can_transition_to(CodeState::Spent));
    }

    #[test]
    fn test_issue_then_spend() {
        let code = AccessCode::issue("XYZ789", ts(100));
        assert_eq!(code.state(), CodeState::Live);
        assert!(code.used_at.is_none());

        let spent = code.spent(ts(200));
        assert_eq!(spent.state(), CodeState::Spent);
        assert_eq!(spent.used_at, Some(ts(200)));
        assert_eq!(spent.issued_at, ts(100));
    }

    #[test]
    fn test_verdict_from_state() {
        assert_eq!(Verdict::from_state(None), Verdict::Invalid);
        assert_eq!(Verdict::from_state(Some(CodeState::Live)), Verdict::Valid);
        assert_eq!(Verdict::from_state(Some(CodeState::Spent)), Verdict::AlreadyUsed);
        assert!(Verdict::Valid.is_valid());
        assert!(!Verdict::AlreadyUsed.is_valid());
    }

    #[test]
    fn test_set_condition_predicates() {
        assert!(SetCondition::MustNotExist.holds(None));
        assert!(!SetCondition::MustNotExist.holds(Some(CodeState::Live)));
        assert!(!SetCondition::MustNotExist.holds(Some(CodeState::Spent)));

        let live = SetCondition::StateEquals(CodeState::Live);
        assert!(live.holds(Some(CodeState::Live)));
        assert!(!live.holds(Some(CodeState::Spent)));
        assert!(!live.holds(None));
    }

    #[test]
    fn test_verdict_serializes_snake_case() {
        let json = serde_json::to_string(&Verdict::AlreadyUsed).unwrap();
        assert_eq!(json, "\"already_used\"");
    }
}
