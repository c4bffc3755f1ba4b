//! Error classification shared by every FindItNow layer.
//!
//! Each crate defines its own snafu error enum for the failures it can
//! produce. All of them map onto a single [`ErrorKind`], the stable external
//! classification that callers see:
//!
//! | Kind               | Class          | Retryable | HTTP |
//! |--------------------|----------------|-----------|------|
//! | `MissingInput`     | caller error   | No        | 400  |
//! | `Invalid`          | business rule  | No        | 400  |
//! | `InvalidExtension` | business rule  | No        | 400  |
//! | `NameConflict`     | business rule  | No        | 409  |
//! | `InvalidCode`      | business rule  | No        | 404  |
//! | `AlreadyUsed`      | state          | No        | 400  |
//! | `Conflict`         | state          | No        | 409  |
//! | `NotFound`         | state          | No        | 404  |
//! | `StoreUnavailable` | infrastructure | Yes       | 503  |
//! | `Internal`         | invariant      | No        | 500  |
//!
//! Raw store error details never leave the process through an [`ErrorKind`];
//! they are logged where the failure is classified.

use core::fmt;

/// Stable classification of every failure the core can report.
///
/// The HTTP status is a binding, not the contract: callers branch on the
/// kind, and [`ErrorKind::is_retryable`] tells them whether a blind retry
/// can ever help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field was absent or empty.
    MissingInput,
    /// Input was present but malformed or out of range.
    Invalid,
    /// Catalog upload with an extension outside the allow-list, or a media
    /// type inconsistent with the extension.
    InvalidExtension,
    /// Catalog upload whose name is already taken.
    NameConflict,
    /// Access code that was never issued.
    InvalidCode,
    /// Access code that has already been spent, observed by verification.
    AlreadyUsed,
    /// Conditional update lost: the record was spent by an earlier or
    /// concurrent consumer.
    Conflict,
    /// The addressed record does not exist.
    NotFound,
    /// The backing store could not be reached or failed mid-operation.
    StoreUnavailable,
    /// Unexpected state, such as a record that cannot be decoded.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable identifier, used as the `status` field of
    /// HTTP error bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::Invalid => "invalid",
            Self::InvalidExtension => "invalid_extension",
            Self::NameConflict => "name_conflict",
            Self::InvalidCode => "invalid_code",
            Self::AlreadyUsed => "already_used",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::StoreUnavailable => "store_unavailable",
            Self::Internal => "internal",
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    ///
    /// Only infrastructure failures qualify. A lost conditional update is
    /// never retryable: it means the code is exhausted or never existed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// HTTP status code for this kind.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::MissingInput | Self::Invalid | Self::InvalidExtension | Self::AlreadyUsed => 400,
            Self::InvalidCode | Self::NotFound => 404,
            Self::NameConflict | Self::Conflict => 409,
            Self::StoreUnavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Human-readable message that is safe to show to end users.
    #[must_use]
    pub const fn public_message(self) -> &'static str {
        match self {
            Self::MissingInput => "A required field is missing",
            Self::Invalid => "The request is invalid",
            Self::InvalidExtension => {
                "Invalid file extension. Please upload a .jpg, .jpeg, or .png file"
            },
            Self::NameConflict => "Filename already exists. Please choose a unique name",
            Self::InvalidCode => "Invalid code",
            Self::AlreadyUsed => "Code has already been used",
            Self::Conflict => "Code can no longer be redeemed; signup cannot be finalized",
            Self::NotFound => "Not found",
            Self::StoreUnavailable => "Service temporarily unavailable, please retry",
            Self::Internal => "Internal server error",
        }
    }

    /// Suggested recovery action, aimed at client developers and operators.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::MissingInput => "Supply the missing field and resubmit.",
            Self::Invalid => "Fix the request parameters and resubmit.",
            Self::InvalidExtension => "Rename the file with an allowed image extension.",
            Self::NameConflict => "Choose another name, or re-list the catalog and retry.",
            Self::InvalidCode => "Check the code for typos. Verification has no side effects.",
            Self::AlreadyUsed | Self::Conflict => {
                "Obtain a new access code. Spent codes never become valid again."
            },
            Self::NotFound => "Re-list to refresh the view; the record no longer exists.",
            Self::StoreUnavailable => "Retry with exponential backoff.",
            Self::Internal => "Collect the server logs and report the failure.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error type that crosses a crate boundary.
pub trait Classify {
    /// The stable classification of this error.
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 10] = [
        ErrorKind::MissingInput,
        ErrorKind::Invalid,
        ErrorKind::InvalidExtension,
        ErrorKind::NameConflict,
        ErrorKind::InvalidCode,
        ErrorKind::AlreadyUsed,
        ErrorKind::Conflict,
        ErrorKind::NotFound,
        ErrorKind::StoreUnavailable,
        ErrorKind::Internal,
    ];

    #[test]
    fn test_only_store_failures_are_retryable() {
        let retryable: Vec<_> = ALL.iter().filter(|k| k.is_retryable()).collect();
        assert_eq!(retryable, vec![&ErrorKind::StoreUnavailable]);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut names: Vec<_> = ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_http_binding() {
        assert_eq!(ErrorKind::MissingInput.http_status(), 400);
        assert_eq!(ErrorKind::InvalidCode.http_status(), 404);
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
        assert_eq!(ErrorKind::NameConflict.http_status(), 409);
        assert_eq!(ErrorKind::StoreUnavailable.http_status(), 503);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn test_state_rejections_and_store_failures_are_distinct() {
        assert_ne!(ErrorKind::Conflict.http_status(), ErrorKind::StoreUnavailable.http_status());
        assert_ne!(ErrorKind::NotFound.http_status(), ErrorKind::StoreUnavailable.http_status());
    }

    #[test]
    fn test_display_matches_identifier() {
        for kind in ALL {
            assert_eq!(kind.to_string(), kind.as_str());
            assert!(!kind.public_message().is_empty());
            assert!(!kind.suggested_action().is_empty());
        }
    }
}
