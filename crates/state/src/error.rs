//! Error types for the access code and catalog engines.
//!
//! Both enums keep the underlying store error as their source for logging,
//! and expose only an [`ErrorKind`] to callers.

use finditnow_storage::{CatalogStoreError, CodeTableError};
use finditnow_types::{Classify, ErrorKind, ValidationError};
use snafu::Snafu;

/// Failures of verify, consume, and issue.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(AccessSnafu)))]
pub enum AccessError {
    #[snafu(display("Invalid access code input: {source}"))]
    InvalidInput { source: ValidationError },

    #[snafu(display("Access code {code} does not exist"))]
    NotFound { code: String },

    #[snafu(display("Access code {code} has already been used"))]
    Conflict { code: String },

    #[snafu(display("Access code {code} has already been issued"))]
    AlreadyIssued { code: String },

    #[snafu(display("Code store failure: {source}"))]
    Store { source: CodeTableError },
}

impl Classify for AccessError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { source } => source.kind(),
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } | Self::AlreadyIssued { .. } => ErrorKind::Conflict,
            Self::Store { source } => source.kind(),
        }
    }
}

/// Failures of list, fetch, upload, and delete.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CatalogError {
    #[snafu(display("Invalid upload: {source}"))]
    InvalidInput { source: ValidationError },

    #[snafu(display("Catalog entry {name} already exists"))]
    NameConflict { name: String },

    #[snafu(display("Catalog entry {name} not found"))]
    NotFound { name: String },

    #[snafu(display("Catalog store failure: {source}"))]
    Store { source: CatalogStoreError },
}

impl Classify for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { source } => source.kind(),
            Self::NameConflict { .. } => ErrorKind::NameConflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Store { source } => source.kind(),
        }
    }
}
