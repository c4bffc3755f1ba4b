//! Core types, error classification, and configuration for FindItNow.
//!
//! This crate provides the foundational types used throughout the service:
//! - Access code records, lifecycle states, and verification verdicts
//! - Catalog upload requests and stored entries
//! - The [`ErrorKind`] classification every layer maps its failures onto
//! - Boundary validation for codes, names, extensions, and media types
//! - Configuration structs with validating builders

pub mod codec;
pub mod config;
pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use codec::{CodecError, decode, encode};
pub use error::{Classify, ErrorKind};
pub use types::*;
pub use validation::ValidationError;
