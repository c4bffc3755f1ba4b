//! Access code lifecycle and catalog consistency for FindItNow.
//!
//! This crate sits between the stores (`finditnow-storage`) and the HTTP
//! binding (`finditnow-server`), providing:
//!
//! - [`AccessCodeVerifier`] - read-only, advisory validity checks
//! - [`AccessCodeConsumer`] - atomic single-use redemption
//! - [`AccessCodeIssuer`] - out-of-band provisioning
//! - [`CatalogLister`] - complete, paged enumeration and reads
//! - [`CatalogMutator`] - collision-checked uploads and deletions
//!
//! Every component is cheap to clone and holds no mutable state of its own
//! beyond shared store handles.

#![deny(unsafe_code)]

mod consumer;
mod error;
mod issuer;
mod lister;
mod mutator;
mod verifier;

pub use consumer::AccessCodeConsumer;
pub use error::{AccessError, CatalogError};
pub use issuer::AccessCodeIssuer;
pub use lister::CatalogLister;
pub use mutator::CatalogMutator;
pub use verifier::AccessCodeVerifier;
