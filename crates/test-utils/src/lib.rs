//! Shared test utilities for FindItNow crates.
//!
//! - [`TestDir`] - Managed temporary data directory with path helpers
//! - [`UnavailableCodeTable`] and [`unreachable_catalog`] - stores that fail
//!   every call, for `StoreUnavailable` paths
//! - [`seeded_code_table`] - in-memory code table with fixture records
//! - [`strategies`] - proptest generators for codes, names, and uploads

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod doubles;
pub mod strategies;
mod test_dir;

pub use doubles::{UnavailableCodeTable, fixture_time, seeded_code_table, unreachable_catalog};
pub use test_dir::TestDir;
