//! FindItNow server library.
//!
//! Provides the HTTP binding, configuration loading, store bootstrap, and
//! shutdown handling used by the `finditnow-server` binary.

#![deny(unsafe_code)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod shutdown;

pub use api::{AppState, router};
pub use bootstrap::{BootstrapError, bootstrap};
