//! Storage layer for FindItNow.
//!
//! This crate provides:
//! - The access code table, redb-backed, with conditional writes
//! - The catalog store, backed by any `object_store` implementation
//!
//! Both stores are shared behind `Arc`s and are internally synchronized.

mod catalog;
mod codes;
mod engine;
mod tables;

pub use catalog::{CatalogStore, CatalogStoreError};
pub use codes::{CodeMutation, CodeTable, CodeTableError, RedbCodeTable};
pub use engine::{EngineError, StorageEngine};
pub use tables::Tables;
