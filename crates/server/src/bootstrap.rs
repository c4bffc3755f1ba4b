//! Wires stores and engines together from a resolved configuration.

use std::sync::Arc;

use finditnow_state::{
    AccessCodeConsumer, AccessCodeIssuer, AccessCodeVerifier, CatalogLister, CatalogMutator,
};
use finditnow_storage::{CatalogStore, CodeTable, RedbCodeTable, StorageEngine};
use finditnow_types::config::{FindItNowConfig, StorageConfig};

use crate::api::AppState;

/// Error type for startup failures.
#[derive(Debug)]
pub enum BootstrapError {
    /// Failed to open the code table.
    CodeTable(String),
    /// Failed to open the catalog store.
    Catalog(String),
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::CodeTable(msg) => write!(f, "code table error: {}", msg),
            BootstrapError::Catalog(msg) => write!(f, "catalog error: {}", msg),
        }
    }
}

impl std::error::Error for BootstrapError {}

/// Opens the code table at `<data_dir>/access_codes.redb`, or in memory
/// when no data directory is configured.
pub fn open_code_table(storage: &StorageConfig) -> Result<Arc<dyn CodeTable>, BootstrapError> {
    let engine = match storage.code_table_path() {
        Some(path) => StorageEngine::open(&path).map_err(|e| {
            BootstrapError::CodeTable(format!("failed to open {}: {}", path.display(), e))
        })?,
        None => StorageEngine::in_memory()
            .map_err(|e| BootstrapError::CodeTable(format!("failed to create in-memory table: {}", e)))?,
    };
    tracing::debug!(location = engine.location(), "Code table opened");
    Ok(Arc::new(RedbCodeTable::new(engine)))
}

/// Opens the catalog object store named by the resolved catalog URL.
pub fn open_catalog(storage: &StorageConfig) -> Result<CatalogStore, BootstrapError> {
    let url = storage.resolved_catalog_url().map_err(|e| BootstrapError::Catalog(e.to_string()))?;
    let store = CatalogStore::from_url(&url).map_err(|e| BootstrapError::Catalog(e.to_string()))?;
    tracing::debug!(catalog_url = %url, "Catalog store opened");
    Ok(store)
}

/// Builds the request-handling state over freshly opened stores.
pub fn bootstrap(config: &FindItNowConfig) -> Result<AppState, BootstrapError> {
    let table = open_code_table(&config.storage)?;
    let catalog = open_catalog(&config.storage)?;
    Ok(AppState::new(table, catalog, config))
}

/// Issues a code through a short-lived handle on the configured code table.
///
/// The code table file is locked by a running server, so this is meant for
/// provisioning while the server is stopped.
pub fn issue_code(config: &FindItNowConfig, code: &str) -> Result<String, BootstrapError> {
    if config.storage.is_ephemeral() {
        return Err(BootstrapError::CodeTable(
            "issuing a code requires --data; an in-memory table is discarded on exit".to_string(),
        ));
    }
    let table = open_code_table(&config.storage)?;
    let issuer = AccessCodeIssuer::new(table, config.validation.clone());
    let record = issuer.issue(code).map_err(|e| BootstrapError::CodeTable(e.to_string()))?;
    Ok(record.code)
}

impl AppState {
    /// Creates the engines shared by every request.
    pub fn new(table: Arc<dyn CodeTable>, catalog: CatalogStore, config: &FindItNowConfig) -> Self {
        let limits = config.validation.clone();
        Self {
            verifier: AccessCodeVerifier::new(Arc::clone(&table), limits.clone()),
            consumer: AccessCodeConsumer::new(table, limits.clone()),
            lister: CatalogLister::new(
                catalog.clone(),
                config.catalog.list_page_size,
                limits.clone(),
            ),
            mutator: CatalogMutator::new(catalog, config.catalog.clone(), limits),
        }
    }
}
