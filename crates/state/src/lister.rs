//! Catalog enumeration and reads.

use finditnow_storage::CatalogStore;
use finditnow_types::{CatalogEntry, config::ValidationConfig, validation};
use snafu::ResultExt;

use crate::error::{CatalogError, InvalidInputSnafu, StoreSnafu};

/// Enumerates and reads catalog entries.
#[derive(Debug, Clone)]
pub struct CatalogLister {
    store: CatalogStore,
    page_size: usize,
    limits: ValidationConfig,
}

impl CatalogLister {
    /// Create a lister that fetches `page_size` names per store round-trip.
    pub fn new(store: CatalogStore, page_size: usize, limits: ValidationConfig) -> Self {
        Self { store, page_size: page_size.max(1), limits }
    }

    /// Returns every entry name in the catalog, in lexicographic order.
    ///
    /// Pages are requested until one comes back short, so the result is
    /// complete regardless of catalog size.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] if any page cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut names: Vec<String> = Vec::new();
        let mut pages = 0usize;
        loop {
            let after = names.last().map(String::as_str);
            let page = self
                .store
                .list_page(after, self.page_size)
                .await
                .inspect_err(|e| {
                    tracing::error!(pages, error = %e, "Catalog store failed during list");
                })
                .context(StoreSnafu)?;
            pages += 1;
            let complete = page.len() < self.page_size;
            names.extend(page);
            if complete {
                break;
            }
        }
        tracing::debug!(entries = names.len(), pages, "Catalog listed");
        Ok(names)
    }

    /// Confirms the catalog store answers a one-entry listing.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] if the listing fails.
    pub async fn check_store(&self) -> Result<(), CatalogError> {
        self.store
            .list_page(None, 1)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "Catalog health check failed");
            })
            .context(StoreSnafu)?;
        Ok(())
    }

    /// Reads one entry's bytes with the media type implied by its name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no entry has that name.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, name: &str) -> Result<CatalogEntry, CatalogError> {
        validation::validate_item_name(name, &self.limits).context(InvalidInputSnafu)?;
        let content = self
            .store
            .get(name)
            .await
            .inspect_err(|e| {
                tracing::error!(name, error = %e, "Catalog store failed during fetch");
            })
            .context(StoreSnafu)?
            .ok_or_else(|| CatalogError::NotFound { name: name.to_string() })?;

        Ok(CatalogEntry {
            name: name.to_string(),
            content: content.to_vec(),
            media_type: validation::media_type_for(name),
        })
    }
}
