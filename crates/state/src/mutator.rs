//! Catalog uploads and deletions.

use bytes::Bytes;
use finditnow_storage::{CatalogStore, CatalogStoreError};
use finditnow_types::{
    Deletion, UploadRequest,
    config::{CatalogConfig, ValidationConfig},
    validation,
};
use snafu::ResultExt;

use crate::error::{CatalogError, InvalidInputSnafu, StoreSnafu};

/// Adds and removes catalog entries.
///
/// Mutations never return a listing. Callers re-list afterwards to converge
/// their view with the store.
#[derive(Debug, Clone)]
pub struct CatalogMutator {
    store: CatalogStore,
    catalog: CatalogConfig,
    limits: ValidationConfig,
}

impl CatalogMutator {
    /// Create a mutator enforcing the given upload rules.
    pub fn new(store: CatalogStore, catalog: CatalogConfig, limits: ValidationConfig) -> Self {
        Self { store, catalog, limits }
    }

    /// Uploads a new entry and returns its final name.
    ///
    /// Every check below runs before the store is written, in this order:
    ///
    /// 1. content is non-empty (`MissingInput`)
    /// 2. the resolved name is non-empty (`MissingInput`) and well-formed (`Invalid`)
    /// 3. the extension is allowed (`InvalidExtension`)
    /// 4. a declared media type matches the extension (`InvalidExtension`)
    /// 5. the payload fits `max_upload_bytes` (`Invalid`)
    /// 6. the name is absent from `observed`, the caller's last listing (`NameConflict`)
    ///
    /// The write itself is create-if-absent, so a name taken after `observed`
    /// was captured is still rejected with `NameConflict` and the existing
    /// entry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] classified as described above, or
    /// [`CatalogError::Store`] if the store fails.
    #[tracing::instrument(
        skip(self, request, observed),
        fields(name = %request.name, bytes = request.content.len(), observed = observed.len())
    )]
    pub async fn upload(
        &self,
        request: UploadRequest,
        observed: &[String],
    ) -> Result<String, CatalogError> {
        validation::require_content(&request.content).context(InvalidInputSnafu)?;

        let name = validation::resolve_item_name(&request.name, request.original_name.as_deref());
        validation::validate_item_name(&name, &self.limits).context(InvalidInputSnafu)?;
        let extension =
            validation::validate_extension(&name, &self.catalog).context(InvalidInputSnafu)?;
        if let Some(media_type) = request.media_type.as_deref() {
            validation::validate_media_type(media_type, extension).context(InvalidInputSnafu)?;
        }
        validation::validate_upload_size(request.content.len(), &self.catalog)
            .context(InvalidInputSnafu)?;

        if observed.iter().any(|existing| *existing == name) {
            tracing::debug!(name = %name, "Upload rejected: name in observed listing");
            return Err(CatalogError::NameConflict { name });
        }

        match self.store.put_if_absent(&name, Bytes::from(request.content)).await {
            Ok(()) => {
                tracing::info!(name = %name, "Catalog entry created");
                Ok(name)
            },
            Err(CatalogStoreError::AlreadyExists { .. }) => {
                tracing::warn!(name = %name, "Upload rejected: name taken since last listing");
                Err(CatalogError::NameConflict { name })
            },
            Err(source) => {
                tracing::error!(name = %name, error = %source, "Catalog store failed during upload");
                Err(CatalogError::Store { source })
            },
        }
    }

    /// Removes an entry by name.
    ///
    /// Deleting a name that does not exist is not an error; it yields
    /// [`Deletion::Absent`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidInput`] for a blank or malformed name
    /// and [`CatalogError::Store`] if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<Deletion, CatalogError> {
        validation::validate_item_name(name, &self.limits).context(InvalidInputSnafu)?;
        let deletion = self
            .store
            .delete(name)
            .await
            .inspect_err(|e| {
                tracing::error!(name, error = %e, "Catalog store failed during delete");
            })
            .context(StoreSnafu)?;
        match deletion {
            Deletion::Removed => tracing::info!(name, "Catalog entry deleted"),
            Deletion::Absent => tracing::debug!(name, "Delete of absent catalog entry"),
        }
        Ok(deletion)
    }
}
