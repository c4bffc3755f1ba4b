//! Catalog object store.
//!
//! Entries are objects named `<prefix>/<name>` in an `object_store` backend
//! selected by URL:
//! - `memory://` - in-process, for tests and ephemeral runs
//! - `file:///path/to/dir` - local filesystem
//! - `s3://bucket/prefix` - Amazon S3 or a compatible service
//!
//! Uploads use [`PutMode::Create`], so name uniqueness is enforced by the
//! backend rather than by any snapshot the caller holds.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use finditnow_types::{Classify, Deletion, ErrorKind};
use futures::{StreamExt, TryStreamExt, future};
use object_store::{
    ObjectStore, PutMode, PutPayload, local::LocalFileSystem, memory::InMemory,
    path::{Path as ObjectPath, PathPart},
};
use snafu::{Location, ResultExt, Snafu};
use url::Url;

/// Catalog store error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogStoreError {
    #[snafu(display("Catalog entry {name} already exists"))]
    AlreadyExists { name: String },

    #[snafu(display("Object store {operation} failed at {location}: {source}"))]
    Backend {
        operation: &'static str,
        source: object_store::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Catalog entry name {name:?} would be stored as {encoded:?}"))]
    UnsupportedName { name: String, encoded: String },

    #[snafu(display("Invalid catalog URL '{url}': {message}"))]
    Configuration { url: String, message: String },
}

impl Classify for CatalogStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::NameConflict,
            Self::Backend { .. } => ErrorKind::StoreUnavailable,
            Self::UnsupportedName { .. } => ErrorKind::Invalid,
            Self::Configuration { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type for catalog store operations.
pub type Result<T> = std::result::Result<T, CatalogStoreError>;

/// Durable collection of catalog images addressed by name.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct CatalogStore {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    /// Whether the backend lists keys in lexicographic order. The local
    /// filesystem walks directories in arbitrary order.
    ordered_listing: bool,
}

impl CatalogStore {
    /// Wrap an existing backend.
    ///
    /// `ordered_listing` must only be `true` when the backend returns keys in
    /// lexicographic order, as S3 and the in-memory store do.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: ObjectPath, ordered_listing: bool) -> Self {
        Self { store, prefix, ordered_listing }
    }

    /// Create an empty in-memory catalog.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), ObjectPath::default(), true)
    }

    /// Create a catalog from a URL.
    ///
    /// # Environment Variables
    ///
    /// S3 (also works with MinIO and other compatible services):
    /// - `AWS_ACCESS_KEY_ID` - Access key
    /// - `AWS_SECRET_ACCESS_KEY` - Secret key
    /// - `AWS_REGION` - Region (default: us-east-1)
    /// - `AWS_ENDPOINT` - Custom endpoint for S3-compatible services
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| CatalogStoreError::Configuration {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match parsed.scheme() {
            "memory" => Ok(Self::in_memory()),
            "file" => Self::create_local_store(&parsed),
            "s3" => Self::create_s3_store(&parsed),
            scheme => ConfigurationSnafu {
                url,
                message: format!("unsupported scheme '{}'; supported: memory, file, s3", scheme),
            }
            .fail(),
        }
    }

    fn create_s3_store(url: &Url) -> Result<Self> {
        let bucket = url.host_str().ok_or_else(|| CatalogStoreError::Configuration {
            url: url.to_string(),
            message: "S3 URL must include bucket name as host".to_string(),
        })?;
        let prefix = url.path().trim_start_matches('/').trim_end_matches('/');

        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()));
        if let Ok(key_id) = std::env::var("AWS_ACCESS_KEY_ID") {
            builder = builder.with_access_key_id(key_id);
        }
        if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            builder = builder.with_secret_access_key(secret);
        }
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT") {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(true);
        }

        let store = builder.build().map_err(|e| CatalogStoreError::Configuration {
            url: url.to_string(),
            message: format!("failed to create S3 store: {}", e),
        })?;

        Ok(Self::new(Arc::new(store), ObjectPath::from(prefix), true))
    }

    fn create_local_store(url: &Url) -> Result<Self> {
        let path = url.to_file_path().map_err(|()| CatalogStoreError::Configuration {
            url: url.to_string(),
            message: "file URL must be an absolute local path".to_string(),
        })?;

        std::fs::create_dir_all(&path).map_err(|e| CatalogStoreError::Configuration {
            url: url.to_string(),
            message: format!("failed to create directory '{}': {}", path.display(), e),
        })?;

        let store = LocalFileSystem::new_with_prefix(&path).map_err(|e| {
            CatalogStoreError::Configuration {
                url: url.to_string(),
                message: format!("failed to create local file store: {}", e),
            }
        })?;

        Ok(Self::new(Arc::new(store), ObjectPath::default(), false))
    }

    fn object_path(&self, name: &str) -> ObjectPath {
        self.prefix.child(name)
    }

    fn list_prefix(&self) -> Option<&ObjectPath> {
        if self.prefix.as_ref().is_empty() { None } else { Some(&self.prefix) }
    }

    /// Writes `content` under `name` only if no entry with that name exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogStoreError::AlreadyExists`] if the name is taken, in
    /// which case the existing entry is untouched, and
    /// [`CatalogStoreError::UnsupportedName`] if the backend would
    /// percent-encode the name, since it would then list under another name.
    pub async fn put_if_absent(&self, name: &str, content: Bytes) -> Result<()> {
        let encoded = PathPart::from(name);
        if encoded.as_ref() != name {
            return UnsupportedNameSnafu { name, encoded: encoded.as_ref() }.fail();
        }
        let path = self.object_path(name);
        match self.store.put_opts(&path, PutPayload::from(content), PutMode::Create.into()).await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. })
            | Err(object_store::Error::Precondition { .. }) => AlreadyExistsSnafu { name }.fail(),
            Err(source) => Err(source).context(BackendSnafu { operation: "put" }),
        }
    }

    /// Reads an entry's bytes, or `None` if it does not exist.
    pub async fn get(&self, name: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(name);
        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(source) => return Err(source).context(BackendSnafu { operation: "get" }),
        };
        let bytes = result.bytes().await.context(BackendSnafu { operation: "get" })?;
        Ok(Some(bytes))
    }

    /// Removes an entry by name.
    ///
    /// S3 acknowledges deletes of missing keys, so existence is checked with
    /// a `head` first. A concurrent delete between the two calls is still
    /// reported as [`Deletion::Removed`].
    pub async fn delete(&self, name: &str) -> Result<Deletion> {
        let path = self.object_path(name);
        match self.store.head(&path).await {
            Ok(_) => {},
            Err(object_store::Error::NotFound { .. }) => return Ok(Deletion::Absent),
            Err(source) => return Err(source).context(BackendSnafu { operation: "head" }),
        }
        match self.store.delete(&path).await {
            Ok(()) => Ok(Deletion::Removed),
            Err(object_store::Error::NotFound { .. }) => Ok(Deletion::Absent),
            Err(source) => Err(source).context(BackendSnafu { operation: "delete" }),
        }
    }

    /// Lists at most `limit` entry names sorting strictly after `after`, in
    /// lexicographic order.
    ///
    /// A page shorter than `limit` means the listing is complete.
    pub async fn list_page(&self, after: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let stream = match after {
            Some(name) => self.store.list_with_offset(self.list_prefix(), &self.object_path(name)),
            None => self.store.list(self.list_prefix()),
        };

        // Only direct children of the prefix are catalog entries
        let depth = self.prefix.parts().count() + 1;
        let names = stream.try_filter_map(move |meta| {
            let name = (meta.location.parts().count() == depth)
                .then(|| meta.location.filename().map(str::to_owned))
                .flatten();
            future::ready(Ok(name))
        });

        let page: Vec<String> = if self.ordered_listing {
            names
                .take(limit)
                .try_collect::<Vec<String>>()
                .await
                .context(BackendSnafu { operation: "list" })?
        } else {
            let mut all = names
                .try_collect::<Vec<String>>()
                .await
                .context(BackendSnafu { operation: "list" })?;
            all.sort_unstable();
            all.truncate(limit);
            all
        };
        Ok(page)
    }
}

impl fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogStore")
            .field("store", &self.store.to_string())
            .field("prefix", &self.prefix.as_ref())
            .field("ordered_listing", &self.ordered_listing)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    async fn names(store: &CatalogStore) -> Vec<String> {
        store.list_page(None, 100).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_then_list_and_get() {
        let store = CatalogStore::in_memory();
        store.put_if_absent("lostcat.jpg", Bytes::from_static(b"cat")).await.unwrap();

        assert_eq!(names(&store).await, vec!["lostcat.jpg"]);
        assert_eq!(store.get("lostcat.jpg").await.unwrap(), Some(Bytes::from_static(b"cat")));
        assert_eq!(store.get("missing.jpg").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_existing_name_keeps_original() {
        let store = CatalogStore::in_memory();
        store.put_if_absent("scarf.png", Bytes::from_static(b"first")).await.unwrap();

        let err =
            store.put_if_absent("scarf.png", Bytes::from_static(b"second")).await.unwrap_err();
        assert!(matches!(err, CatalogStoreError::AlreadyExists { .. }));
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(store.get("scarf.png").await.unwrap(), Some(Bytes::from_static(b"first")));
    }

    #[tokio::test]
    async fn test_delete_reports_absence() {
        let store = CatalogStore::in_memory();
        store.put_if_absent("keys.jpg", Bytes::from_static(b"k")).await.unwrap();

        assert_eq!(store.delete("keys.jpg").await.unwrap(), Deletion::Removed);
        assert_eq!(store.delete("keys.jpg").await.unwrap(), Deletion::Absent);
        assert!(names(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_continue_after_offset() {
        let store = CatalogStore::in_memory();
        for name in ["e.jpg", "a.jpg", "c.jpg", "b.jpg", "d.jpg"] {
            store.put_if_absent(name, Bytes::from_static(b"x")).await.unwrap();
        }

        assert_eq!(store.list_page(None, 2).await.unwrap(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(store.list_page(Some("b.jpg"), 2).await.unwrap(), vec!["c.jpg", "d.jpg"]);
        assert_eq!(store.list_page(Some("d.jpg"), 2).await.unwrap(), vec!["e.jpg"]);
    }

    #[tokio::test]
    async fn test_local_store_orders_pages() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_directory_path(dir.path().join("found-items")).unwrap();
        let store = CatalogStore::from_url(url.as_str()).unwrap();
        for name in ["c.png", "a.png", "b.png"] {
            store.put_if_absent(name, Bytes::from_static(b"x")).await.unwrap();
        }

        assert_eq!(store.list_page(None, 2).await.unwrap(), vec!["a.png", "b.png"]);
        assert_eq!(store.list_page(Some("b.png"), 2).await.unwrap(), vec!["c.png"]);

        let err = store.put_if_absent("a.png", Bytes::from_static(b"y")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(store.delete("a.png").await.unwrap(), Deletion::Removed);
        assert_eq!(store.delete("a.png").await.unwrap(), Deletion::Absent);
    }

    #[tokio::test]
    async fn test_encoded_names_are_refused() {
        let store = CatalogStore::in_memory();
        for name in ["lost*cat.jpg", "what?.png", "a#b.jpg"] {
            let err = store.put_if_absent(name, Bytes::from_static(b"x")).await.unwrap_err();
            assert!(matches!(err, CatalogStoreError::UnsupportedName { .. }), "name {name:?}");
            assert_eq!(err.kind(), ErrorKind::Invalid);
        }
        assert!(names(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_punctuated_names_list_verbatim() {
        let name = "Sam's bag (blue)! v2_final-1.jpg";
        let memory = CatalogStore::in_memory();
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_directory_path(dir.path().join("found-items")).unwrap();
        let local = CatalogStore::from_url(url.as_str()).unwrap();

        for store in [memory, local] {
            store.put_if_absent(name, Bytes::from_static(b"x")).await.unwrap();
            assert_eq!(names(&store).await, vec![name]);
            assert_eq!(store.get(name).await.unwrap(), Some(Bytes::from_static(b"x")));
            assert_eq!(store.delete(name).await.unwrap(), Deletion::Removed);
        }
    }

    #[tokio::test]
    async fn test_prefixed_store_ignores_nested_keys() {
        let backend: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        backend
            .put(&ObjectPath::from("found-items/deep/nested.jpg"), PutPayload::from_static(b"n"))
            .await
            .unwrap();
        backend
            .put(&ObjectPath::from("other/outside.jpg"), PutPayload::from_static(b"o"))
            .await
            .unwrap();
        let store = CatalogStore::new(backend, ObjectPath::from("found-items"), true);
        store.put_if_absent("wallet.jpg", Bytes::from_static(b"w")).await.unwrap();

        assert_eq!(names(&store).await, vec!["wallet.jpg"]);
    }

    #[test]
    fn test_from_url_rejects_unknown_scheme() {
        let err = CatalogStore::from_url("ftp://found-items").unwrap_err();
        assert!(matches!(err, CatalogStoreError::Configuration { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_url_memory() {
        let store = CatalogStore::from_url("memory://").unwrap();
        assert!(format!("{store:?}").contains("ordered_listing: true"));
    }
}
