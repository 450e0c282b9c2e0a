//! SQLite record store for strata virtual file storage.
//!
//! Files, directory markers and key/value properties live in two flat
//! tables keyed by lower-cased path. Folders are never stored as such: they
//! are synthesized from the parent paths of the records below them (see
//! [`strata_storage::folder`]).
//!
//! # Architecture
//! - [`Database`] owns the connection pool and runs the embedded migrations.
//! - `files` and `properties` are the record and property stores; every
//!   function runs on the session (connection or transaction) it is given.
//! - [`DatabaseStorage`] implements [`FileStorage`] on top of them, one
//!   session per operation.
//! - [`connect`] wires everything up from configuration and hands back the
//!   validating, path-filtered façade.

mod db;
pub mod error;
mod files;
mod models;
mod predicate;
mod properties;
mod storage;

pub use crate::db::Database;
pub use crate::storage::DatabaseStorage;
use exn::ResultExt;
use std::sync::Arc;
use strata_config::Config;
use strata_storage::error::{ErrorKind as StorageErrorKind, Result};
use strata_storage::{BackendHandle, FileStorage, ScopedStorage};

/// Open the configured database and return the storage façade callers use.
///
/// Migrations are applied before this returns. The backend is wrapped in a
/// [`ScopedStorage`] restricted to the configured access prefixes and page
/// sizes.
pub async fn connect(config: &Config) -> Result<BackendHandle> {
    let db = Database::connect_with(&config.database).await.or_raise(|| StorageErrorKind::Storage)?;
    let backend: BackendHandle = Arc::new(DatabaseStorage::new(db));
    tracing::debug!(backend = backend.name(), path = %config.database.path.display(), "Connected to database");
    let scoped = ScopedStorage::new(backend, config.access.path_filters())
        .with_page_sizes(config.listing.default_page_size, config.listing.max_page_size);
    Ok(Arc::new(scoped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_storage::{ListOptions, Paging, UpsertFileCommand};

    fn in_memory() -> Config {
        let mut config = Config::default();
        config.database.path = ":memory:".into();
        config
    }

    #[tokio::test]
    async fn test_connect_applies_access_filters() {
        let mut config = in_memory();
        config.access.allowed_prefixes = vec!["/team1/".to_string()];
        let storage = connect(&config).await.unwrap();
        storage.upsert(&UpsertFileCommand::new("team1/report").with_contents(b"ok".to_vec())).await.unwrap();
        let err = storage.upsert(&UpsertFileCommand::new("team2/secret")).await.unwrap_err();
        assert!(matches!(&*err, StorageErrorKind::PermissionDenied(_)));
        assert!(storage.get("team2/secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_applies_page_sizes() {
        let mut config = in_memory();
        config.listing.default_page_size = 2;
        config.listing.max_page_size = 3;
        let storage = connect(&config).await.unwrap();
        for path in ["/a", "/b", "/c", "/d", "/e"] {
            storage.upsert(&UpsertFileCommand::new(path)).await.unwrap();
        }
        let page = storage.list_files("/", &Paging::first(0), &ListOptions::default()).await.unwrap();
        assert_eq!(page.files.len(), 2);
        let page = storage.list_files("/", &Paging::first(50), &ListOptions::default()).await.unwrap();
        assert_eq!(page.files.len(), 3);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_scoped_validation_reaches_database() {
        let storage = connect(&in_memory()).await.unwrap();
        storage.upsert(&UpsertFileCommand::new("docs//./guide.md").with_contents(b"#".to_vec())).await.unwrap();
        let file = storage.read("/DOCS/guide.md").await.unwrap();
        assert_eq!(file.full_path, "/docs/guide.md");
        let err = storage.get("/docs/../../etc/passwd").await.unwrap_err();
        assert!(matches!(&*err, StorageErrorKind::InvalidPath(_)));
        let err = storage.get("/docs/__directory_marker__").await.unwrap_err();
        assert!(matches!(&*err, StorageErrorKind::InvalidPath(_)));
    }
}
