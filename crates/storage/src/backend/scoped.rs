//! Validating, path-filtered storage decorator.
//!
//! Wraps another backend, normalizes and validates every argument, and
//! restricts every operation to the paths allowed by the caller's
//! [`PathFilters`]. Hidden paths behave exactly like missing ones.

use crate::backend::FileStorage;
use crate::error::{ErrorKind, Result};
use crate::file::{File, Folder};
use crate::filter::PathFilters;
use crate::models::{
    DEFAULT_PAGE_SIZE, DeleteFolderOptions, ListFilesResponse, ListOptions, MAX_PAGE_SIZE, Paging, UpsertFileCommand,
};
use crate::{BackendHandle, path};
use async_trait::async_trait;
use tracing::instrument;

/// Path-filtered storage backend.
///
/// Reads and deletes of paths outside the filters are answered as if the
/// path did not exist (`None`, no-op), listings never include them, and
/// writes to them fail with [`PermissionDenied`](ErrorKind::PermissionDenied)
/// whether or not something is stored there.
#[derive(Clone)]
pub struct ScopedStorage {
    inner: BackendHandle,
    filters: PathFilters,
    default_page_size: usize,
    max_page_size: usize,
}
impl ScopedStorage {
    pub fn new(inner: BackendHandle, filters: PathFilters) -> Self {
        Self {
            inner,
            filters,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    /// Unrestricted access (validation only).
    pub fn unrestricted(inner: BackendHandle) -> Self {
        Self::new(inner, PathFilters::default())
    }

    /// Page size used for requests asking for zero items, and the upper bound
    /// larger requests are clamped to.
    pub fn with_page_sizes(mut self, default: usize, max: usize) -> Self {
        self.max_page_size = max.max(1);
        self.default_page_size = default.clamp(1, self.max_page_size);
        self
    }

    pub fn filters(&self) -> &PathFilters {
        &self.filters
    }

    fn page_size(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        }
    }
}

#[async_trait]
impl FileStorage for ScopedStorage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.name()))]
    async fn get(&self, path: &str) -> Result<Option<File>> {
        let path = path::validate_file(path)?;
        if !self.filters.is_allowed(&path) {
            tracing::debug!(%path, "Path outside of allowed prefixes; reporting as missing");
            return Ok(None);
        }
        self.inner.get(&path).await
    }

    #[instrument(level = "debug", skip(self, cmd), fields(backend = self.name(), path = %cmd.path))]
    async fn upsert(&self, cmd: &UpsertFileCommand) -> Result<()> {
        let path = path::validate_file(&cmd.path)?;
        if let Some(key) = cmd.properties.keys().find(|k| k.is_empty() || k.chars().any(char::is_control)) {
            exn::bail!(ErrorKind::InvalidArgument(format!("invalid property key: {key:?}")));
        }
        if !self.filters.is_allowed(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        let cmd = UpsertFileCommand { path, ..cmd.clone() };
        self.inner.upsert(&cmd).await
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.name()))]
    async fn delete(&self, path: &str) -> Result<()> {
        let path = path::validate_file(path)?;
        if !self.filters.is_allowed(&path) {
            tracing::debug!(%path, "Path outside of allowed prefixes; nothing to delete");
            return Ok(());
        }
        self.inner.delete(&path).await
    }

    #[instrument(level = "debug", skip(self, paging, options), fields(backend = self.name()))]
    async fn list_files(&self, folder: &str, paging: &Paging, options: &ListOptions) -> Result<ListFilesResponse> {
        let folder = path::validate_folder(folder)?;
        let paging = Paging { first: self.page_size(paging.first), after: paging.after.clone() };
        let options = options.clone().with_filters(self.filters.clone());
        self.inner.list_files(&folder, &paging, &options).await
    }

    #[instrument(level = "debug", skip(self, options), fields(backend = self.name()))]
    async fn list_folders(&self, folder: &str, options: &ListOptions) -> Result<Vec<Folder>> {
        let folder = path::validate_folder(folder)?;
        let options = options.clone().with_filters(self.filters.clone());
        self.inner.list_folders(&folder, &options).await
    }

    #[instrument(level = "debug", skip(self), fields(backend = self.name()))]
    async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        let parent = path::validate_folder(parent)?;
        let name = path::validate_name(name)?;
        let folder = path::join(&parent, &name);
        if folder.len() > path::MAX_PATH_LENGTH {
            exn::bail!(ErrorKind::InvalidPath(folder));
        }
        if !self.filters.is_allowed(&path::marker(&folder)) {
            exn::bail!(ErrorKind::PermissionDenied(folder));
        }
        self.inner.create_folder(&parent, &name).await
    }

    #[instrument(level = "debug", skip(self, options), fields(backend = self.name()))]
    async fn delete_folder(&self, folder: &str, options: &DeleteFolderOptions) -> Result<()> {
        let folder = path::validate_folder(folder)?;
        if folder == path::ROOT {
            exn::bail!(ErrorKind::InvalidArgument("the root folder cannot be deleted".to_string()));
        }
        if !options.force && !self.filters.is_allowed(&path::marker(&folder)) {
            tracing::debug!(%folder, "Folder outside of allowed prefixes; nothing to delete");
            return Ok(());
        }
        let options = options.clone().with_filters(self.filters.clone());
        self.inner.delete_folder(&folder, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use std::sync::Arc;

    /// Helper: a scoped view and an unrestricted view over the same memory store.
    fn setup(filters: PathFilters) -> (ScopedStorage, ScopedStorage) {
        let memory: BackendHandle = Arc::new(MemoryStorage::default());
        (ScopedStorage::new(memory.clone(), filters), ScopedStorage::unrestricted(memory))
    }

    async fn put(storage: &dyn FileStorage, path: &str) {
        storage.upsert(&UpsertFileCommand::new(path).with_contents(b"data".to_vec())).await.unwrap();
    }

    #[tokio::test]
    async fn test_paths_are_normalized() {
        let (storage, _) = setup(PathFilters::default());
        put(&storage, "a//b/./c.txt").await;
        let file = storage.read("/a/b/c.txt").await.unwrap();
        assert_eq!(file.full_path, "/a/b/c.txt");
        assert_eq!(file.name, "c.txt");
    }

    #[tokio::test]
    async fn test_hidden_path_is_indistinguishable_from_missing() {
        let (storage, admin) = setup(PathFilters::allowing(["team1/"]));
        put(&admin, "/team2/secret").await;
        assert!(storage.get("team2/secret").await.unwrap().is_none());
        assert!(storage.get("team2/missing").await.unwrap().is_none());
        let hidden = storage.read("team2/secret").await.unwrap_err();
        let missing = storage.read("team2/missing").await.unwrap_err();
        assert!(matches!(&*hidden, ErrorKind::NotFound(_)));
        assert!(matches!(&*missing, ErrorKind::NotFound(_)));
        assert!(!storage.exists("team2/secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_hidden_paths_are_never_listed() {
        let (storage, admin) = setup(PathFilters::allowing(["team1/"]));
        put(&admin, "/team1/report").await;
        put(&admin, "/team2/secret").await;
        let page = storage.list_files("/", &Paging::default(), &ListOptions::recursive()).await.unwrap();
        let paths: Vec<_> = page.files.iter().map(|f| f.full_path.as_str()).collect();
        assert_eq!(paths, ["/team1/report"]);
        let folders = storage.list_folders("/", &ListOptions::recursive()).await.unwrap();
        let paths: Vec<_> = folders.iter().map(|f| f.full_path.as_str()).collect();
        assert_eq!(paths, ["/team1"]);
    }

    #[tokio::test]
    async fn test_caller_filters_narrow_scoped_filters() {
        let (storage, admin) = setup(PathFilters::allowing(["/a/"]));
        put(&admin, "/a/b/1").await;
        put(&admin, "/a/c/2").await;
        let options = ListOptions::recursive().with_filters(PathFilters::allowing(["/a/b/"]));
        let page = storage.list_files("/", &Paging::default(), &options).await.unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.last_path, "/a/b/1");
    }

    #[tokio::test]
    async fn test_hidden_delete_is_a_noop() {
        let (storage, admin) = setup(PathFilters::allowing(["team1/"]));
        put(&admin, "/team2/secret").await;
        storage.delete("/team2/secret").await.unwrap();
        assert!(admin.exists("/team2/secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_hidden_write_is_denied() {
        let (storage, admin) = setup(PathFilters::allowing(["team1/"]));
        let cmd = UpsertFileCommand::new("/team2/new").with_contents(b"x".to_vec());
        let err = storage.upsert(&cmd).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(!admin.exists("/team2/new").await.unwrap());
        let err = storage.create_folder("/team2", "sub").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected() {
        let (storage, _) = setup(PathFilters::default());
        let err = storage.get("../escape").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
        let err = storage.upsert(&UpsertFileCommand::new("/")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
        let cmd = UpsertFileCommand::new("/a").with_property("", "v");
        let err = storage.upsert(&cmd).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
        let err = storage.create_folder("/", "a/b").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
        let err = storage.delete_folder("/", &DeleteFolderOptions::force()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
        let err = storage.get("/a/__directory_marker__").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_page_sizes_are_bounded() {
        let (storage, _) = setup(PathFilters::default());
        let storage = storage.with_page_sizes(2, 3);
        for name in ["/a", "/b", "/c", "/d", "/e"] {
            put(&storage, name).await;
        }
        let page = storage.list_files("/", &Paging::first(0), &ListOptions::default()).await.unwrap();
        assert_eq!(page.files.len(), 2);
        let page = storage.list_files("/", &Paging::first(50), &ListOptions::default()).await.unwrap();
        assert_eq!(page.files.len(), 3);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_forced_folder_delete_keeps_hidden_files() {
        let (storage, admin) = setup(PathFilters::allowing(["/shared/"]).deny_prefix("/shared/locked/"));
        put(&admin, "/shared/open/1").await;
        put(&admin, "/shared/locked/2").await;
        storage.delete_folder("/shared", &DeleteFolderOptions::force()).await.unwrap();
        assert!(!admin.exists("/shared/open/1").await.unwrap());
        assert!(admin.exists("/shared/locked/2").await.unwrap());
    }
}
