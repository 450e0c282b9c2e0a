//! Storage backend trait and implementations.
//!
//! This module defines the `FileStorage` trait, the virtual filesystem
//! contract implemented on top of flat record stores, and the decorators
//! layered over it.

#[cfg(any(test, feature = "mock"))]
mod memory;
mod scoped;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStorage;
pub use self::scoped::ScopedStorage;
use crate::error::{ErrorKind, Result};
use crate::file::{File, Folder};
use crate::models::{DeleteFolderOptions, ListFilesResponse, ListOptions, Paging, UpsertFileCommand};
use async_trait::async_trait;

/// Unified interface for virtual file storage.
///
/// Files live at absolute, `/`-delimited paths that are compared
/// case-insensitively. Folders are implied by the files below them, and can
/// also be created explicitly, in which case a directory marker record keeps
/// them alive while empty.
///
/// # Path Handling
/// Implementations over a record store expect paths normalized by
/// [`path::validate_file`](crate::path::validate_file) and
/// [`path::validate_folder`](crate::path::validate_folder). Callers should go
/// through [`ScopedStorage`], which validates every argument and applies the
/// caller's [`PathFilters`](crate::PathFilters) before anything reaches the
/// store.
///
/// # Examples
///
/// ```
/// use strata_storage::{FileStorage, UpsertFileCommand, error::Result};
///
/// async fn size_of_hardcoded_file(storage: &dyn FileStorage) -> Result<u64> {
///     let cmd = UpsertFileCommand::new("/docs/readme.txt").with_contents(b"hello".to_vec());
///     storage.upsert(&cmd).await?;
///     match storage.get("/docs/readme.txt").await? {
///         Some(file) => Ok(file.size),
///         None => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Fetch a file with its contents and properties.
    ///
    /// A missing file is `Ok(None)`, not an error.
    async fn get(&self, path: &str) -> Result<Option<File>>;

    /// Fetch a file, returning [`NotFound`](crate::error::ErrorKind::NotFound)
    /// when it does not exist.
    async fn read(&self, path: &str) -> Result<File> {
        match self.get(path).await? {
            Some(file) => Ok(file),
            None => exn::bail!(ErrorKind::NotFound(path.to_string())),
        }
    }

    /// Check if a file exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }

    /// Create or update a file and its properties, atomically.
    ///
    /// If a property cannot be written, the file write is rolled back too.
    async fn upsert(&self, cmd: &UpsertFileCommand) -> Result<()>;

    /// Delete a file and all of its properties, atomically.
    ///
    /// Deleting a file that does not exist succeeds.
    async fn delete(&self, path: &str) -> Result<()>;

    /// List one page of files in a folder, ordered by path.
    ///
    /// Directory markers are never listed. Continue with
    /// `paging.after = response.last_path` while `response.has_more`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_storage::{FileStorage, ListOptions, Paging, error::Result};
    ///
    /// async fn count_all(storage: &dyn FileStorage) -> Result<usize> {
    ///     let mut paging = Paging::first(50);
    ///     let mut total = 0;
    ///     loop {
    ///         let page = storage.list_files("/", &paging, &ListOptions::recursive()).await?;
    ///         total += page.files.len();
    ///         if !page.has_more {
    ///             return Ok(total);
    ///         }
    ///         paging = paging.after(page.last_path);
    ///     }
    /// }
    /// ```
    async fn list_files(&self, folder: &str, paging: &Paging, options: &ListOptions) -> Result<ListFilesResponse>;

    /// List the folders below a folder, ordered by path.
    async fn list_folders(&self, folder: &str, options: &ListOptions) -> Result<Vec<Folder>>;

    /// Create a folder by writing its directory marker.
    ///
    /// Creating a folder that already has a marker succeeds.
    async fn create_folder(&self, parent: &str, name: &str) -> Result<()>;

    /// Delete a folder's directory marker (and, when forced, everything below it).
    ///
    /// Deleting a folder without a marker succeeds.
    async fn delete_folder(&self, folder: &str, options: &DeleteFolderOptions) -> Result<()>;
}
