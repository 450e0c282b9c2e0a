//! [`FileStorage`] over the SQLite record store.

use crate::Database;
use crate::files::{self, ListQuery};
use crate::models::NewFileRow;
use crate::properties;
use async_trait::async_trait;
use exn::ResultExt;
use std::slice;
use strata_storage::error::{ErrorKind as StorageErrorKind, Result};
use strata_storage::{
    DeleteFolderOptions, File, FileMetadata, FileStorage, Folder, ListFilesResponse, ListOptions, Paging,
    UpsertFileCommand, folder, path,
};
use time::UtcDateTime;
use tracing::instrument;

/// Storage backend keeping files, directory markers and properties in SQLite.
///
/// Like every record-store backend it expects normalized paths; hand it to
/// callers through a [`ScopedStorage`](strata_storage::ScopedStorage). Each
/// operation takes one connection (or transaction) from the pool for its
/// whole duration. Writes touching more than one row are atomic, and reads
/// of a file together with its properties see a single snapshot.
#[derive(Debug, Clone)]
pub struct DatabaseStorage {
    name: String,
    db: Database,
}
impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { name: "sqlite".to_string(), db }
    }

    /// Change the name of the backend (used in logs).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl FileStorage for DatabaseStorage {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip(self), fields(backend = %self.name))]
    async fn get(&self, path: &str) -> Result<Option<File>> {
        // One snapshot for the file row and its properties.
        let mut tx = self.db.pool().begin().await.or_raise(|| StorageErrorKind::Storage)?;
        let Some(row) = files::get(&mut tx, path).await.or_raise(|| StorageErrorKind::Storage)? else {
            return Ok(None);
        };
        let key = path::key(path);
        let mut found = properties::get_all(&mut tx, slice::from_ref(&key)).await.or_raise(|| StorageErrorKind::Storage)?;
        tx.commit().await.or_raise(|| StorageErrorKind::Storage)?;
        let file = row.into_file(found.remove(&key).unwrap_or_default()).or_raise(|| StorageErrorKind::Storage)?;
        Ok(Some(file))
    }

    #[instrument(level = "debug", skip(self, cmd), fields(backend = %self.name, path = %cmd.path))]
    async fn upsert(&self, cmd: &UpsertFileCommand) -> Result<()> {
        let now = UtcDateTime::now();
        let mime_type = cmd.mime_type.as_deref().unwrap_or_default();
        let mut tx = self.db.pool().begin().await.or_raise(|| StorageErrorKind::Storage)?;
        let updated = match &cmd.contents {
            Some(contents) => files::update_contents(&mut tx, &cmd.path, contents, mime_type, now).await,
            None => files::touch(&mut tx, &cmd.path, now).await,
        }
        .or_raise(|| StorageErrorKind::Storage)?;
        if updated == 0 {
            let contents = cmd.contents.as_deref().unwrap_or_default();
            let row = NewFileRow::new(&cmd.path, contents, mime_type, now).or_raise(|| StorageErrorKind::Storage)?;
            files::insert(&mut tx, &row).await.or_raise(|| StorageErrorKind::Storage)?;
        }
        properties::upsert_all(&mut tx, &path::key(&cmd.path), &cmd.properties, now)
            .await
            .or_raise(|| StorageErrorKind::Storage)?;
        tx.commit().await.or_raise(|| StorageErrorKind::Storage)?;
        let created = updated == 0;
        tracing::info!(created, properties = cmd.properties.len(), "Upserted file");
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(backend = %self.name))]
    async fn delete(&self, path: &str) -> Result<()> {
        let mut tx = self.db.pool().begin().await.or_raise(|| StorageErrorKind::Storage)?;
        let deleted = files::delete(&mut tx, path).await.or_raise(|| StorageErrorKind::Storage)?;
        let removed = properties::delete_all(&mut tx, &path::key(path)).await.or_raise(|| StorageErrorKind::Storage)?;
        tx.commit().await.or_raise(|| StorageErrorKind::Storage)?;
        tracing::info!(rows = deleted, "Deleted file");
        tracing::info!(rows = removed, "Deleted properties");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, paging, options), fields(backend = %self.name, first = paging.first))]
    async fn list_files(&self, folder: &str, paging: &Paging, options: &ListOptions) -> Result<ListFilesResponse> {
        let mut tx = self.db.pool().begin().await.or_raise(|| StorageErrorKind::Storage)?;
        let query = ListQuery {
            folder,
            recursive: options.recursive,
            filters: &options.path_filters,
            after: paging.after.as_deref(),
            limit: paging.first.saturating_add(1),
        };
        let rows = files::list(&mut tx, &query).await.or_raise(|| StorageErrorKind::Storage)?;
        let keys: Vec<String> = rows.iter().take(paging.first).map(|row| path::key(&row.path)).collect();
        let mut found = properties::get_all(&mut tx, &keys).await.or_raise(|| StorageErrorKind::Storage)?;
        tx.commit().await.or_raise(|| StorageErrorKind::Storage)?;
        let files = rows
            .into_iter()
            .map(|row| {
                let properties = found.remove(&path::key(&row.path)).unwrap_or_default();
                FileMetadata::try_from(row).map(|meta| FileMetadata { properties, ..meta })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .or_raise(|| StorageErrorKind::Storage)?;
        Ok(ListFilesResponse::from_overfetch(files, paging.first))
    }

    #[instrument(level = "debug", skip(self, options), fields(backend = %self.name, recursive = options.recursive))]
    async fn list_folders(&self, folder: &str, options: &ListOptions) -> Result<Vec<Folder>> {
        let mut conn = self.db.pool().acquire().await.or_raise(|| StorageErrorKind::Storage)?;
        let parents = files::distinct_parents(&mut conn, folder, &options.path_filters)
            .await
            .or_raise(|| StorageErrorKind::Storage)?;
        Ok(folder::synthesize(folder, parents, options.recursive))
    }

    #[instrument(level = "debug", skip(self), fields(backend = %self.name))]
    async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        let folder = path::join(parent, name);
        let mut conn = self.db.pool().acquire().await.or_raise(|| StorageErrorKind::Storage)?;
        let inserted =
            files::insert_marker(&mut conn, &folder, UtcDateTime::now()).await.or_raise(|| StorageErrorKind::Storage)?;
        match inserted {
            0 => tracing::debug!(%folder, "Folder already exists"),
            _ => tracing::info!(%folder, "Created folder"),
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, options), fields(backend = %self.name, force = options.force))]
    async fn delete_folder(&self, folder: &str, options: &DeleteFolderOptions) -> Result<()> {
        let marker = path::marker(folder);
        let visible = options.path_filters.iter().all(|filters| filters.is_allowed(&marker));
        let mut tx = self.db.pool().begin().await.or_raise(|| StorageErrorKind::Storage)?;
        if visible {
            let deleted = files::delete(&mut tx, &marker).await.or_raise(|| StorageErrorKind::Storage)?;
            properties::delete_all(&mut tx, &path::key(&marker)).await.or_raise(|| StorageErrorKind::Storage)?;
            tracing::info!(rows = deleted, "Deleted directory marker");
        }
        if options.force {
            let deleted = files::delete_tree(&mut tx, folder, &options.path_filters)
                .await
                .or_raise(|| StorageErrorKind::Storage)?;
            tracing::info!(rows = deleted.files, "Deleted file");
            tracing::info!(rows = deleted.properties, "Deleted properties");
        }
        tx.commit().await.or_raise(|| StorageErrorKind::Storage)?;
        Ok(())
    }
}
