//! In-memory storage backend for testing.

use crate::FileStorage;
use crate::error::Result;
use crate::file::{File, FileMetadata, Folder};
use crate::filter::allows_all;
use crate::folder;
use crate::models::{DeleteFolderOptions, ListFilesResponse, ListOptions, Paging, UpsertFileCommand};
use crate::path;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    contents: Vec<u8>,
    mime_type: String,
    created: UtcDateTime,
    updated: UtcDateTime,
    properties: HashMap<String, String>,
}
impl Entry {
    fn metadata(&self) -> FileMetadata {
        FileMetadata {
            name: path::name(&self.path).to_string(),
            full_path: self.path.clone(),
            created: self.created,
            modified: self.updated,
            size: self.contents.len() as u64,
            mime_type: self.mime_type.clone(),
            properties: self.properties.clone(),
        }
    }

    fn in_scope(&self, folder: &str, recursive: bool) -> bool {
        let parent = path::parent(&self.path);
        path::key(parent) == path::key(folder) || (recursive && path::is_descendant(parent, folder))
    }
}

/// In-memory storage backend for testing.
///
/// Records are kept in a [`BTreeMap`] keyed by the case-insensitive path key
/// behind a [`RwLock`], so all trait methods can operate on `&self` without
/// external synchronisation. It follows the same contract as the database
/// backend (directory markers included), and like it expects normalized
/// paths: wrap it in a [`ScopedStorage`](crate::ScopedStorage) to get
/// validation and filtering.
pub struct MemoryStorage {
    name: String,
    records: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStorage {
    /// Create a memory backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let mut records = BTreeMap::new();
        for (file_path, contents) in files {
            let Ok(validated) = path::validate_file(&file_path) else {
                // The panic here is DELIBERATE. MemoryStorage is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MemoryStorage::with_files: invalid path {}", file_path.as_ref());
            };
            let entry = Entry {
                path: validated.clone(),
                contents: contents.into(),
                mime_type: String::new(),
                created: now,
                updated: now,
                properties: HashMap::new(),
            };
            records.insert(path::key(&validated), entry);
        }
        Self {
            name: "memory".to_string(),
            records: RwLock::new(records),
        }
    }

    /// Change the name of the memory backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
impl Default for MemoryStorage {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, path: &str) -> Result<Option<File>> {
        let guard = self.records.read().await;
        Ok(guard.get(&path::key(path)).map(|e| File::new(e.metadata(), e.contents.clone())))
    }

    async fn upsert(&self, cmd: &UpsertFileCommand) -> Result<()> {
        let now = UtcDateTime::now();
        let mut guard = self.records.write().await;
        let entry = guard.entry(path::key(&cmd.path)).or_insert_with(|| Entry {
            path: cmd.path.clone(),
            contents: Vec::new(),
            mime_type: cmd.mime_type.clone().unwrap_or_default(),
            created: now,
            updated: now,
            properties: HashMap::new(),
        });
        entry.updated = now;
        if let Some(contents) = &cmd.contents {
            entry.contents = contents.clone();
            entry.mime_type = cmd.mime_type.clone().unwrap_or_default();
        }
        entry.properties.extend(cmd.properties.clone());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.records.write().await.remove(&path::key(path));
        Ok(())
    }

    async fn list_files(&self, folder: &str, paging: &Paging, options: &ListOptions) -> Result<ListFilesResponse> {
        let guard = self.records.read().await;
        let mut files: Vec<FileMetadata> = guard
            .values()
            .filter(|e| e.in_scope(folder, options.recursive))
            .filter(|e| !path::is_marker(&e.path))
            .filter(|e| allows_all(&options.path_filters, &e.path))
            .filter(|e| paging.after.as_deref().is_none_or(|after| e.path.as_str() > after))
            .map(Entry::metadata)
            .collect();
        // Listing order is the stored casing, not the lookup key.
        files.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        files.truncate(paging.first + 1);
        Ok(ListFilesResponse::from_overfetch(files, paging.first))
    }

    async fn list_folders(&self, folder: &str, options: &ListOptions) -> Result<Vec<Folder>> {
        let guard = self.records.read().await;
        let mut parents: Vec<&str> = guard
            .values()
            .filter(|e| e.in_scope(folder, true))
            .filter(|e| allows_all(&options.path_filters, &e.path))
            .map(|e| path::parent(&e.path))
            .collect();
        parents.sort_unstable();
        parents.dedup();
        Ok(folder::synthesize(folder, parents, options.recursive))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        let folder = path::join(parent, name);
        let marker = path::marker(&folder);
        let now = UtcDateTime::now();
        self.records.write().await.entry(path::key(&marker)).or_insert_with(|| Entry {
            path: marker,
            contents: Vec::new(),
            mime_type: String::new(),
            created: now,
            updated: now,
            properties: HashMap::new(),
        });
        Ok(())
    }

    async fn delete_folder(&self, folder: &str, options: &DeleteFolderOptions) -> Result<()> {
        let marker = path::marker(folder);
        let mut guard = self.records.write().await;
        if allows_all(&options.path_filters, &marker) {
            guard.remove(&path::key(&marker));
        }
        if options.force {
            guard.retain(|_, e| !(path::is_descendant(&e.path, folder) && allows_all(&options.path_filters, &e.path)));
        }
        Ok(())
    }
}
