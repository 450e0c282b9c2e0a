//! These types represent what the storage façade hands back to callers,
//! independently of how the record store lays out its rows.

use std::collections::HashMap;
use std::ops::Deref;
use time::UtcDateTime;

/// Everything known about a stored file except its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Final path segment
    pub name: String,
    /// Normalized path in the casing it was first written with
    pub full_path: String,
    pub created: UtcDateTime,
    /// Time of the last upsert, with or without new contents
    pub modified: UtcDateTime,
    /// Content length in bytes
    pub size: u64,
    pub mime_type: String,
    /// Key/value properties attached to the path
    pub properties: HashMap<String, String>,
}

/// A stored file: metadata plus contents, read whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    meta: FileMetadata,
    pub contents: Vec<u8>,
}
impl File {
    pub fn new(meta: FileMetadata, contents: Vec<u8>) -> Self {
        Self { meta, contents }
    }

    // Explicit version of self.deref()
    pub fn meta(&self) -> &FileMetadata {
        &self.meta
    }

    pub fn into_meta(self) -> FileMetadata {
        self.meta
    }
}
impl Deref for File {
    type Target = FileMetadata;
    fn deref(&self) -> &FileMetadata {
        &self.meta
    }
}

/// A folder synthesized from the paths of the files below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Folder {
    /// Full folder path; first so that the derived ordering sorts by path.
    pub full_path: String,
    pub name: String,
}
