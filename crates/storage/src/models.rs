//! Command and option types accepted by [`FileStorage`](crate::FileStorage).

use crate::file::FileMetadata;
use crate::filter::PathFilters;
use std::collections::HashMap;

/// Page size used when a caller asks for zero items.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest page size a caller can request.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Create or update a file.
///
/// Omitting `contents` on an existing file only touches its modification
/// time (and properties); on a new file it creates an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertFileCommand {
    pub path: String,
    pub contents: Option<Vec<u8>>,
    pub mime_type: Option<String>,
    pub properties: HashMap<String, String>,
}
impl UpsertFileCommand {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Cursor-based pagination over paths.
///
/// `after` is the `last_path` of a previous [`ListFilesResponse`]; it is
/// compared against stored paths as-is and never normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    pub first: usize,
    pub after: Option<String>,
}
impl Paging {
    pub fn first(first: usize) -> Self {
        Self { first, after: None }
    }

    pub fn after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into()).filter(|a: &String| !a.is_empty());
        self
    }
}
impl Default for Paging {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Scope of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Include everything below the folder, not just its direct children.
    pub recursive: bool,
    /// Every set narrows the result further.
    pub path_filters: Vec<PathFilters>,
}
impl ListOptions {
    pub fn recursive() -> Self {
        Self { recursive: true, ..Default::default() }
    }

    pub fn with_filters(mut self, filters: PathFilters) -> Self {
        self.path_filters.push(filters);
        self
    }
}

/// How far a folder deletion reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteFolderOptions {
    /// Also delete every (visible) file below the folder. Without it only the
    /// directory marker goes, and files below the folder keep implying it.
    pub force: bool,
    /// Only files passing every set are removed by a forced deletion.
    pub path_filters: Vec<PathFilters>,
}
impl DeleteFolderOptions {
    pub fn force() -> Self {
        Self { force: true, ..Default::default() }
    }

    pub fn with_filters(mut self, filters: PathFilters) -> Self {
        self.path_filters.push(filters);
        self
    }
}

/// One page of a file listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilesResponse {
    pub files: Vec<FileMetadata>,
    /// Path of the last file in `files`, or empty when the page is empty.
    pub last_path: String,
    pub has_more: bool,
}
impl ListFilesResponse {
    /// Build a page from `page_size + 1` fetched items.
    pub fn from_overfetch(mut files: Vec<FileMetadata>, page_size: usize) -> Self {
        let has_more = files.len() > page_size;
        files.truncate(page_size);
        let last_path = files.last().map(|f| f.full_path.clone()).unwrap_or_default();
        Self { files, last_path, has_more }
    }
}
