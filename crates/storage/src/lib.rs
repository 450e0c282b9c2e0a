//! Virtual file storage contract.
//!
//! This crate describes a hierarchical filesystem (files, folders, key/value
//! properties, paginated listings and path-prefix access control) without
//! committing to how it is stored. Record-store backends (see
//! `strata-database`) implement [`FileStorage`] over flat path-keyed rows, and
//! [`ScopedStorage`] layers argument validation and per-caller
//! [`PathFilters`] over any of them.

pub mod backend;
pub mod error;
pub mod file;
pub mod filter;
pub mod folder;
mod models;
pub mod path;

#[cfg(any(test, feature = "mock"))]
pub use crate::backend::MemoryStorage;
pub use crate::backend::{FileStorage, ScopedStorage};
pub use crate::file::{File, FileMetadata, Folder};
pub use crate::filter::PathFilters;
pub use crate::models::{
    DEFAULT_PAGE_SIZE, DeleteFolderOptions, ListFilesResponse, ListOptions, MAX_PAGE_SIZE, Paging, UpsertFileCommand,
};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn FileStorage + Send + Sync>;
