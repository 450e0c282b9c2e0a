//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Record-store failures from the
//! implementing crates are attached as children of [`ErrorKind::Storage`].

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Hidden paths never surface as anything other than [`ErrorKind::NotFound`]
/// on reads, so matching on this enum does not reveal whether a path outside
/// the caller's filters exists.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist (or is not visible to the caller).
    #[display("file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Path is malformed, uses the reserved marker segment, or escapes the root.
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// Any other malformed argument (folder names, property keys, ...).
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    /// Write rejected by the caller's path filters.
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// The underlying record store failed (connectivity, constraint, aborted transaction).
    #[display("record store failure")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
