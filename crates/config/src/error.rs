//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A source could not be read or parsed.
    #[display("could not load configuration")]
    Load,
    /// The configuration loaded, but its values cannot be used.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] &'static str),
}
