//! Error types for the SQL loader.

use thiserror::Error;

/// Errors raised by loader configuration and setup.
///
/// Child-process outcomes (launch failure, non-zero exit) are deliberately not
/// here: `load()` reports them and returns `Ok(false)` so a batch of scripts
/// can keep going.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A connection descriptor token could not be split into one `key=value` pair.
    #[error("malformed connection string: token {token:?} is not a key=value pair")]
    MalformedConnectionString { token: String },

    /// A template referenced a placeholder with no binding supplied for it.
    #[error("template placeholder %{placeholder}% has no binding")]
    MissingPlaceholder { placeholder: String },

    /// The configured log file could not be opened for append.
    #[error("could not open log file {} for append: {source}", .path.display())]
    LogOpenFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SQL source named an existing file that could not be read.
    #[error("could not read SQL file {}: {source}", .path.display())]
    SqlReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using LoaderError.
pub type Result<T> = std::result::Result<T, LoaderError>;
