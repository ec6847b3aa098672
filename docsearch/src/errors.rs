//! Error types for docsearch.
//!
//! Every failure a run can hit is one variant of [`SearchError`]. All of them
//! are fatal: a run either produces a complete result map or an error, never a
//! partial result.
//!
//! ```rust,ignore
//! match docsearch::search(&config) {
//!     Ok(outcome) => // display ranked counts,
//!     Err(SearchError::ConfigError(msg)) => // bad directory, method or term,
//!     Err(SearchError::FileNotFound(path)) => // a listed file vanished,
//!     Err(e) => // everything else aborts the run too
//! }
//! ```
//!
//! A lookup against an index that cannot be opened is not an error; the
//! indexed strategy reports zero matches instead.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during a search run
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Index error: {0}")]
    IndexError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("File name is not valid UTF-8: {0}")]
    InvalidFileName(PathBuf),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn invalid_file_name(path: impl Into<PathBuf>) -> Self {
        Self::InvalidFileName(path.into())
    }

    pub fn index_error(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        let path = path.into();
        let unified = unify_path(&path);
        Self::EncodingError {
            path: unified,
            source,
        }
    }

    /// Maps an I/O failure on `path` to the most specific variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Whether the error was raised before any file was processed.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::InvalidPattern(_))
    }
}
