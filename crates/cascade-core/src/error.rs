//! Error types for listing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a prescan.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Prescan was cancelled by the user.
    #[error("Scan interrupted")]
    Interrupted,

    /// Base directory cannot be used.
    #[error("Base directory is not usable: {path}")]
    InvalidBase { path: PathBuf },
}

impl ListingError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// The path the error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::InvalidBase { path } => Some(path),
            Self::Interrupted => None,
        }
    }
}
