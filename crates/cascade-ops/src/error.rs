//! Fatal setup errors.

use std::path::PathBuf;

use cascade_core::ListingError;
use thiserror::Error;

/// Errors that stop an operation before any entry is touched.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing was selected.
    #[error("Nothing selected")]
    EmptySelection,

    /// "." or ".." (or a path without a final name) was selected.
    #[error("Cannot operate on '{}'", .path.display())]
    PseudoEntry { path: PathBuf },

    /// A selected entry does not exist.
    #[error("Cannot stat {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory a destination would be created in is missing.
    #[error("Destination directory does not exist: {}", .path.display())]
    DestinationMissing { path: PathBuf },

    /// Several entries cannot all become one non-directory path.
    #[error("Destination is not a directory: {}", .path.display())]
    DestinationNotDirectory { path: PathBuf },

    /// The selection's base directory cannot be listed.
    #[error(transparent)]
    Listing(#[from] ListingError),
}
