//! File operation types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operators::ChmodSpec;

/// A file operation to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOperation {
    /// Copy files/directories to a destination.
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Move files/directories to a destination.
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Delete files/directories recursively.
    Delete { targets: Vec<PathBuf> },
    /// Change permission bits.
    Chmod {
        targets: Vec<PathBuf>,
        spec: ChmodSpec,
        recursive: bool,
    },
    /// Change owner and/or group.
    Chown {
        targets: Vec<PathBuf>,
        uid: Option<u32>,
        gid: Option<u32>,
        recursive: bool,
    },
}

impl FileOperation {
    /// Create a copy operation.
    pub fn copy(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Copy {
            sources,
            destination,
        }
    }

    /// Create a move operation.
    pub fn move_to(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Move {
            sources,
            destination,
        }
    }

    /// Create a delete operation.
    pub fn delete(targets: Vec<PathBuf>) -> Self {
        Self::Delete { targets }
    }

    /// Create a recursive chmod operation.
    pub fn chmod(targets: Vec<PathBuf>, spec: ChmodSpec) -> Self {
        Self::Chmod {
            targets,
            spec,
            recursive: true,
        }
    }

    /// Create a recursive chown operation.
    pub fn chown(targets: Vec<PathBuf>, uid: Option<u32>, gid: Option<u32>) -> Self {
        Self::Chown {
            targets,
            uid,
            gid,
            recursive: true,
        }
    }

    /// The entries this operation starts from.
    pub fn sources(&self) -> &[PathBuf] {
        match self {
            Self::Copy { sources, .. } | Self::Move { sources, .. } => sources,
            Self::Delete { targets }
            | Self::Chmod { targets, .. }
            | Self::Chown { targets, .. } => targets,
        }
    }
}

/// The low-level filesystem call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum FsCall {
    #[strum(to_string = "stat")]
    Stat,
    #[strum(to_string = "open")]
    Open,
    #[strum(to_string = "create")]
    Create,
    #[strum(to_string = "read")]
    Read,
    #[strum(to_string = "write")]
    Write,
    #[strum(to_string = "create directory")]
    Mkdir,
    #[strum(to_string = "remove directory")]
    Rmdir,
    #[strum(to_string = "delete")]
    Unlink,
    #[strum(to_string = "move")]
    Rename,
    #[strum(to_string = "create symlink")]
    Symlink,
    #[strum(to_string = "read symlink")]
    Readlink,
    #[strum(to_string = "create special file")]
    Mknod,
    #[strum(to_string = "change mode of")]
    Chmod,
    #[strum(to_string = "change owner of")]
    Chown,
    #[strum(to_string = "set times of")]
    Utime,
    #[strum(to_string = "list directory")]
    Scandir,
    #[strum(to_string = "copy")]
    Copy,
}

/// A failed filesystem call on one entry.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Cannot {call} {}: {message}", .path.display())]
pub struct OperationError {
    /// The call that failed.
    pub call: FsCall,
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(call: FsCall, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            call,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an error from an I/O failure.
    pub fn io(call: FsCall, path: &Path, source: &std::io::Error) -> Self {
        Self::new(call, path, source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_display() {
        let err = OperationError::io(
            FsCall::Mkdir,
            Path::new("dst/sub"),
            &std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied"),
        );
        assert_eq!(err.to_string(), "Cannot create directory dst/sub: Permission denied");
    }

    #[test]
    fn test_file_operation_sources() {
        let op = FileOperation::copy(vec!["a".into(), "b".into()], "dst".into());
        assert_eq!(op.sources().len(), 2);

        let op = FileOperation::delete(vec!["x".into()]);
        assert_eq!(op.sources(), &[PathBuf::from("x")]);
    }
}
