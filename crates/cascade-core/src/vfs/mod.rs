//! Path-addressed filesystem capability layer.
//!
//! Every file operation goes through the [`Vfs`] trait so the engine stays
//! agnostic of the storage backend. [`LocalVfs`] is the backend for the host
//! filesystem.

mod local;

use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::name::EntryName;
use crate::node::EntryKind;

pub use local::LocalVfs;

/// Permission bits (including setuid/setgid/sticky) of a mode word.
pub const PERMISSION_MASK: u32 = 0o7777;

/// Metadata returned by `stat`/`lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Entry type.
    pub kind: EntryKind,
    /// Full mode word, file type bits included.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time.
    pub accessed: SystemTime,
    /// Device holding the entry.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Device id for block/character special files.
    pub rdev: u64,
}

impl FileStat {
    /// Permission bits only.
    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }

    /// Whether both stats describe the same inode.
    pub fn same_file(&self, other: &FileStat) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }

    /// Build a stat from host metadata.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        let accessed = metadata.accessed().unwrap_or(modified);

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self {
                kind: metadata.file_type().into(),
                mode: metadata.mode(),
                size: metadata.len(),
                modified,
                accessed,
                dev: metadata.dev(),
                ino: metadata.ino(),
                uid: metadata.uid(),
                gid: metadata.gid(),
                rdev: metadata.rdev(),
            }
        }

        #[cfg(not(unix))]
        {
            let mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
            Self {
                kind: metadata.file_type().into(),
                mode,
                size: metadata.len(),
                modified,
                accessed,
                dev: 0,
                ino: 0,
                uid: 0,
                gid: 0,
                rdev: 0,
            }
        }
    }
}

/// A directory entry as returned by `scandir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name.
    pub name: EntryName,
    /// File type from the directory read.
    pub kind: EntryKind,
}

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only.
    Read,
    /// Write, creating the file or truncating it.
    Truncate,
    /// Write after existing contents, creating the file if needed.
    Append,
}

/// An open file. Closing is dropping.
pub trait VfsFile: Read + Write + Seek {}

impl<T: Read + Write + Seek> VfsFile for T {}

/// The filesystem capability set the engine consumes.
pub trait Vfs {
    /// Stat following symlinks.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Stat without following symlinks.
    fn lstat(&self, path: &Path) -> io::Result<FileStat>;

    /// Open a file. `perm` is used when the file gets created.
    fn open(&self, path: &Path, mode: OpenMode, perm: u32) -> io::Result<Box<dyn VfsFile>>;

    /// Create a directory.
    fn mkdir(&self, path: &Path, perm: u32) -> io::Result<()>;

    /// Remove an empty directory.
    fn rmdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a non-directory entry.
    fn unlink(&self, path: &Path) -> io::Result<()>;

    /// Atomically rename `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a symlink at `link` pointing at `target`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Read a symlink's target.
    fn readlink(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create a special file (FIFO, socket, device node).
    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> io::Result<()>;

    /// Change permission bits, following symlinks.
    fn chmod(&self, path: &Path, perm: u32) -> io::Result<()>;

    /// Change owner and/or group. `follow` selects chown over lchown.
    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>, follow: bool)
    -> io::Result<()>;

    /// Set access and modification times without opening or following `path`.
    fn utime(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()>;

    /// List a directory, pseudo entries excluded, sorted by name.
    fn scandir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Whether a rename from `source` into `destination` can stay on one filesystem.
    ///
    /// `destination` may not exist yet; its closest existing ancestor is used.
    fn same_filesystem(&self, source: &Path, destination: &Path) -> bool;
}

impl<V: Vfs + ?Sized> Vfs for &V {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        (**self).stat(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        (**self).lstat(path)
    }

    fn open(&self, path: &Path, mode: OpenMode, perm: u32) -> io::Result<Box<dyn VfsFile>> {
        (**self).open(path, mode, perm)
    }

    fn mkdir(&self, path: &Path, perm: u32) -> io::Result<()> {
        (**self).mkdir(path, perm)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        (**self).rmdir(path)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        (**self).unlink(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        (**self).symlink(target, link)
    }

    fn readlink(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).readlink(path)
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> io::Result<()> {
        (**self).mknod(path, mode, rdev)
    }

    fn chmod(&self, path: &Path, perm: u32) -> io::Result<()> {
        (**self).chmod(path, perm)
    }

    fn chown(
        &self,
        path: &Path,
        uid: Option<u32>,
        gid: Option<u32>,
        follow: bool,
    ) -> io::Result<()> {
        (**self).chown(path, uid, gid, follow)
    }

    fn utime(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()> {
        (**self).utime(path, accessed, modified)
    }

    fn scandir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).scandir(path)
    }

    fn same_filesystem(&self, source: &Path, destination: &Path) -> bool {
        (**self).same_filesystem(source, destination)
    }
}
