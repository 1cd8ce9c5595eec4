//! Host filesystem backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;

use super::{DirEntry, FileStat, OpenMode, Vfs, VfsFile};
use crate::name::EntryName;
use crate::node::{EntryKind, is_pseudo_entry};

/// [`Vfs`] implementation backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalVfs;

impl LocalVfs {
    /// Create a new local backend.
    pub fn new() -> Self {
        Self
    }
}

impl Vfs for LocalVfs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        fs::metadata(path).map(|m| FileStat::from_metadata(&m))
    }

    fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        fs::symlink_metadata(path).map(|m| FileStat::from_metadata(&m))
    }

    fn open(&self, path: &Path, mode: OpenMode, perm: u32) -> io::Result<Box<dyn VfsFile>> {
        let mut options = fs::OpenOptions::new();
        match mode {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Truncate => {
                options.write(true).create(true).truncate(true);
            }
            OpenMode::Append => {
                options.append(true).create(true);
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        Ok(Box::new(options.open(path)?))
    }

    fn mkdir(&self, path: &Path, perm: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        builder.create(path)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(unsupported("symlink"))
    }

    fn readlink(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    #[cfg(unix)]
    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> io::Result<()> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains interior NUL"))?;

        let file_type = mode & libc::S_IFMT as u32;
        let result = if file_type == libc::S_IFIFO as u32 {
            unsafe { libc::mkfifo(c_path.as_ptr(), (mode & 0o7777) as libc::mode_t) }
        } else {
            unsafe { libc::mknod(c_path.as_ptr(), mode as libc::mode_t, rdev as libc::dev_t) }
        };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn mknod(&self, _path: &Path, _mode: u32, _rdev: u64) -> io::Result<()> {
        Err(unsupported("mknod"))
    }

    #[cfg(unix)]
    fn chmod(&self, path: &Path, perm: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(perm))
    }

    #[cfg(not(unix))]
    fn chmod(&self, path: &Path, perm: u32) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(perm & 0o222 == 0);
        fs::set_permissions(path, permissions)
    }

    #[cfg(unix)]
    fn chown(
        &self,
        path: &Path,
        uid: Option<u32>,
        gid: Option<u32>,
        follow: bool,
    ) -> io::Result<()> {
        if follow {
            std::os::unix::fs::chown(path, uid, gid)
        } else {
            std::os::unix::fs::lchown(path, uid, gid)
        }
    }

    #[cfg(not(unix))]
    fn chown(
        &self,
        _path: &Path,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _follow: bool,
    ) -> io::Result<()> {
        Err(unsupported("chown"))
    }

    /// Path based, so FIFOs and device nodes are never opened. Callers do not
    /// pass symlinks, which this would change instead of their targets.
    fn utime(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()> {
        filetime::set_symlink_file_times(
            path,
            FileTime::from_system_time(accessed),
            FileTime::from_system_time(modified),
        )
    }

    fn scandir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = EntryName::from_os(entry.file_name());
            if is_pseudo_entry(name.as_str()) {
                continue;
            }
            let kind = entry
                .file_type()
                .map(EntryKind::from)
                .unwrap_or(EntryKind::Other);
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn same_filesystem(&self, source: &Path, destination: &Path) -> bool {
        let Some(source_dev) = fs::symlink_metadata(source).ok().map(|m| device_of(&m)) else {
            return false;
        };

        let mut next = Some(destination);
        while let Some(candidate) = next {
            if let Ok(metadata) = fs::metadata(candidate) {
                return device_of(&metadata) == source_dev;
            }
            next = candidate.parent().filter(|p| !p.as_os_str().is_empty());
        }
        false
    }
}

#[cfg(unix)]
fn device_of(metadata: &fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
fn device_of(_metadata: &fs::Metadata) -> Option<u64> {
    // No device ids; every rename is attempted and falls back on failure.
    None
}

#[cfg(not(unix))]
fn unsupported(call: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{call} is only implemented on Unix platforms"),
    )
}
