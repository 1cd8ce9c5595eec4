//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cascade_core::{DirEntry, FileStat, LocalVfs, OpenMode, Vfs, VfsFile};
use cascade_ops::{
    Conflict, DialogAnswer, OperationError, OperationUi, OverwriteRule, ProgressSurface,
    UserSignal,
};
use tempfile::TempDir;

/// File type bits of a FIFO in a mode word.
pub const S_IFIFO: u32 = 0o010000;

/// A scratch directory with helpers to lay out trees.
pub struct TestFixture {
    pub root: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    pub fn write(&self, rel: &str, size: usize) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn write_str(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    #[cfg(unix)]
    pub fn symlink(&self, target: &str, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::os::unix::fs::symlink(target, &path).expect("Failed to create symlink");
        path
    }

    /// Create a FIFO.
    #[cfg(unix)]
    pub fn fifo(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        LocalVfs
            .mknod(&path, S_IFIFO | 0o644, 0)
            .expect("Failed to create fifo");
        path
    }

    pub fn exists(&self, rel: &str) -> bool {
        fs::symlink_metadata(self.path(rel)).is_ok()
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).expect("Failed to read file")
    }
}

/// UI double answering from scripts and recording what it was shown.
#[derive(Default)]
pub struct ScriptedUi {
    pub overwrite_answers: VecDeque<OverwriteRule>,
    pub retry_answers: VecDeque<DialogAnswer>,
    pub keep_incomplete: bool,
    pub signals: VecDeque<UserSignal>,
    /// Request an abort once this many entries are done.
    pub abort_after_files: Option<u64>,
    /// Request a skip after the first chunk of a file was written.
    pub skip_mid_file: bool,

    pub overwrite_calls: usize,
    pub retry_calls: usize,
    pub incomplete_calls: usize,
    pub errors: Vec<OperationError>,
    pub files: (u64, u64),
    pub total_bytes: (u64, u64),
    pub current: Vec<String>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering_overwrite(rules: &[OverwriteRule]) -> Self {
        Self {
            overwrite_answers: rules.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn answering_retry(answers: &[DialogAnswer]) -> Self {
        Self {
            retry_answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl ProgressSurface for ScriptedUi {
    fn set_current_file(&mut self, source: &str, _destination: Option<&str>) {
        self.current.push(source.to_string());
    }

    fn set_file_bytes(&mut self, done: u64, _total: u64) {
        if self.skip_mid_file && done > 0 {
            self.skip_mid_file = false;
            self.signals.push_back(UserSignal::Skip);
        }
    }

    fn set_total_bytes(&mut self, done: u64, total: u64) {
        self.total_bytes = (done, total);
    }

    fn set_files(&mut self, done: u64, total: u64) {
        self.files = (done, total);
        if self.abort_after_files.is_some_and(|limit| done >= limit) {
            self.abort_after_files = None;
            self.signals.push_back(UserSignal::Abort);
        }
    }

    fn poll_signal(&mut self) -> Option<UserSignal> {
        self.signals.pop_front()
    }
}

impl OperationUi for ScriptedUi {
    fn ask_retry(&mut self, error: &OperationError, _allow_ignore: bool) -> DialogAnswer {
        self.retry_calls += 1;
        self.errors.push(error.clone());
        self.retry_answers.pop_front().unwrap_or(DialogAnswer::Skip)
    }

    fn ask_overwrite(&mut self, _conflict: &Conflict) -> OverwriteRule {
        self.overwrite_calls += 1;
        self.overwrite_answers.pop_front().unwrap_or(OverwriteRule::No)
    }

    fn confirm_keep_incomplete(&mut self, _destination: &Path) -> bool {
        self.incomplete_calls += 1;
        self.keep_incomplete
    }
}

/// What a [`CountingVfs`] removed, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Unlink(PathBuf),
    Rmdir(PathBuf),
}

/// Host filesystem wrapper counting calls, able to fake a device boundary.
#[derive(Default)]
pub struct CountingVfs {
    pub inner: LocalVfs,
    /// Report every pair of paths as being on different filesystems.
    pub cross_device: bool,
    /// Fail every rename with "crosses devices".
    pub rename_crosses_devices: bool,
    /// Refuse to unlink entries with this name.
    pub fail_unlink: Option<&'static str>,

    pub renames: Cell<usize>,
    pub mknods: Cell<usize>,
    pub reads: Cell<usize>,
    pub writes: Cell<usize>,
    pub removals: RefCell<Vec<Removal>>,
}

impl CountingVfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cross_device() -> Self {
        Self {
            cross_device: true,
            ..Self::default()
        }
    }
}

impl Vfs for CountingVfs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stat(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.lstat(path)
    }

    fn open(&self, path: &Path, mode: OpenMode, perm: u32) -> io::Result<Box<dyn VfsFile>> {
        match mode {
            OpenMode::Read => self.reads.set(self.reads.get() + 1),
            OpenMode::Truncate | OpenMode::Append => self.writes.set(self.writes.get() + 1),
        }
        self.inner.open(path, mode, perm)
    }

    fn mkdir(&self, path: &Path, perm: u32) -> io::Result<()> {
        self.inner.mkdir(path, perm)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        self.inner.rmdir(path)?;
        self.removals
            .borrow_mut()
            .push(Removal::Rmdir(path.to_path_buf()));
        Ok(())
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        if self
            .fail_unlink
            .is_some_and(|name| path.file_name().is_some_and(|n| n == name))
        {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.unlink(path)?;
        self.removals
            .borrow_mut()
            .push(Removal::Unlink(path.to_path_buf()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.renames.set(self.renames.get() + 1);
        if self.cross_device || self.rename_crosses_devices {
            return Err(io::Error::from(io::ErrorKind::CrossesDevices));
        }
        self.inner.rename(from, to)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.inner.symlink(target, link)
    }

    fn readlink(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.readlink(path)
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> io::Result<()> {
        self.mknods.set(self.mknods.get() + 1);
        self.inner.mknod(path, mode, rdev)
    }

    fn chmod(&self, path: &Path, perm: u32) -> io::Result<()> {
        self.inner.chmod(path, perm)
    }

    fn chown(
        &self,
        path: &Path,
        uid: Option<u32>,
        gid: Option<u32>,
        follow: bool,
    ) -> io::Result<()> {
        self.inner.chown(path, uid, gid, follow)
    }

    fn utime(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()> {
        self.inner.utime(path, accessed, modified)
    }

    fn scandir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.scandir(path)
    }

    fn same_filesystem(&self, source: &Path, destination: &Path) -> bool {
        !self.cross_device && self.inner.same_filesystem(source, destination)
    }
}
