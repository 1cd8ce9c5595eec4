//! Recursive listing prescan.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use cascade_core::{
    EntryKind, EntryName, FileStat, Listing, ListingError, ListingNode, ListingTotals, Vfs,
};

use crate::progress::{ProgressTracker, ScanProgress};

/// How many entries are listed between two progress callbacks.
const DEFAULT_REPORT_EVERY: u64 = 256;

type ProgressCallback<'a> = Box<dyn FnMut(&ScanProgress) + 'a>;

/// Builds a [`Listing`] of a selection before an operation runs.
///
/// The prescan is all-or-nothing: the first stat or scandir failure aborts
/// it and the caller is expected to fall back to listing directories lazily.
pub struct Prescanner<'a, V: Vfs> {
    vfs: &'a V,
    follow_symlinks: bool,
    cancel: Option<CancellationToken>,
    on_progress: Option<ProgressCallback<'a>>,
    report_every: u64,
}

impl<'a, V: Vfs> Prescanner<'a, V> {
    /// Create a prescanner over the given backend.
    pub fn new(vfs: &'a V) -> Self {
        Self {
            vfs,
            follow_symlinks: false,
            cancel: None,
            on_progress: None,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }

    /// Size symlinks by their targets instead of the links themselves.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Stop with [`ListingError::Interrupted`] once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Receive a progress snapshot every `every` entries.
    pub fn on_progress(mut self, every: u64, callback: impl FnMut(&ScanProgress) + 'a) -> Self {
        self.report_every = every.max(1);
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Prescan `names` relative to `base`.
    pub fn scan(&mut self, base: &Path, names: &[EntryName]) -> Result<Listing, ListingError> {
        let base_stat = self
            .vfs
            .stat(base)
            .map_err(|e| ListingError::io(base, e))?;
        if !base_stat.kind.is_dir() {
            return Err(ListingError::InvalidBase {
                path: base.to_path_buf(),
            });
        }

        let mut tracker = ProgressTracker::new();
        let mut totals = ListingTotals::new();
        let mut roots = Vec::with_capacity(names.len());

        for name in names {
            let path = base.join(name.as_os_str());
            let stat = self
                .vfs
                .lstat(&path)
                .map_err(|e| ListingError::io(&path, e))?;
            let node = self.scan_entry(&path, name.clone(), stat.kind, &stat, &mut tracker, &mut totals)?;
            roots.push(node);
        }

        let elapsed = tracker.elapsed();
        tracing::debug!(
            files = totals.file_count,
            dirs = totals.dir_count,
            bytes = totals.byte_count,
            ?elapsed,
            "prescan complete"
        );

        Ok(Listing::new(base.to_path_buf(), roots, totals, elapsed))
    }

    fn scan_entry(
        &mut self,
        path: &Path,
        name: EntryName,
        kind: EntryKind,
        stat: &FileStat,
        tracker: &mut ProgressTracker,
        totals: &mut ListingTotals,
    ) -> Result<ListingNode, ListingError> {
        self.check_cancelled()?;
        tracker.set_current_path(path);

        if !kind.is_dir() {
            let size = self.leaf_size(path, kind, stat);
            totals.record_leaf(kind, size);
            tracker.record_file(if kind.counts_bytes() { size } else { 0 });
            self.report(tracker);
            return Ok(ListingNode::leaf(name, kind, size));
        }

        totals.record_dir();
        tracker.record_dir();
        self.report(tracker);

        let entries = self
            .vfs
            .scandir(path)
            .map_err(|e| ListingError::io(path, e))?;

        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let child_path = path.join(entry.name.as_os_str());
            let child_stat = self
                .vfs
                .lstat(&child_path)
                .map_err(|e| ListingError::io(&child_path, e))?;
            let child = self.scan_entry(
                &child_path,
                entry.name,
                entry.kind,
                &child_stat,
                tracker,
                totals,
            )?;
            children.push(child);
        }

        Ok(ListingNode::directory(name, children))
    }

    /// Size used for progress. Broken links keep their own size.
    fn leaf_size(&self, path: &Path, kind: EntryKind, stat: &FileStat) -> u64 {
        if self.follow_symlinks && kind.is_symlink() {
            if let Ok(target) = self.vfs.stat(path) {
                if !target.kind.is_dir() {
                    return target.size;
                }
            }
        }
        stat.size
    }

    fn check_cancelled(&self) -> Result<(), ListingError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ListingError::Interrupted),
            _ => Ok(()),
        }
    }

    fn report(&mut self, tracker: &ProgressTracker) {
        if let Some(callback) = self.on_progress.as_mut() {
            if tracker.total_items() % self.report_every == 0 {
                callback(&tracker.snapshot());
            }
        }
    }
}

/// Prescan `names` relative to `base` with default settings.
pub fn prescan<V: Vfs>(vfs: &V, base: &Path, names: &[EntryName]) -> Result<Listing, ListingError> {
    Prescanner::new(vfs).scan(base, names)
}
