//! Prescan progress reporting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Progress information during a prescan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of non-directory entries listed so far.
    pub files_scanned: u64,
    /// Number of directories listed so far.
    pub dirs_scanned: u64,
    /// Total bytes counted so far.
    pub bytes_scanned: u64,
    /// Path most recently visited.
    pub current_path: PathBuf,
    /// Time elapsed since the prescan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_items() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_scanned: u64,
    dirs_scanned: u64,
    bytes_scanned: u64,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.files_scanned += 1;
        self.bytes_scanned += size;
    }

    pub fn record_dir(&mut self) {
        self.dirs_scanned += 1;
    }

    pub fn set_current_path(&mut self, path: &Path) {
        self.current_path.clear();
        self.current_path.push(path);
    }

    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned,
            dirs_scanned: self.dirs_scanned,
            bytes_scanned: self.bytes_scanned,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let mut tracker = ProgressTracker::new();
        tracker.record_dir();
        tracker.record_file(10);
        tracker.record_file(5);
        tracker.set_current_path(Path::new("/a/b"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.files_scanned, 2);
        assert_eq!(snapshot.dirs_scanned, 1);
        assert_eq!(snapshot.bytes_scanned, 15);
        assert_eq!(snapshot.total_items(), 3);
        assert_eq!(snapshot.current_path, PathBuf::from("/a/b"));
    }

    #[test]
    fn test_rate_with_zero_elapsed() {
        let progress = ScanProgress::new();
        assert_eq!(progress.entries_per_second(), 0.0);
    }
}
