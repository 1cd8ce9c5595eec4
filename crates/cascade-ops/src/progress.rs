//! Progress reporting types for file operations.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};

use crate::OperationError;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
    Chmod,
    Chown,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Delete => write!(f, "Delete"),
            Self::Chmod => write!(f, "Change mode"),
            Self::Chown => write!(f, "Change owner"),
        }
    }
}

/// Progress information for an ongoing operation.
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of entries completed.
    pub files_done: u64,
    /// Total number of entries (0 if unknown).
    pub files_total: u64,
    /// Bytes accounted for so far, skipped bytes included.
    pub bytes_done: u64,
    /// Total bytes to process (0 if unknown).
    pub bytes_total: u64,
    /// Bytes actually written; the speed is computed from this.
    pub bytes_copied: u64,
    /// Bytes of the current file written so far.
    pub file_bytes_done: u64,
    /// Size of the current file.
    pub file_bytes_total: u64,
    /// The file currently being processed.
    pub current_file: Option<PathBuf>,
    /// Errors encountered so far.
    pub errors: Vec<OperationError>,
}

impl OperationProgress {
    /// Create a new progress tracker for an operation.
    pub fn new(operation_type: OperationType, files_total: u64, bytes_total: u64) -> Self {
        Self {
            operation_type,
            files_done: 0,
            files_total,
            bytes_done: 0,
            bytes_total,
            bytes_copied: 0,
            file_bytes_done: 0,
            file_bytes_total: 0,
            current_file: None,
            errors: Vec::new(),
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total > 0 {
            (self.bytes_done as f64 / self.bytes_total as f64) * 100.0
        } else if self.files_total > 0 {
            (self.files_done as f64 / self.files_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Whether totals were measured up front.
    pub fn is_sized(&self) -> bool {
        self.files_total > 0
    }

    /// Bytes still to go, if the total is known.
    pub fn bytes_remaining(&self) -> Option<u64> {
        (self.bytes_total > 0).then(|| self.bytes_total.saturating_sub(self.bytes_done))
    }

    /// Check if the operation has any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Add an error to the progress.
    pub fn add_error(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    /// Start a new current file.
    pub fn begin_file(&mut self, path: PathBuf, size: u64) {
        self.current_file = Some(path);
        self.file_bytes_done = 0;
        self.file_bytes_total = size;
    }

    /// Account for freshly written bytes.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.file_bytes_done += bytes;
        self.bytes_done += bytes;
        self.bytes_copied += bytes;
    }

    /// Count one finished entry. Bytes of the entry not yet written are
    /// accounted for too, so a skipped file still moves the byte bar.
    pub fn complete_file(&mut self, size: u64) {
        let remaining = size.saturating_sub(self.file_bytes_done);
        self.bytes_done += remaining;
        self.file_bytes_done = 0;
        self.file_bytes_total = 0;
        self.files_done += 1;
    }

    /// Count a whole subtree as done in one step.
    pub fn complete_many(&mut self, files: u64, bytes: u64) {
        self.files_done += files;
        self.bytes_done += bytes;
    }
}

/// Result of a completed operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of entries processed.
    pub files_processed: u64,
    /// Bytes accounted for.
    pub bytes_processed: u64,
    /// Number of entries skipped or ignored.
    pub skipped: u64,
    /// Whether the operation was aborted.
    pub aborted: bool,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
    /// Wall time of the operation.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl OperationComplete {
    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.skipped == 0 && self.errors.is_empty()
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Delete => "Deleted",
            OperationType::Chmod => "Changed mode of",
            OperationType::Chown => "Changed owner of",
        };

        let mut summary = format!(
            "{} {} items ({})",
            action,
            self.files_processed,
            format_size(self.bytes_processed, BINARY)
        );
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {} errors", self.errors.len()));
        }
        if self.aborted {
            summary.push_str(", aborted");
        }
        summary
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Time-gated transfer rate and remaining-time estimate.
#[derive(Debug, Clone)]
pub struct SpeedTracker {
    interval: Duration,
    started: Instant,
    last_update: Instant,
    last_bytes: u64,
    bytes_per_second: f64,
    eta: Option<Duration>,
}

impl SpeedTracker {
    /// Start tracking now.
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    /// Start tracking at a given instant.
    pub fn starting_at(started: Instant, interval: Duration) -> Self {
        Self {
            interval,
            started,
            last_update: started,
            last_bytes: 0,
            bytes_per_second: 0.0,
            eta: None,
        }
    }

    /// Recompute if the interval has elapsed. Returns whether anything changed.
    pub fn update(&mut self, bytes_copied: u64, remaining: Option<u64>) -> bool {
        self.update_at(Instant::now(), bytes_copied, remaining)
    }

    /// Same as [`update`](Self::update) with an explicit clock reading.
    ///
    /// The rate is the delta since the previous recomputation; the estimate
    /// uses the average rate since the start.
    pub fn update_at(&mut self, now: Instant, bytes_copied: u64, remaining: Option<u64>) -> bool {
        let since_last = now.saturating_duration_since(self.last_update);
        if since_last < self.interval || since_last.is_zero() {
            return false;
        }

        let delta = bytes_copied.saturating_sub(self.last_bytes);
        self.bytes_per_second = delta as f64 / since_last.as_secs_f64();
        self.last_update = now;
        self.last_bytes = bytes_copied;

        let total_secs = now.saturating_duration_since(self.started).as_secs_f64();
        let average = if total_secs > 0.0 {
            bytes_copied as f64 / total_secs
        } else {
            0.0
        };
        self.eta = match remaining {
            Some(left) if average > 0.0 => Some(Duration::from_secs_f64(left as f64 / average)),
            _ => None,
        };

        true
    }

    /// Latest instantaneous rate.
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_second
    }

    /// Latest remaining-time estimate.
    pub fn eta(&self) -> Option<Duration> {
        self.eta
    }

    /// Time since tracking started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Rate formatted like "12.5 MiB/s".
    pub fn speed_text(&self) -> String {
        format!("{}/s", format_size(self.bytes_per_second as u64, BINARY))
    }

    /// Estimate formatted as "H:MM:SS", or "--:--" when unknown.
    pub fn eta_text(&self) -> String {
        match self.eta {
            Some(eta) => format_hms(eta),
            None => "--:--".to_string(),
        }
    }
}

fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
