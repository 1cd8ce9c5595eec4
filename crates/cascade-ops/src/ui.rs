//! The front end an operation talks to.
//!
//! The engine never draws anything itself. It pushes progress into a
//! [`ProgressSurface`] and asks an [`OperationUi`] whenever a decision is
//! needed. [`UnattendedUi`] answers every question from fixed presets.

use std::path::Path;

use crate::operation::OperationError;
use crate::outcome::{DialogAnswer, UserSignal};
use crate::overwrite::{Conflict, OverwriteRule};

/// Passive progress display.
pub trait ProgressSurface {
    /// Source (and destination, for transfers) of the current entry.
    fn set_current_file(&mut self, _source: &str, _destination: Option<&str>) {}

    /// Bytes of the current file.
    fn set_file_bytes(&mut self, _done: u64, _total: u64) {}

    /// Bytes of the whole operation. `total` is 0 when unknown.
    fn set_total_bytes(&mut self, _done: u64, _total: u64) {}

    /// Entries of the whole operation. `total` is 0 when unknown.
    fn set_files(&mut self, _done: u64, _total: u64) {}

    /// Formatted transfer rate.
    fn set_speed(&mut self, _speed: &str) {}

    /// Formatted remaining time.
    fn set_eta(&mut self, _eta: &str) {}

    /// A pending skip or abort request, if the user made one.
    fn poll_signal(&mut self) -> Option<UserSignal> {
        None
    }
}

/// Progress display plus the questions an operation can ask.
pub trait OperationUi: ProgressSurface {
    /// A call failed. `allow_ignore` is false where ignoring makes no sense.
    fn ask_retry(&mut self, error: &OperationError, allow_ignore: bool) -> DialogAnswer;

    /// The destination already exists.
    fn ask_overwrite(&mut self, conflict: &Conflict) -> OverwriteRule;

    /// A transfer stopped halfway. Returns true to keep the partial file.
    fn confirm_keep_incomplete(&mut self, destination: &Path) -> bool;
}

/// Answers every question the same way, for batch use and tests.
#[derive(Debug, Clone, Copy)]
pub struct UnattendedUi {
    /// Answer to failed calls. `Retry` would loop forever and is turned into `Skip`.
    pub on_error: DialogAnswer,
    /// Answer to "file exists".
    pub on_conflict: OverwriteRule,
    /// Whether partial files are kept.
    pub keep_incomplete: bool,
}

impl Default for UnattendedUi {
    fn default() -> Self {
        Self {
            on_error: DialogAnswer::Skip,
            on_conflict: OverwriteRule::None,
            keep_incomplete: false,
        }
    }
}

impl UnattendedUi {
    /// Overwrite every conflict.
    pub fn overwrite_all() -> Self {
        Self {
            on_conflict: OverwriteRule::All,
            ..Self::default()
        }
    }
}

impl ProgressSurface for UnattendedUi {}

impl OperationUi for UnattendedUi {
    fn ask_retry(&mut self, error: &OperationError, allow_ignore: bool) -> DialogAnswer {
        tracing::warn!(%error, "unattended error answer: {}", self.on_error);
        match self.on_error {
            DialogAnswer::Retry => DialogAnswer::Skip,
            DialogAnswer::Ignore if !allow_ignore => DialogAnswer::Skip,
            answer => answer,
        }
    }

    fn ask_overwrite(&mut self, _conflict: &Conflict) -> OverwriteRule {
        self.on_conflict
    }

    fn confirm_keep_incomplete(&mut self, _destination: &Path) -> bool {
        self.keep_incomplete
    }
}
