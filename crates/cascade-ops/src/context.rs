//! Per-invocation operation state.

use std::io;
use std::path::{Path, PathBuf};

use cascade_core::OperationConfig;
use tokio_util::sync::CancellationToken;

use crate::operation::{FsCall, OperationError};
use crate::outcome::{Outcome, UserSignal};
use crate::overwrite::OverwriteRule;
use crate::progress::{OperationComplete, OperationProgress, OperationType, SpeedTracker};
use crate::ui::OperationUi;

/// A source entry waiting for the deferred-unlink pass of a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    /// Path to remove.
    pub path: PathBuf,
    /// Remove with rmdir instead of unlink.
    pub is_dir: bool,
}

/// Everything one operation carries from start to finish.
///
/// The abort flag is a [`CancellationToken`] so it can be tripped from
/// outside the walk. Once set it is never cleared. The skip flag is
/// consumed by the first [`checkpoint`](Self::checkpoint) that sees it.
pub struct OperationContext<'ui> {
    ui: &'ui mut dyn OperationUi,
    config: OperationConfig,
    operation_type: OperationType,
    abort: CancellationToken,
    skip: bool,
    prefix: PathBuf,
    pending_deletes: Vec<PendingDelete>,
    overwrite_rule: Option<OverwriteRule>,
    progress: OperationProgress,
    speed: SpeedTracker,
    skipped: u64,
}

impl<'ui> OperationContext<'ui> {
    /// Create a context with unknown totals.
    pub fn new(
        ui: &'ui mut dyn OperationUi,
        config: OperationConfig,
        operation_type: OperationType,
        abort: CancellationToken,
    ) -> Self {
        let speed = SpeedTracker::new(config.progress_interval);
        Self {
            ui,
            config,
            operation_type,
            abort,
            skip: false,
            prefix: PathBuf::new(),
            pending_deletes: Vec::new(),
            overwrite_rule: None,
            progress: OperationProgress::new(operation_type, 0, 0),
            speed,
            skipped: 0,
        }
    }

    /// Paths shown to the user are relative to `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Size the progress display.
    pub fn set_totals(&mut self, files: u64, bytes: u64) {
        self.progress.files_total = files;
        self.progress.bytes_total = bytes;
        self.ui.set_files(0, files);
        self.ui.set_total_bytes(0, bytes);
    }

    /// The front end.
    pub fn ui(&mut self) -> &mut dyn OperationUi {
        &mut *self.ui
    }

    /// Settings of this operation.
    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// The kind of operation running.
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Current counters.
    pub fn progress(&self) -> &OperationProgress {
        &self.progress
    }

    /// Whether the walk has to stop.
    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    /// Stop the walk at the next suspension point.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    /// The token backing the abort flag.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.abort
    }

    /// Abandon the current entry at the next suspension point.
    pub fn request_skip(&mut self) {
        self.skip = true;
    }

    /// Suspension point. Polls the front end, then reports a pending abort
    /// or skip. A reported skip is consumed.
    pub fn checkpoint(&mut self) -> Option<Outcome> {
        match self.ui.poll_signal() {
            Some(UserSignal::Abort) => self.abort(),
            Some(UserSignal::Skip) => self.skip = true,
            None => {}
        }

        if self.is_aborted() {
            Some(Outcome::Abort)
        } else if std::mem::take(&mut self.skip) {
            Some(Outcome::Skip)
        } else {
            None
        }
    }

    /// Run a filesystem call under the retry protocol.
    ///
    /// On failure the user is asked what to do. `Retry` repeats the exact
    /// call; any other answer is returned as the error outcome and recorded.
    pub fn attempt<T>(
        &mut self,
        call: FsCall,
        path: &Path,
        allow_ignore: bool,
        mut f: impl FnMut() -> io::Result<T>,
    ) -> Result<T, Outcome> {
        loop {
            let err = match f() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if self.is_aborted() {
                return Err(Outcome::Abort);
            }

            let error = OperationError::io(call, path, &err);
            let answer = self.ui.ask_retry(&error, allow_ignore);
            tracing::debug!(%error, %answer, "retry protocol");

            match answer.into_outcome() {
                None => continue,
                Some(outcome) => {
                    if outcome.is_abort() {
                        self.abort();
                    }
                    tracing::warn!(%error, "recorded error");
                    self.progress.add_error(error);
                    return Err(outcome);
                }
            }
        }
    }

    /// Report a logical failure through the retry protocol.
    ///
    /// Retrying repeats the question until the user gives up on the entry.
    pub fn fail(&mut self, call: FsCall, path: &Path, message: &str) -> Outcome {
        match self.attempt(call, path, true, || Err::<(), _>(io::Error::other(message.to_string()))) {
            Ok(()) => Outcome::Ok,
            Err(outcome) => outcome,
        }
    }

    /// `path` relative to the common prefix of the selection.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.prefix)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// A new entry is being processed.
    pub fn start_entry(&mut self, source: &Path, destination: Option<&Path>, size: u64) {
        self.progress.begin_file(source.to_path_buf(), size);
        let source = self.display_path(source);
        let destination = destination.map(|d| self.display_path(d));
        self.ui.set_current_file(&source, destination.as_deref());
        self.ui.set_file_bytes(0, size);
    }

    /// Bytes of the current file were written.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.progress.add_bytes(bytes);
        self.ui
            .set_file_bytes(self.progress.file_bytes_done, self.progress.file_bytes_total);
        self.ui
            .set_total_bytes(self.progress.bytes_done, self.progress.bytes_total);

        if self
            .speed
            .update(self.progress.bytes_copied, self.progress.bytes_remaining())
        {
            let speed = self.speed.speed_text();
            let eta = self.speed.eta_text();
            self.ui.set_speed(&speed);
            self.ui.set_eta(&eta);
        }
    }

    /// The current entry is done, whatever happened to it.
    pub fn finish_entry(&mut self, size: u64) {
        self.progress.complete_file(size);
        self.push_totals();
    }

    /// A whole subtree is done in one step.
    pub fn complete_subtree(&mut self, files: u64, bytes: u64) {
        self.progress.complete_many(files, bytes);
        self.push_totals();
    }

    fn push_totals(&mut self) {
        self.ui
            .set_files(self.progress.files_done, self.progress.files_total);
        self.ui
            .set_total_bytes(self.progress.bytes_done, self.progress.bytes_total);
    }

    /// Count a skipped or ignored entry.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Queue a move source for the deferred-unlink pass.
    pub fn queue_delete(&mut self, path: PathBuf, is_dir: bool) {
        tracing::debug!(path = %path.display(), is_dir, "queued for deletion");
        self.pending_deletes.push(PendingDelete { path, is_dir });
    }

    /// Entries queued so far, in queue order.
    pub fn pending_deletes(&self) -> &[PendingDelete] {
        &self.pending_deletes
    }

    /// Drain the deferred-unlink queue.
    pub fn take_pending_deletes(&mut self) -> Vec<PendingDelete> {
        std::mem::take(&mut self.pending_deletes)
    }

    /// The remembered overwrite rule.
    pub fn overwrite_rule(&self) -> Option<OverwriteRule> {
        self.overwrite_rule
    }

    /// Remember an overwrite rule for every later conflict.
    pub fn set_overwrite_rule(&mut self, rule: OverwriteRule) {
        self.overwrite_rule = Some(rule);
    }

    /// Finish the operation and produce its summary.
    pub fn into_complete(self, aborted: bool) -> OperationComplete {
        OperationComplete {
            operation_type: self.operation_type,
            files_processed: self.progress.files_done,
            bytes_processed: self.progress.bytes_done,
            skipped: self.skipped,
            aborted: aborted || self.abort.is_cancelled(),
            errors: self.progress.errors,
            elapsed: self.speed.elapsed(),
        }
    }
}
