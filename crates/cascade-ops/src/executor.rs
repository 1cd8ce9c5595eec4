//! High-level operation executor with unified result handling.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use cascade_core::{
    EntryName, Listing, ListingError, LocalVfs, OperationConfig, Vfs, is_pseudo_entry,
};
use cascade_scan::Prescanner;
use tokio_util::sync::CancellationToken;

use crate::context::OperationContext;
use crate::error::EngineError;
use crate::operation::FileOperation;
use crate::operators::{Chmod, ChmodSpec, Chown, Delete};
use crate::overwrite::OverwriteRule;
use crate::progress::{OperationComplete, OperationType};
use crate::transfer::{TransferEngine, TransferMode};
use crate::ui::OperationUi;
use crate::walk::{OperateExecutor, Operator};

/// How many listed entries pass between two prescan progress updates.
const PRESCAN_REPORT_EVERY: u64 = 128;

/// Entries named relative to one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    base: PathBuf,
    names: Vec<EntryName>,
}

impl Selection {
    /// Select `names` inside `base`.
    pub fn new(base: impl Into<PathBuf>, names: Vec<EntryName>) -> Result<Self, EngineError> {
        let base = base.into();
        if names.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        for name in &names {
            if name.is_empty() || name.as_str().split('/').any(is_pseudo_entry) {
                return Err(EngineError::PseudoEntry {
                    path: base.join(name.as_os_str()),
                });
            }
        }
        Ok(Self { base, names })
    }

    /// Select arbitrary paths. The base becomes their deepest common
    /// ancestor directory.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, EngineError> {
        let mut absolute = Vec::with_capacity(paths.len());
        for path in paths {
            if path.file_name().is_none() {
                return Err(EngineError::PseudoEntry { path: path.clone() });
            }
            let path = std::path::absolute(path).map_err(|source| EngineError::SourceUnavailable {
                path: path.clone(),
                source,
            })?;
            absolute.push(path);
        }

        let Some(first) = absolute.first() else {
            return Err(EngineError::EmptySelection);
        };
        let mut base = first.parent().map(Path::to_path_buf).unwrap_or_default();
        for path in &absolute[1..] {
            let parent = path.parent().unwrap_or(Path::new(""));
            while !parent.starts_with(&base) {
                if !base.pop() {
                    break;
                }
            }
        }

        let names = absolute
            .iter()
            .map(|path| {
                path.strip_prefix(&base)
                    .map(|rel| EntryName::from_os(rel.as_os_str().to_os_string()))
                    .map_err(|_| EngineError::PseudoEntry { path: path.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(base, names)
    }

    /// Directory the names are relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Selected names, in selection order.
    pub fn names(&self) -> &[EntryName] {
        &self.names
    }

    /// Number of selected entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is selected. Never true for a constructed selection.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Full paths of the selected entries.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.names.iter().map(|name| self.base.join(name.as_os_str()))
    }
}

/// The final component of a selected name.
fn leaf_name(name: &EntryName) -> &OsStr {
    Path::new(name.as_os_str())
        .file_name()
        .unwrap_or(name.as_os_str())
}

/// What is known about a selection before the walk.
enum Plan {
    /// Fully prescanned.
    Listed(Listing),
    /// Totals known without a listing.
    Measured { files: u64, bytes: u64 },
    /// Directories are listed as they are visited.
    Lazy,
    /// The prescan was cancelled.
    Interrupted,
}

impl Plan {
    fn listing(&self) -> Option<&Listing> {
        match self {
            Self::Listed(listing) => Some(listing),
            _ => None,
        }
    }

    /// Files and bytes for the progress display. The generic walk counts
    /// directories too; transfers only count what they write.
    fn totals(&self, count_dirs: bool) -> (u64, u64) {
        match self {
            Self::Listed(listing) if count_dirs => {
                (listing.totals.entry_count(), listing.totals.byte_count)
            }
            Self::Listed(listing) => (listing.totals.file_count, listing.totals.byte_count),
            Self::Measured { files, bytes } => (*files, *bytes),
            Self::Lazy | Self::Interrupted => (0, 0),
        }
    }
}

/// Executor for file operations with unified interface.
pub struct OperationExecutor<V: Vfs = LocalVfs> {
    vfs: V,
    config: OperationConfig,
    /// Rule used for every conflict instead of asking.
    default_rule: Option<OverwriteRule>,
    cancel: CancellationToken,
}

impl OperationExecutor<LocalVfs> {
    /// Executor on the host filesystem with default settings.
    pub fn local() -> Self {
        Self::new(LocalVfs, OperationConfig::default())
    }
}

impl<V: Vfs> OperationExecutor<V> {
    /// Create an executor over `vfs`.
    pub fn new(vfs: V, config: OperationConfig) -> Self {
        Self {
            vfs,
            config,
            default_rule: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the default conflict resolution.
    pub fn with_resolution(mut self, rule: OverwriteRule) -> Self {
        self.default_rule = Some(rule);
        self
    }

    /// Share an abort flag with the caller.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts the running operation when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Settings in effect.
    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// The filesystem backend.
    pub fn vfs(&self) -> &V {
        &self.vfs
    }

    /// Execute any operation.
    pub fn execute(
        &self,
        ui: &mut dyn OperationUi,
        operation: &FileOperation,
    ) -> Result<OperationComplete, EngineError> {
        match operation {
            FileOperation::Copy {
                sources,
                destination,
            } => self.copy(ui, sources, destination),
            FileOperation::Move {
                sources,
                destination,
            } => self.move_to(ui, sources, destination),
            FileOperation::Delete { targets } => self.delete(ui, targets),
            FileOperation::Chmod {
                targets,
                spec,
                recursive,
            } => self.chmod(ui, targets, *spec, *recursive),
            FileOperation::Chown {
                targets,
                uid,
                gid,
                recursive,
            } => self.chown(ui, targets, *uid, *gid, *recursive),
        }
    }

    /// Copy `sources` to `destination`.
    pub fn copy(
        &self,
        ui: &mut dyn OperationUi,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<OperationComplete, EngineError> {
        self.transfer(ui, TransferMode::Copy, sources, destination)
    }

    /// Move `sources` to `destination`.
    pub fn move_to(
        &self,
        ui: &mut dyn OperationUi,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<OperationComplete, EngineError> {
        self.transfer(ui, TransferMode::Move, sources, destination)
    }

    /// Delete `targets` recursively.
    pub fn delete(
        &self,
        ui: &mut dyn OperationUi,
        targets: &[PathBuf],
    ) -> Result<OperationComplete, EngineError> {
        self.operate(ui, OperationType::Delete, &mut Delete, targets, true, false)
    }

    /// Change permission bits of `targets`.
    pub fn chmod(
        &self,
        ui: &mut dyn OperationUi,
        targets: &[PathBuf],
        spec: ChmodSpec,
        recursive: bool,
    ) -> Result<OperationComplete, EngineError> {
        self.operate(
            ui,
            OperationType::Chmod,
            &mut Chmod::new(spec),
            targets,
            recursive,
            true,
        )
    }

    /// Change owner and/or group of `targets`.
    pub fn chown(
        &self,
        ui: &mut dyn OperationUi,
        targets: &[PathBuf],
        uid: Option<u32>,
        gid: Option<u32>,
        recursive: bool,
    ) -> Result<OperationComplete, EngineError> {
        self.operate(
            ui,
            OperationType::Chown,
            &mut Chown::new(uid, gid),
            targets,
            recursive,
            false,
        )
    }

    fn transfer(
        &self,
        ui: &mut dyn OperationUi,
        mode: TransferMode,
        sources: &[PathBuf],
        destination: &Path,
    ) -> Result<OperationComplete, EngineError> {
        let selection = Selection::from_paths(sources)?;
        let destination = std::path::absolute(destination).map_err(|_| {
            EngineError::DestinationMissing {
                path: destination.to_path_buf(),
            }
        })?;
        let targets = self.resolve_targets(&selection, &destination)?;

        let follow = mode == TransferMode::Copy && self.config.follow_symlinks;
        let plan = self.plan(ui, &selection, true, follow)?;

        let operation_type = match mode {
            TransferMode::Copy => OperationType::Copy,
            TransferMode::Move => OperationType::Move,
        };
        let mut ctx = self.context(ui, operation_type, &selection);
        if matches!(plan, Plan::Interrupted) {
            return Ok(ctx.into_complete(true));
        }

        let (files, bytes) = plan.totals(false);
        ctx.set_totals(files, bytes);
        tracing::info!(
            operation = %operation_type,
            entries = selection.len(),
            files,
            bytes,
            destination = %destination.display(),
            "starting"
        );

        let outcome = TransferEngine::new(&self.vfs, mode)
            .with_listing(plan.listing())
            .run(&mut ctx, selection.base(), selection.names(), &targets);

        Ok(self.finish(ctx, outcome.is_abort()))
    }

    fn operate(
        &self,
        ui: &mut dyn OperationUi,
        operation_type: OperationType,
        operator: &mut dyn Operator,
        targets: &[PathBuf],
        recursive: bool,
        follow_links: bool,
    ) -> Result<OperationComplete, EngineError> {
        let selection = Selection::from_paths(targets)?;
        let plan = self.plan(ui, &selection, recursive, follow_links)?;

        let mut ctx = self.context(ui, operation_type, &selection);
        if matches!(plan, Plan::Interrupted) {
            return Ok(ctx.into_complete(true));
        }

        let (files, bytes) = plan.totals(true);
        ctx.set_totals(files, bytes);
        tracing::info!(
            operation = %operation_type,
            entries = selection.len(),
            files,
            recursive,
            "starting"
        );

        let outcome = OperateExecutor::new(&self.vfs)
            .with_listing(plan.listing())
            .recursive(recursive)
            .follow_links(follow_links)
            .run(&mut ctx, operator, selection.base(), selection.names());

        Ok(self.finish(ctx, outcome.is_abort()))
    }

    fn context<'ui>(
        &self,
        ui: &'ui mut dyn OperationUi,
        operation_type: OperationType,
        selection: &Selection,
    ) -> OperationContext<'ui> {
        let mut ctx = OperationContext::new(
            ui,
            self.config.clone(),
            operation_type,
            self.cancel.clone(),
        )
        .with_prefix(selection.base());
        if let Some(rule) = self.default_rule {
            ctx.set_overwrite_rule(rule);
        }
        ctx
    }

    fn finish(&self, ctx: OperationContext<'_>, aborted: bool) -> OperationComplete {
        let complete = ctx.into_complete(aborted);
        if complete.errors.is_empty() {
            tracing::info!(summary = %complete.summary(), "finished");
        } else {
            tracing::warn!(
                summary = %complete.summary(),
                errors = complete.errors.len(),
                "finished with errors"
            );
        }
        complete
    }

    /// Check the base directory and measure the selection.
    ///
    /// A failed prescan is not fatal: the walk then lists directories on
    /// demand and progress has no totals.
    fn plan(
        &self,
        ui: &mut dyn OperationUi,
        selection: &Selection,
        recursive: bool,
        follow_symlinks: bool,
    ) -> Result<Plan, EngineError> {
        let base = selection.base();
        let base_stat = self
            .vfs
            .stat(base)
            .map_err(|err| ListingError::io(base, err))?;
        if !base_stat.kind.is_dir() {
            return Err(ListingError::InvalidBase {
                path: base.to_path_buf(),
            }
            .into());
        }

        if !recursive {
            return Ok(Plan::Measured {
                files: selection.len() as u64,
                bytes: 0,
            });
        }
        if !self.config.prescan {
            return Ok(Plan::Lazy);
        }

        if let [name] = selection.names() {
            let path = base.join(name.as_os_str());
            if let Ok(stat) = self.vfs.lstat(&path) {
                if !stat.kind.is_dir() {
                    let bytes = if stat.kind.counts_bytes() { stat.size } else { 0 };
                    return Ok(Plan::Measured { files: 1, bytes });
                }
            }
        }

        let scanned = Prescanner::new(&self.vfs)
            .follow_symlinks(follow_symlinks)
            .with_cancellation(self.cancel.clone())
            .on_progress(PRESCAN_REPORT_EVERY, |progress| {
                ui.set_current_file(&progress.current_path.display().to_string(), None);
                ui.set_files(progress.total_items(), 0);
            })
            .scan(base, selection.names());

        match scanned {
            Ok(listing) => Ok(Plan::Listed(listing)),
            Err(ListingError::Interrupted) => Ok(Plan::Interrupted),
            Err(err @ ListingError::InvalidBase { .. }) => Err(err.into()),
            Err(err) => {
                tracing::warn!(%err, "prescan failed, listing directories on demand");
                Ok(Plan::Lazy)
            }
        }
    }

    /// Destination path of every selected entry.
    fn resolve_targets(
        &self,
        selection: &Selection,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, EngineError> {
        match self.vfs.stat(destination) {
            Ok(stat) if stat.kind.is_dir() => Ok(selection
                .names()
                .iter()
                .map(|name| destination.join(leaf_name(name)))
                .collect()),
            Ok(_) | Err(_) if selection.len() > 1 => Err(EngineError::DestinationNotDirectory {
                path: destination.to_path_buf(),
            }),
            _ => {
                let parent = destination
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                match self.vfs.stat(parent) {
                    Ok(stat) if stat.kind.is_dir() => Ok(vec![destination.to_path_buf()]),
                    _ => Err(EngineError::DestinationMissing {
                        path: parent.to_path_buf(),
                    }),
                }
            }
        }
    }
}
