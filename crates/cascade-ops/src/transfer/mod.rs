//! Copy and move.
//!
//! Both share one recursive walk. A move first tries to rename each entry
//! in place; when that is not possible it copies and queues the source for
//! the deferred-unlink pass, which only runs once the whole walk completed
//! without abort.

mod deferred;
mod dir;
mod file;

use std::io;
use std::path::{Path, PathBuf};

use cascade_core::{EntryName, FileStat, Listing, ListingNode, Vfs};

use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;
use crate::overwrite::{Conflict, Resolution};
use crate::walk::root_node;

/// Whether sources survive the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

/// Result of transferring one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transferred {
    outcome: Outcome,
    /// The source must stay where it is, so its parent must too.
    source_kept: bool,
}

impl Transferred {
    fn done() -> Self {
        Self {
            outcome: Outcome::Ok,
            source_kept: false,
        }
    }

    fn kept(outcome: Outcome) -> Self {
        Self {
            outcome,
            source_kept: true,
        }
    }
}

impl From<Outcome> for Transferred {
    fn from(outcome: Outcome) -> Self {
        if outcome.is_ok() {
            Self::done()
        } else {
            Self::kept(outcome)
        }
    }
}

/// What to do with the destination path.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// Nothing is there.
    Fresh,
    /// Replace what is there.
    Overwrite(FileStat),
    /// Write after the existing bytes.
    Append,
}

/// Copies or moves a selection.
pub struct TransferEngine<'a> {
    vfs: &'a dyn Vfs,
    mode: TransferMode,
    listing: Option<&'a Listing>,
}

impl<'a> TransferEngine<'a> {
    /// Create an engine that lists directories on demand.
    pub fn new(vfs: &'a dyn Vfs, mode: TransferMode) -> Self {
        Self {
            vfs,
            mode,
            listing: None,
        }
    }

    /// Take children from a prescanned listing instead of scanning.
    pub fn with_listing(mut self, listing: Option<&'a Listing>) -> Self {
        self.listing = listing;
        self
    }

    fn is_move(&self) -> bool {
        self.mode == TransferMode::Move
    }

    /// Transfer `names` under `base` to the matching `targets`, then run the
    /// deferred-unlink pass of a move.
    pub fn run(
        &self,
        ctx: &mut OperationContext<'_>,
        base: &Path,
        names: &[EntryName],
        targets: &[PathBuf],
    ) -> Outcome {
        let outcome = self.walk(ctx, base, names, targets);
        if outcome.is_abort() {
            tracing::info!(
                pending = ctx.pending_deletes().len(),
                "transfer aborted, sources left in place"
            );
            return Outcome::Abort;
        }
        if self.is_move() {
            return self.unlink_pending(ctx);
        }
        outcome
    }

    /// Transfer `names` under `base` to the matching `targets` without the
    /// deferred-unlink pass.
    pub fn walk(
        &self,
        ctx: &mut OperationContext<'_>,
        base: &Path,
        names: &[EntryName],
        targets: &[PathBuf],
    ) -> Outcome {
        for (index, (name, target)) in names.iter().zip(targets).enumerate() {
            let node = root_node(self.listing, index, name);
            let source = base.join(name.as_os_str());

            let result = match ctx.checkpoint() {
                Some(Outcome::Abort) => return Outcome::Abort,
                Some(outcome) => {
                    skip_subtree(ctx, node);
                    Transferred::kept(outcome)
                }
                None => self.transfer_entry(ctx, &source, target, node),
            };

            if result.outcome.is_abort() {
                return Outcome::Abort;
            }
            if result.outcome.is_ignored() {
                ctx.record_skip();
            }
        }
        Outcome::Ok
    }

    /// Copy or move a single entry from `source` to `destination`.
    pub fn copy_or_move(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
    ) -> Outcome {
        self.transfer_entry(ctx, source, destination, None).outcome
    }

    fn transfer_entry(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        node: Option<&ListingNode>,
    ) -> Transferred {
        let vfs = self.vfs;
        let stat = match ctx.attempt(FsCall::Stat, source, true, || vfs.lstat(source)) {
            Ok(stat) => stat,
            Err(outcome) => {
                if !outcome.is_abort() {
                    skip_subtree(ctx, node);
                }
                return Transferred::kept(outcome);
            }
        };

        if stat.kind.is_dir() {
            return self.copy_dir(ctx, source, destination, &stat, node);
        }

        if stat.kind.is_symlink() && !self.is_move() && ctx.config().follow_symlinks {
            if let Ok(target) = vfs.stat(source) {
                if !target.kind.is_dir() {
                    return self.copy_file(ctx, source, destination, &target);
                }
            }
        }

        self.copy_file(ctx, source, destination, &stat)
    }

    /// Decide what happens to an existing destination. `Err` carries the
    /// outcome for an entry that must not be written.
    fn prepare_target(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        source_stat: &FileStat,
    ) -> Result<Target, Outcome> {
        let vfs = self.vfs;
        let existing = ctx.attempt(FsCall::Stat, destination, true, || {
            match vfs.lstat(destination) {
                Ok(stat) => Ok(Some(stat)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            }
        })?;

        let Some(destination_stat) = existing else {
            return Ok(Target::Fresh);
        };

        if destination_stat.same_file(source_stat) {
            return Err(ctx.fail(
                FsCall::Copy,
                source,
                "source and destination are the same file",
            ));
        }

        let rule = match ctx.overwrite_rule() {
            Some(rule) => rule,
            None => {
                let conflict = Conflict::new(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    *source_stat,
                    destination_stat,
                );
                let rule = ctx.ui().ask_overwrite(&conflict);
                if rule.is_sticky() {
                    ctx.set_overwrite_rule(rule);
                }
                rule
            }
        };

        let resolution = rule.decide(source_stat, &destination_stat);
        tracing::debug!(
            destination = %destination.display(),
            %rule,
            ?resolution,
            "destination exists"
        );

        match resolution {
            Resolution::Overwrite => Ok(Target::Overwrite(destination_stat)),
            Resolution::Append => Ok(Target::Append),
            Resolution::Skip => Err(Outcome::Skip),
            Resolution::Abort => {
                ctx.abort();
                Err(Outcome::Abort)
            }
        }
    }

    /// Rename `source` onto `destination` if both sit on one filesystem.
    ///
    /// Returns `None` when the caller has to copy instead.
    fn try_rename(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
    ) -> Option<Outcome> {
        if !self.is_move() || !self.vfs.same_filesystem(source, destination) {
            return None;
        }

        let vfs = self.vfs;
        let renamed = ctx.attempt(FsCall::Rename, source, true, || {
            match vfs.rename(source, destination) {
                Ok(()) => Ok(true),
                Err(err) if err.kind() == io::ErrorKind::CrossesDevices => Ok(false),
                Err(err) => Err(err),
            }
        });

        match renamed {
            Ok(true) => {
                tracing::debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "renamed"
                );
                Some(Outcome::Ok)
            }
            Ok(false) => None,
            Err(outcome) => Some(outcome),
        }
    }

    /// Copy mode bits, owner and times of `stat` onto `path`.
    ///
    /// Failures the user chose to skip or ignore leave the copy in place.
    fn apply_attributes(
        &self,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        let vfs = self.vfs;
        let config = ctx.config();
        let (preserve, preserve_owner) = (config.preserve_attributes, config.preserve_owner);

        if preserve_owner {
            let (uid, gid) = (Some(stat.uid), Some(stat.gid));
            if let Err(Outcome::Abort) =
                ctx.attempt(FsCall::Chown, path, true, || vfs.chown(path, uid, gid, false))
            {
                return Outcome::Abort;
            }
        }

        if preserve && !stat.kind.is_symlink() {
            let mode = stat.permissions();
            if let Err(Outcome::Abort) =
                ctx.attempt(FsCall::Chmod, path, true, || vfs.chmod(path, mode))
            {
                return Outcome::Abort;
            }
            if let Err(Outcome::Abort) = ctx.attempt(FsCall::Utime, path, true, || {
                vfs.utime(path, stat.accessed, stat.modified)
            }) {
                return Outcome::Abort;
            }
        }

        Outcome::Ok
    }
}

/// Account for a subtree that will not be transferred. Only non-directory
/// entries count as files here.
fn skip_subtree(ctx: &mut OperationContext<'_>, node: Option<&ListingNode>) {
    if let Some(node) = node {
        let totals = node.totals();
        ctx.complete_subtree(totals.file_count, totals.byte_count);
    }
}
