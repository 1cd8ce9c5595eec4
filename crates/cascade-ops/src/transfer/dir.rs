//! Directory entries.

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use cascade_core::{DirEntry, FileStat, ListingNode};

use super::{Transferred, TransferEngine, skip_subtree};
use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;

impl TransferEngine<'_> {
    pub(super) fn copy_dir(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
        node: Option<&ListingNode>,
    ) -> Transferred {
        let vfs = self.vfs;
        ctx.start_entry(source, Some(destination), 0);

        let existing = match ctx.attempt(FsCall::Stat, destination, true, || {
            match vfs.lstat(destination) {
                Ok(stat) => Ok(Some(stat)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            }
        }) {
            Ok(existing) => existing,
            Err(outcome) => {
                if !outcome.is_abort() {
                    skip_subtree(ctx, node);
                }
                return Transferred::kept(outcome);
            }
        };

        if destination.starts_with(source) {
            let outcome = ctx.fail(FsCall::Copy, source, "cannot copy a directory into itself");
            if !outcome.is_abort() {
                skip_subtree(ctx, node);
            }
            return Transferred::kept(outcome);
        }

        // Whole subtree in one rename.
        if existing.is_none() {
            if let Some(outcome) = self.try_rename(ctx, source, destination) {
                if outcome.is_ok() {
                    if let Some(node) = node {
                        let totals = node.totals();
                        ctx.complete_subtree(totals.file_count, totals.byte_count);
                    }
                } else if !outcome.is_abort() {
                    skip_subtree(ctx, node);
                }
                return outcome.into();
            }
        }

        match existing {
            Some(existing) if existing.kind.is_dir() => {}
            Some(_) => {
                let outcome = ctx.fail(
                    FsCall::Mkdir,
                    destination,
                    "destination exists and is not a directory",
                );
                if !outcome.is_abort() {
                    skip_subtree(ctx, node);
                }
                return Transferred::kept(outcome);
            }
            None => {
                // Keep the owner able to write children until the exact mode
                // is applied at the end.
                let perm = stat.permissions() | 0o700;
                if let Err(outcome) =
                    ctx.attempt(FsCall::Mkdir, destination, true, || vfs.mkdir(destination, perm))
                {
                    if !outcome.is_abort() {
                        skip_subtree(ctx, node);
                    }
                    return Transferred::kept(outcome);
                }
            }
        }

        let mut ignored = false;
        let outcome = match node.and_then(|n| n.children.as_deref()) {
            Some(children) => {
                let mut outcome = Outcome::Ok;
                for child in children {
                    let child_result = self.transfer_child(
                        ctx,
                        source,
                        destination,
                        child.name.as_os_str(),
                        Some(child),
                    );
                    if child_result.outcome.is_abort() {
                        outcome = Outcome::Abort;
                        break;
                    }
                    ignored |= child_result.source_kept;
                }
                outcome
            }
            None => match ctx.attempt(FsCall::Scandir, source, true, || vfs.scandir(source)) {
                Ok(entries) => {
                    let mut outcome = Outcome::Ok;
                    for DirEntry { name, .. } in entries {
                        let child_result = self.transfer_child(
                            ctx,
                            source,
                            destination,
                            name.as_os_str(),
                            None,
                        );
                        if child_result.outcome.is_abort() {
                            outcome = Outcome::Abort;
                            break;
                        }
                        ignored |= child_result.source_kept;
                    }
                    outcome
                }
                Err(outcome) => return Transferred::kept(outcome),
            },
        };

        if outcome.is_abort() {
            return Transferred::kept(Outcome::Abort);
        }

        if self.apply_attributes(ctx, destination, stat).is_abort() {
            return Transferred::kept(Outcome::Abort);
        }

        if ignored {
            tracing::debug!(path = %source.display(), "directory has ignored children");
            return Transferred::kept(Outcome::Ok);
        }

        if self.is_move() {
            ctx.queue_delete(source.to_path_buf(), true);
        }
        Transferred::done()
    }

    fn transfer_child(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        name: &OsStr,
        node: Option<&ListingNode>,
    ) -> Transferred {
        let result = match ctx.checkpoint() {
            Some(Outcome::Abort) => return Transferred::kept(Outcome::Abort),
            Some(outcome) => {
                skip_subtree(ctx, node);
                Transferred::kept(outcome)
            }
            None => self.transfer_entry(ctx, &source.join(name), &destination.join(name), node),
        };
        if result.outcome.is_ignored() {
            ctx.record_skip();
        }
        result
    }
}
