//! Non-directory entries: regular files, symlinks and special files.

use std::io::{self, Read, Write};
use std::path::Path;

use cascade_core::{EntryKind, FileStat, OpenMode};

use super::{Target, TransferEngine, Transferred};
use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;

impl TransferEngine<'_> {
    /// Transfer one non-directory entry. Progress advances once for it
    /// unless the walk aborts.
    pub(super) fn copy_file(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
    ) -> Transferred {
        let size = if stat.kind.counts_bytes() { stat.size } else { 0 };
        ctx.start_entry(source, Some(destination), size);

        let result = match stat.kind {
            EntryKind::File => self.copy_regular(ctx, source, destination, stat),
            EntryKind::Symlink => self.copy_symlink(ctx, source, destination, stat),
            _ => self.copy_special(ctx, source, destination, stat),
        };

        if !result.outcome.is_abort() {
            ctx.finish_entry(size);
        }
        result
    }

    fn copy_regular(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
    ) -> Transferred {
        let target = match self.prepare_target(ctx, source, destination, stat) {
            Ok(target) => target,
            Err(outcome) => return Transferred::kept(outcome),
        };

        let append = matches!(target, Target::Append);
        if !append {
            if let Some(outcome) = self.try_rename(ctx, source, destination) {
                return outcome.into();
            }
        }

        if let Target::Overwrite(existing) = target {
            if existing.kind != EntryKind::File {
                let outcome = self.remove_existing(ctx, destination);
                if !outcome.is_ok() {
                    return Transferred::kept(outcome);
                }
            }
        }

        let streamed = self.stream(ctx, source, destination, stat, append);
        if streamed != Transferred::done() {
            return streamed;
        }

        let outcome = self.apply_attributes(ctx, destination, stat);
        if outcome.is_abort() {
            return Transferred::kept(Outcome::Abort);
        }

        if self.is_move() {
            ctx.queue_delete(source.to_path_buf(), false);
        }
        Transferred::done()
    }

    /// Stream the contents with the configured buffer, checking for skip
    /// and abort between the read and the write of every chunk.
    fn stream(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
        append: bool,
    ) -> Transferred {
        let vfs = self.vfs;

        let mut reader =
            match ctx.attempt(FsCall::Open, source, true, || vfs.open(source, OpenMode::Read, 0)) {
                Ok(file) => file,
                Err(outcome) => return Transferred::kept(outcome),
            };

        let mode = if append {
            OpenMode::Append
        } else {
            OpenMode::Truncate
        };
        let perm = stat.permissions() & 0o777 | 0o600;
        let mut writer =
            match ctx.attempt(FsCall::Create, destination, true, || vfs.open(destination, mode, perm)) {
                Ok(file) => file,
                Err(outcome) => return Transferred::kept(outcome),
            };

        let mut buffer = vec![0u8; ctx.config().buffer_size.max(1)];

        loop {
            if let Some(outcome) = ctx.checkpoint() {
                return self.handle_incomplete(ctx, destination, stat, outcome, append);
            }

            let read = match ctx.attempt(FsCall::Read, source, false, || reader.read(&mut buffer)) {
                Ok(0) => break,
                Ok(n) => n,
                Err(outcome) => {
                    return self.handle_incomplete(ctx, destination, stat, outcome, append);
                }
            };

            if let Some(outcome) = ctx.checkpoint() {
                return self.handle_incomplete(ctx, destination, stat, outcome, append);
            }

            let mut written = 0;
            while written < read {
                let chunk = &buffer[written..read];
                let n = match ctx.attempt(FsCall::Write, destination, false, || {
                    match writer.write(chunk) {
                        Ok(0) => Err(io::Error::from(io::ErrorKind::WriteZero)),
                        other => other,
                    }
                }) {
                    Ok(n) => n,
                    Err(outcome) => {
                        return self.handle_incomplete(ctx, destination, stat, outcome, append);
                    }
                };
                written += n;
                ctx.add_bytes(n as u64);
            }
        }

        if let Err(outcome) = ctx.attempt(FsCall::Write, destination, false, || writer.flush()) {
            return self.handle_incomplete(ctx, destination, stat, outcome, append);
        }

        Transferred::done()
    }

    /// A transfer stopped halfway. The partial destination is kept or
    /// removed and the source is never queued for deletion.
    fn handle_incomplete(
        &self,
        ctx: &mut OperationContext<'_>,
        destination: &Path,
        stat: &FileStat,
        outcome: Outcome,
        appended: bool,
    ) -> Transferred {
        let keep = if appended {
            true
        } else if ctx.config().confirm_incomplete {
            ctx.ui().confirm_keep_incomplete(destination)
        } else {
            false
        };

        if keep {
            if ctx.config().preserve_attributes {
                if let Err(err) = self.vfs.utime(destination, stat.accessed, stat.modified) {
                    tracing::debug!(path = %destination.display(), %err, "cannot set times of incomplete file");
                }
            }
        } else if let Err(err) = self.vfs.unlink(destination) {
            tracing::warn!(path = %destination.display(), %err, "cannot remove incomplete file");
        }

        tracing::info!(
            path = %destination.display(),
            keep,
            ?outcome,
            "transfer interrupted"
        );

        if ctx.is_aborted() {
            Transferred::kept(Outcome::Abort)
        } else {
            ctx.record_skip();
            Transferred::kept(Outcome::Ok)
        }
    }

    fn copy_symlink(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
    ) -> Transferred {
        let vfs = self.vfs;
        let link_target = match ctx.attempt(FsCall::Readlink, source, true, || vfs.readlink(source)) {
            Ok(target) => target,
            Err(outcome) => return Transferred::kept(outcome),
        };

        let identical = vfs.lstat(destination).is_ok_and(|existing| existing.kind.is_symlink())
            && vfs
                .readlink(destination)
                .is_ok_and(|existing| existing == link_target);
        if identical {
            tracing::debug!(path = %destination.display(), "identical symlink already present");
            if !self.is_move() {
                return Transferred::kept(Outcome::Ok);
            }
            // The destination already holds the link; only the source goes.
            ctx.queue_delete(source.to_path_buf(), false);
            return Transferred::done();
        }

        let target = match self.prepare_target(ctx, source, destination, stat) {
            Ok(target) => target,
            Err(outcome) => return Transferred::kept(outcome),
        };

        if let Some(outcome) = self.try_rename(ctx, source, destination) {
            return outcome.into();
        }

        if !matches!(target, Target::Fresh) {
            let outcome = self.remove_existing(ctx, destination);
            if !outcome.is_ok() {
                return Transferred::kept(outcome);
            }
        }

        if let Err(outcome) = ctx.attempt(FsCall::Symlink, destination, true, || {
            vfs.symlink(&link_target, destination)
        }) {
            return Transferred::kept(outcome);
        }

        if self.apply_attributes(ctx, destination, stat).is_abort() {
            return Transferred::kept(Outcome::Abort);
        }

        if self.is_move() {
            ctx.queue_delete(source.to_path_buf(), false);
        }
        Transferred::done()
    }

    fn copy_special(
        &self,
        ctx: &mut OperationContext<'_>,
        source: &Path,
        destination: &Path,
        stat: &FileStat,
    ) -> Transferred {
        let target = match self.prepare_target(ctx, source, destination, stat) {
            Ok(target) => target,
            Err(outcome) => return Transferred::kept(outcome),
        };

        if let Some(outcome) = self.try_rename(ctx, source, destination) {
            return outcome.into();
        }

        if !matches!(target, Target::Fresh) {
            let outcome = self.remove_existing(ctx, destination);
            if !outcome.is_ok() {
                return Transferred::kept(outcome);
            }
        }

        let vfs = self.vfs;
        if let Err(outcome) = ctx.attempt(FsCall::Mknod, destination, true, || {
            vfs.mknod(destination, stat.mode, stat.rdev)
        }) {
            return Transferred::kept(outcome);
        }

        if self.apply_attributes(ctx, destination, stat).is_abort() {
            return Transferred::kept(Outcome::Abort);
        }

        if self.is_move() {
            ctx.queue_delete(source.to_path_buf(), false);
        }
        Transferred::done()
    }

    fn remove_existing(&self, ctx: &mut OperationContext<'_>, destination: &Path) -> Outcome {
        let vfs = self.vfs;
        ctx.attempt(FsCall::Unlink, destination, true, || vfs.unlink(destination))
            .err()
            .unwrap_or(Outcome::Ok)
    }
}
