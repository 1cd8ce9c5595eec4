//! Deferred removal of moved sources.

use super::TransferEngine;
use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;

impl TransferEngine<'_> {
    /// Remove every queued source in queue order, children before their
    /// parents. Failures are reported and skipped; nothing is rolled back.
    pub(super) fn unlink_pending(&self, ctx: &mut OperationContext<'_>) -> Outcome {
        let vfs = self.vfs;
        let pending = ctx.take_pending_deletes();
        tracing::debug!(count = pending.len(), "removing moved sources");

        for entry in pending {
            if let Some(Outcome::Abort) = ctx.checkpoint() {
                return Outcome::Abort;
            }

            let path = entry.path.as_path();
            let result = if entry.is_dir {
                ctx.attempt(FsCall::Rmdir, path, true, || vfs.rmdir(path))
            } else {
                ctx.attempt(FsCall::Unlink, path, true, || vfs.unlink(path))
            };

            if let Err(Outcome::Abort) = result {
                return Outcome::Abort;
            }
        }

        Outcome::Ok
    }
}
