//! Recursive delete.

use std::path::Path;

use cascade_core::{FileStat, Vfs};

use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;
use crate::walk::{Operator, RecursionFlags};

/// Recursive delete. Leaves are unlinked, directories removed after their
/// children unless one of them was left behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct Delete;

impl Operator for Delete {
    fn operate(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        let result = if stat.kind.is_dir() {
            ctx.attempt(FsCall::Rmdir, path, true, || vfs.rmdir(path))
        } else {
            ctx.attempt(FsCall::Unlink, path, true, || vfs.unlink(path))
        };
        result.err().unwrap_or(Outcome::Ok)
    }

    fn after_recursion(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        _stat: &FileStat,
        flags: RecursionFlags,
    ) -> Outcome {
        if flags.contains(RecursionFlags::IGNORED_CHILDREN) {
            tracing::debug!(path = %path.display(), "keeping directory with ignored children");
            return Outcome::Ignore;
        }
        ctx.attempt(FsCall::Rmdir, path, true, || vfs.rmdir(path))
            .err()
            .unwrap_or(Outcome::Ok)
    }
}
