//! Owner and group changes.

use std::path::Path;

use cascade_core::{FileStat, Vfs};

use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;
use crate::walk::{Operator, RecursionFlags};

/// Recursive chown with lchown semantics. `None` leaves that id alone.
#[derive(Debug, Clone, Copy)]
pub struct Chown {
    uid: Option<u32>,
    gid: Option<u32>,
}

impl Chown {
    pub fn new(uid: Option<u32>, gid: Option<u32>) -> Self {
        Self { uid, gid }
    }

    fn change(&self, vfs: &dyn Vfs, ctx: &mut OperationContext<'_>, path: &Path, stat: &FileStat) -> Outcome {
        let uid = self.uid.filter(|&uid| uid != stat.uid);
        let gid = self.gid.filter(|&gid| gid != stat.gid);
        if uid.is_none() && gid.is_none() {
            return Outcome::Ok;
        }
        ctx.attempt(FsCall::Chown, path, true, || vfs.chown(path, uid, gid, false))
            .err()
            .unwrap_or(Outcome::Ok)
    }
}

impl Operator for Chown {
    fn operate(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        self.change(vfs, ctx, path, stat)
    }

    fn after_recursion(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
        _flags: RecursionFlags,
    ) -> Outcome {
        self.change(vfs, ctx, path, stat)
    }
}
