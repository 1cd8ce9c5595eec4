//! Permission changes.

use std::path::Path;

use cascade_core::vfs::PERMISSION_MASK;
use cascade_core::{FileStat, Vfs};
use serde::{Deserialize, Serialize};

use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;
use crate::walk::Operator;

/// Permission bits to set and to clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChmodSpec {
    /// Bits turned on.
    pub set: u32,
    /// Bits turned off.
    pub clear: u32,
}

impl ChmodSpec {
    /// Replace the permission bits with `mode`.
    pub fn absolute(mode: u32) -> Self {
        Self {
            set: mode & PERMISSION_MASK,
            clear: PERMISSION_MASK,
        }
    }

    /// New permission bits for an entry whose mode is `mode`.
    pub fn apply(&self, mode: u32) -> u32 {
        ((mode & PERMISSION_MASK) & !self.clear | self.set) & PERMISSION_MASK
    }
}

/// Recursive chmod. Directories are changed before their children so a
/// grant of search permission takes effect on the way down.
#[derive(Debug, Clone, Copy)]
pub struct Chmod {
    spec: ChmodSpec,
}

impl Chmod {
    pub fn new(spec: ChmodSpec) -> Self {
        Self { spec }
    }

    fn change(
        &self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        let mode = self.spec.apply(stat.mode);
        if mode == stat.permissions() {
            return Outcome::Ok;
        }
        ctx.attempt(FsCall::Chmod, path, true, || vfs.chmod(path, mode))
            .err()
            .unwrap_or(Outcome::Ok)
    }
}

impl Operator for Chmod {
    fn operate(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        self.change(vfs, ctx, path, stat)
    }

    fn before_recursion(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome {
        self.change(vfs, ctx, path, stat)
    }
}
