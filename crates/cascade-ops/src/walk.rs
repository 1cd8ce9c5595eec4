//! Generic recursive executor.
//!
//! [`OperateExecutor`] walks a selection and hands every entry to an
//! [`Operator`]. Delete, chmod and chown are all operators; the walk,
//! the retry protocol and progress accounting are shared.

use std::path::Path;

use cascade_core::{EntryKind, EntryName, FileStat, Listing, ListingNode, Vfs};

use crate::context::OperationContext;
use crate::operation::FsCall;
use crate::outcome::Outcome;

/// Flags passed to [`Operator::after_recursion`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecursionFlags(u8);

impl RecursionFlags {
    /// At least one child was skipped or ignored.
    pub const IGNORED_CHILDREN: Self = Self(1);

    /// No flags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every flag of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for RecursionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-entry behaviour plugged into [`OperateExecutor`].
pub trait Operator {
    /// Process a non-directory entry, or a directory when not recursing.
    fn operate(
        &mut self,
        vfs: &dyn Vfs,
        ctx: &mut OperationContext<'_>,
        path: &Path,
        stat: &FileStat,
    ) -> Outcome;

    /// Called on a directory before its children. Anything but `Ok` stops
    /// the descent.
    fn before_recursion(
        &mut self,
        _vfs: &dyn Vfs,
        _ctx: &mut OperationContext<'_>,
        _path: &Path,
        _stat: &FileStat,
    ) -> Outcome {
        Outcome::Ok
    }

    /// Called on a directory after its children.
    fn after_recursion(
        &mut self,
        _vfs: &dyn Vfs,
        _ctx: &mut OperationContext<'_>,
        _path: &Path,
        _stat: &FileStat,
        _flags: RecursionFlags,
    ) -> Outcome {
        Outcome::Ok
    }
}

/// Walks a selection and applies an [`Operator`] to every entry.
pub struct OperateExecutor<'a> {
    vfs: &'a dyn Vfs,
    listing: Option<&'a Listing>,
    recursive: bool,
    follow_links: bool,
}

impl<'a> OperateExecutor<'a> {
    /// Create a recursive executor that does not follow symlinks.
    pub fn new(vfs: &'a dyn Vfs) -> Self {
        Self {
            vfs,
            listing: None,
            recursive: true,
            follow_links: false,
        }
    }

    /// Take children from a prescanned listing instead of scanning.
    pub fn with_listing(mut self, listing: Option<&'a Listing>) -> Self {
        self.listing = listing;
        self
    }

    /// Descend into directories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Stat through symlinks. Recursion still follows the entry's own kind,
    /// so a symlink to a directory is never descended.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Apply `op` to `names` under `base`, in selection order.
    pub fn run(
        &self,
        ctx: &mut OperationContext<'_>,
        op: &mut dyn Operator,
        base: &Path,
        names: &[EntryName],
    ) -> Outcome {
        for (index, name) in names.iter().enumerate() {
            let node = root_node(self.listing, index, name);
            let path = base.join(name.as_os_str());

            match ctx.checkpoint() {
                Some(Outcome::Abort) => return Outcome::Abort,
                Some(_) => {
                    skip_entry(ctx, node, None);
                    continue;
                }
                None => {}
            }

            let outcome = self.walk_entry(ctx, op, &path, node, None);
            if outcome.is_abort() {
                return Outcome::Abort;
            }
            if outcome.is_ignored() {
                ctx.record_skip();
            }
        }
        Outcome::Ok
    }

    fn walk_entry(
        &self,
        ctx: &mut OperationContext<'_>,
        op: &mut dyn Operator,
        path: &Path,
        node: Option<&ListingNode>,
        kind: Option<EntryKind>,
    ) -> Outcome {
        let vfs = self.vfs;
        let follow = self.follow_links;
        let stat = match ctx.attempt(FsCall::Stat, path, true, || {
            if follow {
                vfs.stat(path)
            } else {
                vfs.lstat(path)
            }
        }) {
            Ok(stat) => stat,
            Err(outcome) => {
                if !outcome.is_abort() {
                    skip_entry(ctx, node, kind);
                }
                return outcome;
            }
        };

        let kind = match (node, kind) {
            (Some(node), _) => node.kind,
            (None, Some(kind)) => kind,
            (None, None) if follow => vfs.lstat(path).map(|s| s.kind).unwrap_or(stat.kind),
            (None, None) => stat.kind,
        };

        let size = match node {
            Some(node) => node.size,
            None if kind.counts_bytes() => stat.size,
            None => 0,
        };
        ctx.start_entry(path, None, size);

        if !(self.recursive && kind.is_dir()) {
            let outcome = op.operate(vfs, ctx, path, &stat);
            if !outcome.is_abort() {
                ctx.finish_entry(size);
            }
            return outcome;
        }

        let outcome = op.before_recursion(vfs, ctx, path, &stat);
        if !outcome.is_ok() {
            if !outcome.is_abort() {
                skip_entry(ctx, node, Some(kind));
            }
            return outcome;
        }

        let mut flags = RecursionFlags::empty();
        let outcome = match node.and_then(|n| n.children.as_deref()) {
            Some(children) => {
                let mut result = Outcome::Ok;
                for child in children {
                    let child_path = path.join(child.name.as_os_str());
                    result = self.walk_child(ctx, op, &child_path, Some(child), child.kind);
                    if result.is_abort() {
                        break;
                    }
                    if result.is_ignored() {
                        flags = flags | RecursionFlags::IGNORED_CHILDREN;
                    }
                }
                result
            }
            None => match ctx.attempt(FsCall::Scandir, path, true, || vfs.scandir(path)) {
                Ok(entries) => {
                    let mut result = Outcome::Ok;
                    for entry in entries {
                        let child_path = path.join(entry.name.as_os_str());
                        result = self.walk_child(ctx, op, &child_path, None, entry.kind);
                        if result.is_abort() {
                            break;
                        }
                        if result.is_ignored() {
                            flags = flags | RecursionFlags::IGNORED_CHILDREN;
                        }
                    }
                    result
                }
                Err(outcome) => {
                    if !outcome.is_abort() {
                        ctx.finish_entry(0);
                    }
                    return outcome;
                }
            },
        };

        if outcome.is_abort() {
            return Outcome::Abort;
        }

        let outcome = op.after_recursion(vfs, ctx, path, &stat, flags);
        if !outcome.is_abort() {
            ctx.finish_entry(0);
        }
        outcome
    }

    fn walk_child(
        &self,
        ctx: &mut OperationContext<'_>,
        op: &mut dyn Operator,
        path: &Path,
        node: Option<&ListingNode>,
        kind: EntryKind,
    ) -> Outcome {
        let outcome = match ctx.checkpoint() {
            Some(Outcome::Abort) => return Outcome::Abort,
            Some(outcome) => {
                skip_entry(ctx, node, Some(kind));
                outcome
            }
            None => self.walk_entry(ctx, op, path, node, Some(kind)),
        };
        if outcome.is_ignored() {
            ctx.record_skip();
        }
        outcome
    }
}

/// The prescanned node of the `index`th root, if it matches `name`.
pub(crate) fn root_node<'l>(
    listing: Option<&'l Listing>,
    index: usize,
    name: &EntryName,
) -> Option<&'l ListingNode> {
    listing
        .and_then(|l| l.root(index))
        .filter(|node| node.name == *name)
}

/// Account for an entry that will not be visited. Every directory and
/// non-directory of the subtree counts once.
fn skip_entry(ctx: &mut OperationContext<'_>, node: Option<&ListingNode>, kind: Option<EntryKind>) {
    match node {
        Some(node) => {
            let totals = node.totals();
            ctx.complete_subtree(totals.entry_count(), totals.byte_count);
        }
        None if kind.is_some_and(|k| !k.is_dir()) => ctx.complete_subtree(1, 0),
        None => {}
    }
}
