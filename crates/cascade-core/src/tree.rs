//! Prescanned listing container and aggregate totals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::node::{EntryKind, ListingNode};

/// Aggregate totals accumulated while building a listing.
///
/// Only used to size progress displays, so it is allowed to go stale if the
/// tree changes between the prescan and the operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTotals {
    /// Number of non-directory entries.
    pub file_count: u64,
    /// Number of directories, roots included.
    pub dir_count: u64,
    /// Bytes held by regular files and symlinks.
    pub byte_count: u64,
}

impl ListingTotals {
    /// Create new empty totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-directory entry.
    pub fn record_leaf(&mut self, kind: EntryKind, size: u64) {
        self.file_count += 1;
        if kind.counts_bytes() {
            self.byte_count += size;
        }
    }

    /// Record a directory.
    pub fn record_dir(&mut self) {
        self.dir_count += 1;
    }

    /// Number of entries of every kind.
    pub fn entry_count(&self) -> u64 {
        self.file_count + self.dir_count
    }

    /// Add another set of totals to this one.
    pub fn merge(&mut self, other: &ListingTotals) {
        self.file_count += other.file_count;
        self.dir_count += other.dir_count;
        self.byte_count += other.byte_count;
    }
}

/// A complete prescan of a selection: one node per root, in selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Directory the root names are relative to.
    pub base: PathBuf,

    /// Root nodes, parallel to the selection they were built from.
    pub roots: Vec<ListingNode>,

    /// Aggregate totals over all roots.
    pub totals: ListingTotals,

    /// How long the prescan took.
    pub scan_duration: Duration,
}

impl Listing {
    /// Create a new listing.
    pub fn new(
        base: PathBuf,
        roots: Vec<ListingNode>,
        totals: ListingTotals,
        scan_duration: Duration,
    ) -> Self {
        Self {
            base,
            roots,
            totals,
            scan_duration,
        }
    }

    /// Get the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Get the root node at `index` in selection order.
    pub fn root(&self, index: usize) -> Option<&ListingNode> {
        self.roots.get(index)
    }

    /// Get the total byte count.
    pub fn total_bytes(&self) -> u64 {
        self.totals.byte_count
    }

    /// Get the total number of non-directory entries.
    pub fn total_files(&self) -> u64 {
        self.totals.file_count
    }
}
