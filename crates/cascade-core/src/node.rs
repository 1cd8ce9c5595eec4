//! Listing tree node types.

use serde::{Deserialize, Serialize};

use crate::name::EntryName;
use crate::tree::ListingTotals;

/// File type tag as reported by a directory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (never followed when the tag comes from a directory read).
    Symlink,
    /// Sockets, FIFOs, block and character devices.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink)
    }

    /// Whether entries of this kind contribute bytes to listing totals.
    pub fn counts_bytes(&self) -> bool {
        matches!(self, EntryKind::File | EntryKind::Symlink)
    }
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// Returns `true` for the "." and ".." pseudo entries.
pub fn is_pseudo_entry(name: &str) -> bool {
    name == "." || name == ".."
}

/// One directory-entry snapshot in a prescanned listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingNode {
    /// Entry name (not a full path).
    pub name: EntryName,

    /// File type copied from the directory read.
    pub kind: EntryKind,

    /// Size in bytes at scan time. Zero for directories.
    pub size: u64,

    /// Children in scan order. `Some` only for scanned directories.
    pub children: Option<Vec<ListingNode>>,
}

impl ListingNode {
    /// Create a leaf node (file, symlink or special file).
    pub fn leaf(name: impl Into<EntryName>, kind: EntryKind, size: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            size: if kind.counts_bytes() { size } else { 0 },
            children: None,
        }
    }

    /// Create a scanned directory node.
    pub fn directory(name: impl Into<EntryName>, children: Vec<ListingNode>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            children: Some(children),
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, Vec::len)
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&ListingNode> {
        self.children
            .as_ref()
            .and_then(|children| children.iter().find(|c| c.name == *name))
    }

    /// Aggregate totals for this node and everything below it.
    pub fn totals(&self) -> ListingTotals {
        let mut totals = ListingTotals::default();
        self.accumulate(&mut totals);
        totals
    }

    fn accumulate(&self, totals: &mut ListingTotals) {
        if self.is_dir() {
            totals.record_dir();
            for child in self.children.iter().flatten() {
                child.accumulate(totals);
            }
        } else {
            totals.record_leaf(self.kind, self.size);
        }
    }
}
