//! Core types and traits for cascade.
//!
//! This crate provides the data structures shared by the scanning and
//! operation crates: listing nodes and totals, operation configuration,
//! listing errors and the [`Vfs`] capability layer.

mod config;
mod error;
mod name;
mod node;
mod tree;
pub mod vfs;

pub use config::{DEFAULT_BUFFER_SIZE, OperationConfig, OperationConfigBuilder};
pub use error::ListingError;
pub use name::EntryName;
pub use node::{EntryKind, ListingNode, is_pseudo_entry};
pub use tree::{Listing, ListingTotals};
pub use vfs::{DirEntry, FileStat, LocalVfs, OpenMode, Vfs, VfsFile};
