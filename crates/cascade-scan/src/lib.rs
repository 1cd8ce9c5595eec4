//! Listing prescan for cascade.
//!
//! Before an operation runs, the selection is listed once into an in-memory
//! [`Listing`] tree so that progress displays can be sized up front and the
//! walker does not have to scan every directory a second time.
//!
//! # Example
//!
//! ```rust,no_run
//! use cascade_scan::{EntryName, LocalVfs, prescan};
//!
//! let names = [EntryName::from("photos")];
//! let listing = prescan(&LocalVfs, "/home/user".as_ref(), &names).unwrap();
//!
//! println!("{} files, {} bytes", listing.total_files(), listing.total_bytes());
//! ```
//!
//! If the prescan fails the operation still runs; it simply lists each
//! directory on demand and shows an indeterminate progress count.

mod prescan;
mod progress;

pub use prescan::{Prescanner, prescan};
pub use progress::ScanProgress;

// Re-export core types for convenience
pub use cascade_core::{EntryKind, EntryName, Listing, ListingError, ListingNode, ListingTotals, LocalVfs, Vfs};
