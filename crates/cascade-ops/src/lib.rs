//! File operations engine for cascade.
//!
//! This crate provides the recursive copy, move, delete, chmod and chown
//! operations of a console file manager. Operations run synchronously on the
//! caller's thread and talk to the user through an [`OperationUi`]: progress
//! is pushed into it, and it is asked whenever a call fails, a destination
//! already exists or a transfer is interrupted halfway.
//!
//! # Example
//!
//! ```rust,no_run
//! use cascade_ops::{OperationExecutor, UnattendedUi};
//! use std::path::{Path, PathBuf};
//!
//! let executor = OperationExecutor::local();
//! let mut ui = UnattendedUi::default();
//!
//! let complete = executor
//!     .move_to(&mut ui, &[PathBuf::from("/tmp/src")], Path::new("/tmp/dst"))
//!     .unwrap();
//! println!("{}", complete.summary());
//! ```

mod context;
mod error;
mod executor;
mod operation;
mod outcome;
mod overwrite;
mod progress;
mod transfer;
mod ui;
mod walk;

pub mod operators;

pub use context::{OperationContext, PendingDelete};
pub use error::EngineError;
pub use executor::{OperationExecutor, Selection};
pub use operation::{FileOperation, FsCall, OperationError};
pub use outcome::{DialogAnswer, Outcome, UserSignal};
pub use overwrite::{Conflict, OverwriteRule, Resolution};
pub use progress::{OperationComplete, OperationProgress, OperationType, SpeedTracker};
pub use transfer::{TransferEngine, TransferMode};
pub use ui::{OperationUi, ProgressSurface, UnattendedUi};
pub use walk::{OperateExecutor, Operator, RecursionFlags};

// Re-export core types for convenience
pub use cascade_core::{EntryName, LocalVfs, OperationConfig, Vfs};
