//! Operators for the generic executor.

mod chmod;
mod chown;
mod delete;

pub use chmod::{Chmod, ChmodSpec};
pub use chown::Chown;
pub use delete::Delete;
