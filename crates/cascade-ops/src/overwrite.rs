//! Destination conflicts and overwrite rules.

use std::path::PathBuf;

use cascade_core::FileStat;
use serde::{Deserialize, Serialize};

/// The destination of a copy or move already exists.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The source path being copied or moved.
    pub source: PathBuf,
    /// The existing destination path.
    pub destination: PathBuf,
    /// Metadata of the source.
    pub source_stat: FileStat,
    /// Metadata of the existing destination.
    pub destination_stat: FileStat,
}

impl Conflict {
    /// Create a new conflict.
    pub fn new(
        source: PathBuf,
        destination: PathBuf,
        source_stat: FileStat,
        destination_stat: FileStat,
    ) -> Self {
        Self {
            source,
            destination,
            source_stat,
            destination_stat,
        }
    }

    /// Whether the destination is at least as new as the source.
    pub fn destination_is_newer(&self) -> bool {
        self.destination_stat.modified >= self.source_stat.modified
    }

    /// Size difference (positive = destination is larger).
    pub fn size_difference(&self) -> i64 {
        self.destination_stat.size as i64 - self.source_stat.size as i64
    }
}

/// The user's answer to a "file exists" question.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum OverwriteRule {
    /// Replace this one.
    Yes,
    /// Keep the existing one and skip this entry.
    No,
    /// Write the source after the existing bytes.
    Append,
    /// Replace this and every later conflict.
    All,
    /// Replace only when the source is newer.
    Update,
    /// Replace only when the sizes differ.
    SizeDiffers,
    /// Skip this and every later conflict.
    None,
    /// Stop the operation.
    Abort,
}

impl OverwriteRule {
    /// Sticky rules are remembered for the rest of the operation.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::All | Self::Update | Self::SizeDiffers | Self::None)
    }

    /// Decide what to do with one conflicting pair.
    ///
    /// `Update` and `SizeDiffers` compare the given pair every time, even
    /// when the rule was remembered from an earlier conflict.
    pub fn decide(&self, source: &FileStat, destination: &FileStat) -> Resolution {
        match self {
            Self::Yes | Self::All => Resolution::Overwrite,
            Self::No | Self::None => Resolution::Skip,
            Self::Append => {
                if source.kind.is_file() && destination.kind.is_file() {
                    Resolution::Append
                } else {
                    Resolution::Overwrite
                }
            }
            Self::Update => {
                if destination.modified >= source.modified {
                    Resolution::Skip
                } else {
                    Resolution::Overwrite
                }
            }
            Self::SizeDiffers => {
                if destination.size == source.size {
                    Resolution::Skip
                } else {
                    Resolution::Overwrite
                }
            }
            Self::Abort => Resolution::Abort,
        }
    }
}

/// What happens to one conflicting destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the destination.
    Overwrite,
    /// Append to the destination.
    Append,
    /// Leave the destination alone and skip the entry.
    Skip,
    /// Stop the operation.
    Abort,
}
