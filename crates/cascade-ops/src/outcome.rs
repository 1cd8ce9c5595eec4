//! Per-entry outcomes and the UI answers that map onto them.

use serde::{Deserialize, Serialize};

/// Result of processing one entry (or a whole walk).
///
/// Every engine call returns one of these and every caller inspects it; there
/// is no other way for a failure to short-circuit the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Outcome {
    /// Entry fully processed.
    Ok,
    /// The user skipped this entry.
    Skip,
    /// Soft failure chosen by the operator or the user.
    Ignore,
    /// Stop everything.
    Abort,
}

impl Outcome {
    /// Check if the entry was fully processed.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if the walk must stop.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort)
    }

    /// Skip and Ignore both mark the parent directory as having ignored items.
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Skip | Self::Ignore)
    }
}

/// Answer to a "retry / skip / ignore / cancel" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum DialogAnswer {
    /// Repeat the failed call.
    Retry,
    /// Give up on this entry.
    Skip,
    /// Give up on this entry and keep going quietly.
    Ignore,
    /// Stop the whole operation.
    Cancel,
}

impl DialogAnswer {
    /// Convert to the engine outcome. `Retry` has no outcome; the call is repeated.
    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            Self::Retry => None,
            Self::Skip => Some(Outcome::Skip),
            Self::Ignore => Some(Outcome::Ignore),
            Self::Cancel => Some(Outcome::Abort),
        }
    }
}

/// A live request from the user, picked up at the next suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserSignal {
    /// Abandon the current entry and carry on.
    Skip,
    /// Terminate the walk.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_answer_conversion() {
        assert_eq!(DialogAnswer::Retry.into_outcome(), None);
        assert_eq!(DialogAnswer::Skip.into_outcome(), Some(Outcome::Skip));
        assert_eq!(DialogAnswer::Ignore.into_outcome(), Some(Outcome::Ignore));
        assert_eq!(DialogAnswer::Cancel.into_outcome(), Some(Outcome::Abort));
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(Outcome::Skip.is_ignored());
        assert!(Outcome::Ignore.is_ignored());
        assert!(!Outcome::Ok.is_ignored());
        assert!(Outcome::Abort.is_abort());
    }
}
