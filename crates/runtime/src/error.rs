//! Error types raised by the session layer.

use conquest_core::{RuleError, SaveError};
use thiserror::Error;

/// Errors surfaced by [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The rule engine rejected or aborted the intent.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// A persisted field stream failed its integrity checks.
    #[error(transparent)]
    Save(#[from] SaveError),

    /// A save is missing a component block.
    #[error("save is missing the `{tag}` block")]
    MissingBlock { tag: &'static str },

    /// A save block carries the wrong component tag.
    #[error("expected save block `{expected}`, found `{found}`")]
    BlockMismatch {
        expected: &'static str,
        found: String,
    },

    /// A save carries more blocks than the session schema declares.
    #[error("save holds unexpected trailing blocks")]
    TrailingBlocks,
}

pub type Result<T> = std::result::Result<T, SessionError>;
