//! Common error infrastructure for conquest-core.
//!
//! Domain errors carry a severity classification so callers can decide
//! between re-prompting the player, logging a warning, and aborting the
//! game outright. Persistence errors live in [`crate::save`].

use crate::state::{PlayerId, TerritoryId};

/// Severity level of a rule error, used for categorization and recovery
/// strategies.
///
/// - **Recoverable**: the player may retry with a different intent
/// - **Validation**: invalid input, rejected without mutating state
/// - **Internal**: unexpected state inconsistency, indicates a bug
/// - **Fatal**: the game reached an unreachable configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - can retry with an alternative intent.
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    Validation,

    /// Internal error - unexpected state inconsistency.
    Internal,

    /// Fatal error - game state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable | Self::Validation)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Errors produced by the state machine and the regulator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A turn or round advance found no active player remaining.
    #[error("no active player remains for turn rotation")]
    NoActivePlayers,

    /// An active-player search started outside the valid slot range.
    #[error("player slot {0} is outside the valid range")]
    PlayerOutOfRange(u8),

    /// A regulated operation was issued before `initialize` ran.
    #[error("regulator has not been initialized")]
    NotInitialized,

    /// `initialize` was invoked a second time on the same regulator.
    #[error("regulator is already initialized")]
    AlreadyInitialized,

    /// The operation is not legal in the current phase.
    #[error("operation `{operation}` is not valid during the {phase} phase")]
    WrongPhase {
        operation: &'static str,
        phase: &'static str,
    },

    /// A player acted outside their turn.
    #[error("player {player} acted out of turn")]
    OutOfTurn { player: PlayerId },

    /// The selected cards do not form a legal trade.
    #[error("selected cards do not form a valid trade-in")]
    InvalidTrade,

    /// A placement was attempted with an empty army pool.
    #[error("player {player} has no armies left to place")]
    EmptyArmyPool { player: PlayerId },

    /// A battle was launched from a territory nobody owns.
    #[error("territory {0} has no owner")]
    UnownedTerritory(TerritoryId),

    /// A territory index does not exist on the board.
    #[error("territory {0} does not exist on the board")]
    UnknownTerritory(TerritoryId),

    /// The two-player setup window drifted outside its three-step cycle.
    #[error("setup action window is out of step (offset {0})")]
    SetupStepOutOfRange(u32),
}

impl RuleError {
    /// Classifies this error for recovery and logging purposes.
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoActivePlayers => ErrorSeverity::Fatal,
            Self::PlayerOutOfRange(_)
            | Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::SetupStepOutOfRange(_) => ErrorSeverity::Internal,
            Self::WrongPhase { .. }
            | Self::OutOfTurn { .. }
            | Self::InvalidTrade
            | Self::EmptyArmyPool { .. }
            | Self::UnownedTerritory(_)
            | Self::UnknownTerritory(_) => ErrorSeverity::Validation,
        }
    }
}
