//! Game phases and the explicit phase-successor table.
//!
//! The five ordered phases keep their legacy numeric codes on disk
//! (`TwoPlayerSetup = -1` through `Move = 3`), but in-memory transitions go
//! through [`GamePhase::successor`] rather than ordinal arithmetic, so
//! reordering variants cannot silently change the game flow.

/// One stage of a player's turn, or one of the terminal-adjacent states.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GamePhase {
    /// Uninitialized game.
    #[default]
    Null,
    /// Alternating placement rounds used only by two-player games.
    TwoPlayerSetup,
    /// Claim-then-reinforce setup used by games with three or more players.
    DefaultSetup,
    /// Army placement at the start of a turn.
    Place,
    /// Battles against adjacent territories.
    Attack,
    /// A single redeployment of armies before the turn ends.
    Move,
    /// A winner has been declared.
    GameOver,
}

/// Result of asking a phase for its successor.
pub enum PhaseAdvance {
    /// The phase advances in place.
    Next(GamePhase),
    /// The phase ring is exhausted for this turn; the turn itself advances.
    EndOfTurn,
    /// Terminal states do not advance.
    Hold,
}

impl GamePhase {
    /// Explicit successor table for [`crate::state::StateMachine::increment_phase`].
    ///
    /// Two-player games skip `DefaultSetup` entirely, which is why
    /// `TwoPlayerSetup` jumps directly to `Place`.
    pub fn successor(self) -> PhaseAdvance {
        match self {
            Self::TwoPlayerSetup => PhaseAdvance::Next(Self::Place),
            Self::DefaultSetup => PhaseAdvance::Next(Self::Place),
            Self::Place => PhaseAdvance::Next(Self::Attack),
            Self::Attack => PhaseAdvance::Next(Self::Move),
            Self::Move => PhaseAdvance::EndOfTurn,
            Self::Null | Self::GameOver => PhaseAdvance::Hold,
        }
    }

    /// True for either of the two setup phases.
    pub const fn is_setup(self) -> bool {
        matches!(self, Self::TwoPlayerSetup | Self::DefaultSetup)
    }

    /// Legacy numeric code used by the persisted form.
    pub const fn code(self) -> i32 {
        match self {
            Self::Null => -2,
            Self::TwoPlayerSetup => -1,
            Self::DefaultSetup => 0,
            Self::Place => 1,
            Self::Attack => 2,
            Self::Move => 3,
            Self::GameOver => 4,
        }
    }

    /// Decodes a persisted phase code.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(Self::Null),
            -1 => Some(Self::TwoPlayerSetup),
            0 => Some(Self::DefaultSetup),
            1 => Some(Self::Place),
            2 => Some(Self::Attack),
            3 => Some(Self::Move),
            4 => Some(Self::GameOver),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_table_matches_legacy_ordering() {
        assert!(matches!(
            GamePhase::TwoPlayerSetup.successor(),
            PhaseAdvance::Next(GamePhase::Place)
        ));
        assert!(matches!(
            GamePhase::DefaultSetup.successor(),
            PhaseAdvance::Next(GamePhase::Place)
        ));
        assert!(matches!(
            GamePhase::Place.successor(),
            PhaseAdvance::Next(GamePhase::Attack)
        ));
        assert!(matches!(
            GamePhase::Attack.successor(),
            PhaseAdvance::Next(GamePhase::Move)
        ));
        assert!(matches!(GamePhase::Move.successor(), PhaseAdvance::EndOfTurn));
        assert!(matches!(GamePhase::Null.successor(), PhaseAdvance::Hold));
        assert!(matches!(GamePhase::GameOver.successor(), PhaseAdvance::Hold));
    }

    #[test]
    fn codes_round_trip() {
        for phase in [
            GamePhase::Null,
            GamePhase::TwoPlayerSetup,
            GamePhase::DefaultSetup,
            GamePhase::Place,
            GamePhase::Attack,
            GamePhase::Move,
            GamePhase::GameOver,
        ] {
            assert_eq!(GamePhase::from_code(phase.code()), Some(phase));
        }
        assert_eq!(GamePhase::from_code(17), None);
    }
}
