//! Notifications surfaced to the embedding application.
//!
//! Every regulated operation returns the ordered list of events it raised.
//! Field-change events mirror the state machine's change outbox; the rest
//! ask the caller for input (trade prompts, bonus territory choices) or
//! report milestones (eliminations, victory).

use crate::state::{PlayerId, StateChange, TerritoryId};

/// One outbound notification raised while processing a player intent.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleEvent {
    /// A state machine field changed, identified by name only.
    Changed(StateChange),

    /// The turn-holder may (or, when `forced`, must) trade in cards.
    TradePrompt { player: PlayerId, forced: bool },

    /// More than one traded card targets a controlled territory; the caller
    /// must pick one and answer with `award_trade_in_bonus`.
    ChooseTradeBonus {
        player: PlayerId,
        candidates: Vec<TerritoryId>,
    },

    /// A conquest drew a reward card, now held pending delivery.
    RewardDrawn { player: PlayerId },

    /// The pending reward card entered the turn-holder's hand.
    RewardDelivered { player: PlayerId },

    /// A player lost their last territory and left the turn rotation.
    PlayerEliminated { player: PlayerId },

    /// A player controls the whole board.
    GameWon { player: PlayerId },
}
