//! Game state: phases, the state machine, players, and cards.

mod card;
mod common;
mod machine;
mod phase;
mod player;

pub use card::{Card, CardDeck, CardSet, Deck, Insignia, TRADE_SIZE};
pub use common::{PlayerId, TerritoryId};
pub use machine::{PlayerSet, StateChange, StateMachine};
pub use phase::{GamePhase, PhaseAdvance};
pub use player::{Player, Roster};
