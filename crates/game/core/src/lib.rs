//! Deterministic conquest rule engine shared across clients.
//!
//! `conquest-core` defines the canonical rules (phases, the state machine,
//! the regulator, battle and trade resolution) and exposes pure APIs that
//! can be reused by both the runtime and offline tools. All cross-entity
//! state mutation flows through [`rules::Regulator`], and supporting crates
//! depend on the types re-exported here. The crate performs no I/O and
//! emits no logs; persistence encoding and logging live in the runtime.
pub mod board;
pub mod error;
pub mod events;
pub mod rng;
pub mod rules;
pub mod save;
pub mod state;

pub use board::{Board, Continent, TerritoryLedger};
pub use error::{ErrorSeverity, RuleError};
pub use events::RuleEvent;
pub use rng::{PcgRng, RngOracle, compute_seed};
pub use rules::{
    BattleOutcome, DicePair, DicePairs, MAX_PAIRS, Regulator, RuleValues, StandardRules, Table,
    assign_two_player_territories,
};
pub use save::{Field, FieldReader, FieldValue, FieldWriter, Persist, SaveError};
pub use state::{
    Card, CardDeck, CardSet, Deck, GamePhase, Insignia, PhaseAdvance, Player, PlayerId, PlayerSet,
    Roster, StateChange, StateMachine, TRADE_SIZE, TerritoryId,
};
