//! Rule enforcement: the regulator and its pure helpers.

pub mod battle;
mod regulator;
mod setup;
mod values;

pub use battle::{BattleOutcome, DicePair, DicePairs, MAX_PAIRS};
pub use regulator::{Regulator, Table};
pub use setup::assign_two_player_territories;
pub use values::{RuleValues, StandardRules};
