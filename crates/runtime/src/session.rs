//! Session orchestration: one live game behind a single intent queue.
//!
//! [`Session`] owns the machine, regulator, roster, ledger, and deck, and
//! is the only place they meet. Callers drive the game by dispatching
//! [`Intent`]s one at a time; each dispatch runs a regulated operation to
//! completion and returns the events it raised. The session also handles
//! the one cross-operation courtesy the rule engine leaves to its caller:
//! delivering a pending reward card before the intent that ends the turn,
//! while the earning player still holds it.

use conquest_core::{
    Card, CardDeck, Continent, DicePairs, GamePhase, Persist, PlayerId, Regulator, Roster,
    RuleEvent, RuleValues, StandardRules, StateMachine, Table, TerritoryId, TerritoryLedger,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// One player intent, dispatched to the matching regulator operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Place one army (claim during setup, reinforce otherwise).
    ClaimOrReinforce { territory: TerritoryId },
    /// Transfer armies between two territories.
    MoveArmies {
        source: TerritoryId,
        target: TerritoryId,
        count: u32,
    },
    /// Resolve one battle from pre-paired descending dice.
    Battle {
        source: TerritoryId,
        target: TerritoryId,
        pairs: DicePairs,
    },
    /// Surrender a matching card set for an army bonus.
    TradeInCards {
        player: PlayerId,
        indices: Vec<usize>,
    },
    /// Answer a `ChooseTradeBonus` request with the chosen territory.
    AwardTradeInBonus { territory: TerritoryId },
    /// Move the pending reward card into the turn-holder's hand.
    DeliverCardReward,
    /// Player-driven advance out of the current phase.
    EndPhase,
}

/// Everything needed to start a fresh game.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub num_players: u8,
    pub territory_count: u16,
    pub continents: Vec<Continent>,
    /// Deterministic seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
}

/// One persisted component's tagged field stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBlock {
    pub tag: String,
    pub fields: Vec<conquest_core::Field>,
}

/// The full persisted form of a session, block per component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub blocks: Vec<SaveBlock>,
}

/// A live game: state, rules, and the intent dispatch loop.
pub struct Session {
    machine: StateMachine,
    regulator: Regulator,
    roster: Roster,
    ledger: TerritoryLedger,
    deck: CardDeck,
    rules: StandardRules,
}

impl Session {
    /// Starts a fresh game and runs the regulator's one-time setup.
    ///
    /// Returns the session together with the events setup raised (for
    /// two-player games this includes the automatic territory
    /// pre-assignment's state changes).
    pub fn new(config: SessionConfig) -> Result<(Self, Vec<RuleEvent>)> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let rules = StandardRules;
        let machine = StateMachine::new(config.num_players)?;
        // Two-player games carry the neutral dummy as a third slot.
        let slots = if config.num_players == 2 {
            3
        } else {
            config.num_players
        };
        let roster = Roster::new(slots, rules.initial_army_pool(config.num_players));
        let ledger = TerritoryLedger::new(config.territory_count).with_continents(config.continents);
        let deck = CardDeck::standard(config.territory_count, seed);

        let mut session = Self {
            machine,
            regulator: Regulator::new(),
            roster,
            ledger,
            deck,
            rules,
        };
        let events = session.with_table(|regulator, table| regulator.initialize(table, seed))?;
        tracing::info!(
            num_players = config.num_players,
            territories = config.territory_count,
            seed,
            "session started"
        );
        Ok((session, events))
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn board(&self) -> &TerritoryLedger {
        &self.ledger
    }

    /// Whether `player` may trade the cards at `indices` right now.
    pub fn can_trade_in_cards(&self, player: PlayerId, indices: &[usize]) -> bool {
        self.regulator
            .can_trade_in_cards(&self.machine, &self.roster, player, indices)
    }

    /// Runs one intent to completion and returns the events it raised.
    ///
    /// Soft rule violations come back as errors with state unchanged and
    /// are logged as warnings; internal and fatal errors are logged as
    /// errors before propagating.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Vec<RuleEvent>> {
        let mut events = Vec::new();
        if self.reward_due(&intent) {
            events.extend(self.with_table(|regulator, table| regulator.deliver_card_reward(table))?);
        }

        let result = match intent {
            Intent::ClaimOrReinforce { territory } => {
                self.with_table(|r, t| r.claim_or_reinforce(t, territory))
            }
            Intent::MoveArmies {
                source,
                target,
                count,
            } => self.with_table(|r, t| r.move_armies(t, source, target, count)),
            Intent::Battle {
                source,
                target,
                pairs,
            } => self.with_table(|r, t| r.battle(t, source, target, &pairs)),
            Intent::TradeInCards { player, indices } => {
                self.with_table(|r, t| r.trade_in_cards(t, player, &indices))
            }
            Intent::AwardTradeInBonus { territory } => {
                self.with_table(|r, t| r.award_trade_in_bonus(t, territory))
            }
            Intent::DeliverCardReward => {
                self.with_table(|r, t| r.deliver_card_reward(t))
            }
            Intent::EndPhase => self.with_table(|r, t| r.end_phase(t)),
        };

        match result {
            Ok(more) => {
                events.extend(more);
                Ok(events)
            }
            Err(err) if err.severity().is_recoverable() => {
                tracing::warn!(error = %err, severity = err.severity().as_str(), "intent rejected");
                Err(err.into())
            }
            Err(err) => {
                tracing::error!(error = %err, severity = err.severity().as_str(), "intent failed");
                Err(err.into())
            }
        }
    }

    /// The pending reward must reach the earning player before the intent
    /// that rotates the turn away from them. The turn only ends out of the
    /// `Move` phase, so those are the intents that trigger delivery.
    fn reward_due(&self, intent: &Intent) -> bool {
        self.regulator.reward().is_some()
            && self.machine.current_phase() == GamePhase::Move
            && matches!(intent, Intent::MoveArmies { .. } | Intent::EndPhase)
    }

    fn with_table<T>(
        &mut self,
        f: impl FnOnce(&mut Regulator, &mut Table<'_>) -> std::result::Result<T, conquest_core::RuleError>,
    ) -> std::result::Result<T, conquest_core::RuleError> {
        let mut table = Table {
            machine: &mut self.machine,
            roster: &mut self.roster,
            board: &mut self.ledger,
            deck: &mut self.deck,
            rules: &self.rules,
        };
        f(&mut self.regulator, &mut table)
    }

    /// The session's complete persisted form, in fixed block order.
    pub fn snapshot(&self) -> SaveGame {
        fn block<T: Persist>(value: &T) -> SaveBlock {
            SaveBlock {
                tag: T::TAG.to_owned(),
                fields: value.to_fields(),
            }
        }
        SaveGame {
            blocks: vec![
                block(&self.machine),
                block(&self.regulator),
                block(&self.roster),
                block(&self.ledger),
                block(&self.deck),
            ],
        }
    }

    /// Rebuilds a session from a snapshot.
    ///
    /// Any integrity failure aborts the whole restore; the caller keeps
    /// its prior in-memory session authoritative. Continent groupings are
    /// static host data and are supplied again rather than persisted. The
    /// regulator load is two-phase: field decode, then [`Regulator::bind`]
    /// to the freshly loaded machine.
    pub fn restore(save: &SaveGame, continents: Vec<Continent>) -> Result<Self> {
        fn decode<T: Persist>(block: Option<&SaveBlock>) -> Result<T> {
            let block = block.ok_or(SessionError::MissingBlock { tag: T::TAG })?;
            if block.tag != T::TAG {
                return Err(SessionError::BlockMismatch {
                    expected: T::TAG,
                    found: block.tag.clone(),
                });
            }
            Ok(T::from_fields(&block.fields)?)
        }

        let mut blocks = save.blocks.iter();
        let mut machine: StateMachine = decode(blocks.next())?;
        let mut regulator: Regulator = decode(blocks.next())?;
        let roster: Roster = decode(blocks.next())?;
        let ledger: TerritoryLedger = decode(blocks.next())?;
        let deck: CardDeck = decode(blocks.next())?;
        if blocks.next().is_some() {
            return Err(SessionError::TrailingBlocks);
        }
        regulator.bind(&mut machine);
        Ok(Self {
            machine,
            regulator,
            roster,
            ledger: ledger.with_continents(continents),
            deck,
            rules: StandardRules,
        })
    }

    /// The pending reward card, if any.
    pub fn pending_reward(&self) -> Option<&Card> {
        self.regulator.reward()
    }
}
