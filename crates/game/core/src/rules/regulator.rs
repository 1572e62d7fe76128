//! The rule regulator.
//!
//! The regulator is the sole mutator of cross-entity game state: it turns
//! player intents into validated transitions across the state machine, the
//! roster, the board, and the deck. Each public operation runs through the
//! same pipeline - mutate, bump the action counter, check the action limit,
//! then drain the machine's change outbox and react to phase entries. The
//! drain loop also picks up changes queued by the reactions themselves, so
//! control flow stays flat even when a transition cascades.

use crate::board::Board;
use crate::error::RuleError;
use crate::events::RuleEvent;
use crate::rules::battle::{self, DicePair};
use crate::rules::setup;
use crate::rules::values::RuleValues;
use crate::state::{
    Card, CardSet, Deck, GamePhase, PlayerId, Roster, StateChange, StateMachine, TRADE_SIZE,
    TerritoryId,
};

/// Mutable collaborators bundled for one regulated operation.
///
/// Mirrors the shape of the game: one machine, one roster, one board, one
/// deck, one rule table. Built fresh per call by the session layer.
pub struct Table<'a> {
    pub machine: &'a mut StateMachine,
    pub roster: &'a mut Roster,
    pub board: &'a mut dyn Board,
    pub deck: &'a mut dyn Deck,
    pub rules: &'a dyn RuleValues,
}

/// Position within the two-player setup micro-turn.
///
/// Two own placements, then one placement for the neutral dummy. Derived
/// from the current action window rather than stored, so the persisted form
/// needs no extra field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetupStep {
    FirstOwn,
    SecondOwn,
    NeutralPlacement,
}

impl SetupStep {
    fn from_offset(offset: u32) -> Option<Self> {
        match offset {
            1 => Some(Self::FirstOwn),
            2 => Some(Self::SecondOwn),
            3 => Some(Self::NeutralPlacement),
            _ => None,
        }
    }
}

/// Rule-enforcing regulator bound to exactly one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Regulator {
    actions_counter: u32,
    prev_action_count: u32,
    current_actions_limit: u32,
    reward: Option<Card>,
    initialized: bool,
}

impl Default for Regulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Regulator {
    pub fn new() -> Self {
        Self {
            actions_counter: 0,
            prev_action_count: 0,
            current_actions_limit: 0,
            reward: None,
            initialized: false,
        }
    }

    /// Rebuilds a regulator from persisted fields. [`Self::bind`] must run
    /// before the first operation.
    pub(crate) fn from_parts(
        actions_counter: u32,
        prev_action_count: u32,
        current_actions_limit: u32,
        reward: Option<Card>,
    ) -> Self {
        Self {
            actions_counter,
            prev_action_count,
            current_actions_limit,
            reward,
            initialized: false,
        }
    }

    /// Monotonic count of regulated actions since game start.
    pub fn actions_counter(&self) -> u32 {
        self.actions_counter
    }

    /// Checkpoint marking the start of the current phase's action window.
    pub fn prev_action_count(&self) -> u32 {
        self.prev_action_count
    }

    /// Threshold at which the phase or round auto-advances.
    pub fn current_actions_limit(&self) -> u32 {
        self.current_actions_limit
    }

    /// Actions taken within the current phase window. Never negative by
    /// construction: the checkpoint only ever moves up to the counter.
    pub fn phase_actions(&self) -> u32 {
        self.actions_counter - self.prev_action_count
    }

    /// The pending reward card, if a conquest earned one.
    pub fn reward(&self) -> Option<&Card> {
        self.reward.as_ref()
    }

    /// One-time setup: computes the initial action limit from the
    /// per-player-count lookup and, for two-player games, runs the
    /// automatic territory pre-assignment and checkpoints the counter.
    pub fn initialize(&mut self, table: &mut Table<'_>, seed: u64) -> Result<Vec<RuleEvent>, RuleError> {
        if self.initialized {
            return Err(RuleError::AlreadyInitialized);
        }
        self.current_actions_limit = table.rules.initial_actions_limit(table.machine.num_players());
        if table.machine.current_phase() == GamePhase::TwoPlayerSetup {
            setup::assign_two_player_territories(table.board, table.roster, seed)?;
            self.prev_action_count = self.actions_counter;
        }
        self.initialized = true;
        let mut events = Vec::new();
        self.react(table, &mut events)?;
        Ok(events)
    }

    /// Re-attaches a freshly loaded regulator to its loaded machine.
    ///
    /// The persisted form carries no subscription state, so a load ends
    /// with this instead of [`Self::initialize`]; first-time side effects
    /// (limit lookup, auto-assignment) must not run again.
    pub fn bind(&mut self, machine: &mut StateMachine) {
        machine.take_changes();
        self.initialized = true;
    }

    /// Places one army, phase-dispatched across the two setup phases and
    /// `Place`.
    pub fn claim_or_reinforce(
        &mut self,
        table: &mut Table<'_>,
        territory: TerritoryId,
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        let mut events = Vec::new();
        match table.machine.current_phase() {
            GamePhase::DefaultSetup => self.setup_placement(table, territory)?,
            GamePhase::TwoPlayerSetup => self.two_player_placement(table, territory)?,
            GamePhase::Place => {
                let player = table.machine.player_turn();
                self.player_entry(table.roster, player)?.spend_pool(1)?;
                table.board.reinforce(territory, 1);
                self.actions_counter += 1;
                self.check_action_limit(table.machine)?;
            }
            phase => {
                return Err(RuleError::WrongPhase {
                    operation: "claim_or_reinforce",
                    phase: phase.into(),
                });
            }
        }
        self.react(table, &mut events)?;
        Ok(events)
    }

    /// Claim-then-reinforce placement for three or more players.
    fn setup_placement(
        &mut self,
        table: &mut Table<'_>,
        territory: TerritoryId,
    ) -> Result<(), RuleError> {
        let player = table.machine.player_turn();
        self.player_entry(table.roster, player)?.spend_pool(1)?;

        if table.machine.stage_two() {
            table.board.reinforce(territory, 1);
        } else if table.board.claims(player, territory, 1) {
            self.player_entry(table.roster, player)?.add_territory(territory);
        }

        self.actions_counter += 1;
        // Claiming is complete once every territory could have been taken;
        // the rest of the window reinforces.
        if !table.machine.stage_two()
            && self.actions_counter >= u32::from(table.board.territory_count())
        {
            table.machine.set_stage_two(true);
        }
        self.check_action_limit(table.machine)?;
        if table.machine.current_phase() == GamePhase::DefaultSetup {
            table.machine.increment_player_turn()?;
        }
        Ok(())
    }

    /// The fixed three-step micro-turn of two-player setup: two armies for
    /// the current player, one for the neutral dummy.
    fn two_player_placement(
        &mut self,
        table: &mut Table<'_>,
        territory: TerritoryId,
    ) -> Result<(), RuleError> {
        let player = table.machine.player_turn();
        let offset = self.actions_counter + 1 - self.prev_action_count;
        let step =
            SetupStep::from_offset(offset).ok_or(RuleError::SetupStepOutOfRange(offset))?;

        if matches!(step, SetupStep::FirstOwn | SetupStep::SecondOwn) {
            self.player_entry(table.roster, player)?.spend_pool(1)?;
        }
        table.board.reinforce(territory, 1);
        self.actions_counter += 1;

        match step {
            SetupStep::FirstOwn => {}
            SetupStep::SecondOwn => table.machine.set_stage_two(true),
            SetupStep::NeutralPlacement => {
                table.machine.set_stage_two(false);
                table.machine.increment_player_turn()?;
                self.prev_action_count = self.actions_counter;
            }
        }
        self.check_action_limit(table.machine)
    }

    /// Transfers `count` armies between two territories. The caller has
    /// already validated the amount; only the `Move` phase spends an action.
    pub fn move_armies(
        &mut self,
        table: &mut Table<'_>,
        source: TerritoryId,
        target: TerritoryId,
        count: u32,
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        let mut events = Vec::new();
        table.board.reinforce(source, -(count as i32));
        table.board.reinforce(target, count as i32);
        if table.machine.current_phase() == GamePhase::Move {
            self.actions_counter += 1;
            self.check_action_limit(table.machine)?;
            self.react(table, &mut events)?;
        }
        Ok(events)
    }

    /// Resolves one battle from pre-paired, descending-sorted dice.
    ///
    /// One battle is one action regardless of dice count. Conquest
    /// transfers ownership, draws at most one pending reward card, and may
    /// eliminate the defender or end the game.
    pub fn battle(
        &mut self,
        table: &mut Table<'_>,
        source: TerritoryId,
        target: TerritoryId,
        pairs: &[DicePair],
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        let mut events = Vec::new();
        let attacker = table
            .board
            .owner(source)
            .ok_or(RuleError::UnownedTerritory(source))?;
        let defender = table.board.owner(target);
        let outcome = battle::resolve(pairs, table.board.armies(target));

        if outcome.conquered {
            if let Some(loser) = defender {
                self.player_entry(table.roster, loser)?.remove_territory(target);
            }
            self.player_entry(table.roster, attacker)?.add_territory(target);
            table.board.conquer(source, target, attacker);

            if self.reward.is_none() {
                if let Some(card) = table.deck.draw() {
                    self.reward = Some(card);
                    events.push(RuleEvent::RewardDrawn { player: attacker });
                }
            }

            if let Some(loser) = defender {
                if self.player_entry(table.roster, loser)?.territory_count() == 0 {
                    table.machine.disable_player(loser);
                    events.push(RuleEvent::PlayerEliminated { player: loser });
                }
            }
            let owned = self.player_entry(table.roster, attacker)?.territory_count();
            if owned == usize::from(table.board.territory_count()) {
                table.machine.declare_winner(attacker);
                events.push(RuleEvent::GameWon { player: attacker });
            }
        }

        table.board.reinforce(source, -(outcome.attacker_losses as i32));
        table.board.reinforce(target, -(outcome.defender_losses as i32));

        self.actions_counter += 1;
        self.check_action_limit(table.machine)?;
        self.react(table, &mut events)?;
        Ok(events)
    }

    /// Whether `player` may trade the cards at `indices` right now.
    ///
    /// No mutation occurs. False unless the player holds the turn, at
    /// least three distinct in-range indices are given, every selected
    /// card is individually tradeable with a resolvable owning set, and
    /// every distinct owning set independently validates the selection.
    pub fn can_trade_in_cards(
        &self,
        machine: &StateMachine,
        roster: &Roster,
        player: PlayerId,
        indices: &[usize],
    ) -> bool {
        if machine.player_turn() != player || indices.len() < TRADE_SIZE {
            return false;
        }
        let mut distinct = indices.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != indices.len() {
            return false;
        }
        let Some(entry) = roster.player(player) else {
            return false;
        };
        let mut picks = Vec::with_capacity(indices.len());
        for &index in indices {
            match entry.hand().get(index) {
                Some(card) if card.is_tradeable() => picks.push(card),
                _ => return false,
            }
        }
        let mut sets = Vec::new();
        for card in &picks {
            match card.card_set() {
                Some(set) if !sets.contains(&set) => sets.push(set),
                Some(_) => {}
                None => return false,
            }
        }
        sets.iter().all(|set| set.is_valid_trade(&picks))
    }

    /// Surrenders a matching card set for an army bonus.
    ///
    /// Credits the trade-schedule bonus to the pool, widens the action
    /// limit by the same amount, and discards the cards by descending
    /// index. A single matched territory among the traded cards' targets
    /// gets the fixed bonus immediately; several matches defer the choice
    /// to the caller via [`RuleEvent::ChooseTradeBonus`].
    pub fn trade_in_cards(
        &mut self,
        table: &mut Table<'_>,
        player: PlayerId,
        indices: &[usize],
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        if !self.can_trade_in_cards(table.machine, table.roster, player, indices) {
            return Err(RuleError::InvalidTrade);
        }
        let mut events = Vec::new();
        table.machine.increment_num_trades(1);
        let bonus = table.rules.trade_bonus(table.machine.num_trades());

        // Descending removal keeps the remaining indices valid.
        let mut order = indices.to_vec();
        order.sort_unstable_by(|a, b| b.cmp(a));
        let mut traded = Vec::with_capacity(order.len());
        {
            let entry = self.player_entry(table.roster, player)?;
            entry.credit_pool(bonus);
            for index in order {
                if let Some(card) = entry.remove_card(index) {
                    traded.push(card);
                }
            }
        }
        self.current_actions_limit += bonus;

        let entry = table
            .roster
            .player(player)
            .ok_or(RuleError::PlayerOutOfRange(player.0))?;
        let mut candidates: Vec<TerritoryId> = traded
            .iter()
            .flat_map(|card| card.targets().iter().copied())
            .filter(|&territory| entry.controls(territory))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        match candidates.as_slice() {
            [] => {}
            [only] => table
                .board
                .reinforce(*only, table.rules.territory_trade_bonus() as i32),
            _ => events.push(RuleEvent::ChooseTradeBonus { player, candidates }),
        }

        self.react(table, &mut events)?;
        Ok(events)
    }

    /// Answers a deferred [`RuleEvent::ChooseTradeBonus`] by reinforcing
    /// the chosen territory with the fixed bonus. Unconditional by
    /// contract; callers only invoke it in response to the choice request.
    pub fn award_trade_in_bonus(
        &mut self,
        table: &mut Table<'_>,
        territory: TerritoryId,
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        table
            .board
            .reinforce(territory, table.rules.territory_trade_bonus() as i32);
        Ok(Vec::new())
    }

    /// Moves the pending reward card into the turn-holder's hand. No-op
    /// when no reward is pending.
    pub fn deliver_card_reward(
        &mut self,
        table: &mut Table<'_>,
    ) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        let mut events = Vec::new();
        if let Some(card) = self.reward.take() {
            let player = table.machine.player_turn();
            self.player_entry(table.roster, player)?.add_card(card);
            events.push(RuleEvent::RewardDelivered { player });
        }
        Ok(events)
    }

    /// Player-driven phase advance, used to leave `Attack` or `Move` early.
    pub fn end_phase(&mut self, table: &mut Table<'_>) -> Result<Vec<RuleEvent>, RuleError> {
        self.ensure_initialized()?;
        let mut events = Vec::new();
        table.machine.increment_phase()?;
        self.react(table, &mut events)?;
        Ok(events)
    }

    fn ensure_initialized(&self) -> Result<(), RuleError> {
        if self.initialized {
            Ok(())
        } else {
            Err(RuleError::NotInitialized)
        }
    }

    fn player_entry<'r>(
        &self,
        roster: &'r mut Roster,
        player: PlayerId,
    ) -> Result<&'r mut crate::state::Player, RuleError> {
        roster
            .player_mut(player)
            .ok_or(RuleError::PlayerOutOfRange(player.0))
    }

    /// Auto-advance once the action window is spent: rounds end during
    /// setup, phases end afterwards.
    fn check_action_limit(&mut self, machine: &mut StateMachine) -> Result<(), RuleError> {
        if self.actions_counter >= self.current_actions_limit {
            if machine.current_phase().is_setup() {
                machine.increment_round()?;
            } else {
                machine.increment_phase()?;
            }
        }
        Ok(())
    }

    /// Drains the machine's change outbox, forwarding each change as an
    /// event and reacting to phase entries. Reactions may queue further
    /// changes; the loop runs until the outbox is quiescent.
    fn react(
        &mut self,
        table: &mut Table<'_>,
        events: &mut Vec<RuleEvent>,
    ) -> Result<(), RuleError> {
        loop {
            let changes = table.machine.take_changes();
            if changes.is_empty() {
                return Ok(());
            }
            for change in changes {
                events.push(RuleEvent::Changed(change));
                if change == StateChange::CurrentPhase {
                    self.on_phase_entered(table, events)?;
                }
            }
        }
    }

    /// Phase-entry reaction. Entering `Place` opens a fresh action window
    /// sized by the turn-holder's derived army bonus; entering `Attack`
    /// clears stage two; entering `Move` permits exactly one move.
    fn on_phase_entered(
        &mut self,
        table: &mut Table<'_>,
        events: &mut Vec<RuleEvent>,
    ) -> Result<(), RuleError> {
        match table.machine.current_phase() {
            GamePhase::Place => {
                self.prev_action_count = self.actions_counter;
                self.current_actions_limit = self.actions_counter;
                let player = table.machine.player_turn();
                let bonus = table.board.army_bonus(player);
                let entry = self.player_entry(table.roster, player)?;
                entry.credit_pool(bonus);
                self.current_actions_limit += bonus;
                if CardSet::has_trade_set(entry.hand()) {
                    events.push(RuleEvent::TradePrompt {
                        player,
                        forced: entry.hand().len() >= 5,
                    });
                }
            }
            GamePhase::Attack => table.machine.set_stage_two(false),
            GamePhase::Move => {
                self.current_actions_limit = self.actions_counter + 1;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TerritoryLedger;
    use crate::state::{CardDeck, Insignia};

    /// Small deterministic rule table so tests can drive full setups.
    struct TestRules {
        setup_limit: u32,
        pool: u32,
    }

    impl RuleValues for TestRules {
        fn initial_actions_limit(&self, _num_players: u8) -> u32 {
            self.setup_limit
        }

        fn initial_army_pool(&self, _num_players: u8) -> u32 {
            self.pool
        }

        fn trade_bonus(&self, num_trades: u32) -> u32 {
            crate::rules::StandardRules.trade_bonus(num_trades)
        }

        fn territory_trade_bonus(&self) -> u32 {
            2
        }
    }

    struct Fixture {
        machine: StateMachine,
        roster: Roster,
        ledger: TerritoryLedger,
        deck: CardDeck,
        rules: TestRules,
        regulator: Regulator,
    }

    impl Fixture {
        fn new(num_players: u8, slots: u8, territories: u16, rules: TestRules) -> Self {
            Self {
                machine: StateMachine::new(num_players).unwrap(),
                roster: Roster::new(slots, rules.pool),
                ledger: TerritoryLedger::new(territories),
                deck: CardDeck::from_cards(vec![
                    Card::new(Insignia::Cavalry, vec![TerritoryId(1)]),
                    Card::new(Insignia::Infantry, vec![TerritoryId(0)]),
                ]),
                rules,
                regulator: Regulator::new(),
            }
        }

        fn with<R>(&mut self, f: impl FnOnce(&mut Regulator, &mut Table<'_>) -> R) -> R {
            let mut table = Table {
                machine: &mut self.machine,
                roster: &mut self.roster,
                board: &mut self.ledger,
                deck: &mut self.deck,
                rules: &self.rules,
            };
            f(&mut self.regulator, &mut table)
        }

        fn initialize(&mut self, seed: u64) -> Vec<RuleEvent> {
            self.with(|r, t| r.initialize(t, seed)).unwrap()
        }

        fn claim(&mut self, territory: u16) -> Vec<RuleEvent> {
            self.with(|r, t| r.claim_or_reinforce(t, TerritoryId(territory)))
                .unwrap()
        }
    }

    #[test]
    fn operations_require_initialization() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 9, pool: 3 });
        let err = fx.with(|r, t| r.claim_or_reinforce(t, TerritoryId(0)));
        assert_eq!(err, Err(RuleError::NotInitialized));
        fx.initialize(1);
        let err = fx.with(|r, t| r.initialize(t, 1));
        assert_eq!(err, Err(RuleError::AlreadyInitialized));
    }

    #[test]
    fn default_setup_claims_rotate_then_reinforce() {
        let mut fx = Fixture::new(3, 3, 4, TestRules { setup_limit: 9, pool: 3 });
        fx.initialize(0);

        // First four actions claim; the claimers rotate 0,1,2,0.
        for t in 0..4 {
            fx.claim(t);
        }
        assert_eq!(fx.ledger.owner(TerritoryId(0)), Some(PlayerId(0)));
        assert_eq!(fx.ledger.owner(TerritoryId(1)), Some(PlayerId(1)));
        assert_eq!(fx.ledger.owner(TerritoryId(2)), Some(PlayerId(2)));
        assert_eq!(fx.ledger.owner(TerritoryId(3)), Some(PlayerId(0)));
        assert!(fx.machine.stage_two());

        // Fifth action reinforces instead of claiming.
        fx.claim(0);
        assert_eq!(fx.ledger.armies(TerritoryId(0)), 2);
        assert_eq!(fx.regulator.actions_counter(), 5);
    }

    #[test]
    fn setup_limit_starts_round_one_and_grants_place_bonus() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 3, pool: 3 });
        fx.initialize(0);
        for t in 0..3 {
            fx.claim(t);
        }
        assert_eq!(fx.machine.round(), 1);
        assert_eq!(fx.machine.current_phase(), GamePhase::Place);
        assert_eq!(fx.machine.player_turn(), PlayerId(0));
        // Floor bonus of 3 was credited and sized the placement window.
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().army_pool(), 2 + 3);
        assert_eq!(fx.regulator.current_actions_limit(), 3 + 3);
        assert_eq!(fx.regulator.phase_actions(), 0);
    }

    #[test]
    fn full_turn_place_attack_move_rotates_to_next_player() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 3, pool: 3 });
        fx.initialize(0);
        for t in 0..3 {
            fx.claim(t);
        }

        // Place: spend the whole window; the last placement flips to Attack.
        for _ in 0..3 {
            fx.claim(0);
        }
        assert_eq!(fx.machine.current_phase(), GamePhase::Attack);
        assert_eq!(fx.ledger.armies(TerritoryId(0)), 4);

        // One battle is one action, which spends the attack window.
        fx.with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(1), &[(1, 6)]))
            .unwrap();
        assert_eq!(fx.machine.current_phase(), GamePhase::Move);

        // Exactly one move is permitted before the turn passes.
        fx.with(|r, t| r.move_armies(t, TerritoryId(0), TerritoryId(2), 1))
            .unwrap();
        assert_eq!(fx.machine.current_phase(), GamePhase::Place);
        assert_eq!(fx.machine.player_turn(), PlayerId(1));
        assert!(fx.regulator.phase_actions() <= fx.regulator.actions_counter());
    }

    #[test]
    fn two_player_micro_turn_places_two_own_then_one_neutral() {
        let mut fx = Fixture::new(2, 3, 6, TestRules { setup_limit: 12, pool: 10 });
        fx.initialize(5);

        // Auto-assignment seeded two territories per slot at one army each.
        for slot in [PlayerId(0), PlayerId(1), PlayerId::DUMMY] {
            assert_eq!(fx.roster.player(slot).unwrap().territory_count(), 2);
            assert_eq!(fx.roster.player(slot).unwrap().army_pool(), 8);
        }

        let own = fx.roster.player(PlayerId(0)).unwrap().territories().next().unwrap();
        fx.claim(own.0);
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().army_pool(), 7);
        assert!(!fx.machine.stage_two());

        fx.claim(own.0);
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().army_pool(), 6);
        assert!(fx.machine.stage_two());

        // Neutral placement: no pool spend, turn passes, window resets.
        let neutral = fx.roster.player(PlayerId::DUMMY).unwrap().territories().next().unwrap();
        fx.claim(neutral.0);
        assert!(!fx.machine.stage_two());
        assert_eq!(fx.machine.player_turn(), PlayerId(1));
        assert_eq!(fx.regulator.phase_actions(), 0);
        assert_eq!(fx.roster.player(PlayerId::DUMMY).unwrap().army_pool(), 8);
    }

    #[test]
    fn conquest_draws_at_most_one_pending_reward() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        fx.machine.set_phase(GamePhase::Attack);
        fx.machine.take_changes();
        fx.ledger.claims(PlayerId(0), TerritoryId(0), 5);
        fx.ledger.claims(PlayerId(1), TerritoryId(1), 2);
        fx.ledger.claims(PlayerId(1), TerritoryId(2), 1);
        fx.roster.player_mut(PlayerId(0)).unwrap().add_territory(TerritoryId(0));
        fx.roster.player_mut(PlayerId(1)).unwrap().add_territory(TerritoryId(1));
        fx.roster.player_mut(PlayerId(1)).unwrap().add_territory(TerritoryId(2));

        let events = fx
            .with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(1), &[(6, 4), (5, 3)]))
            .unwrap();
        assert!(events.contains(&RuleEvent::RewardDrawn { player: PlayerId(0) }));
        assert_eq!(fx.ledger.owner(TerritoryId(1)), Some(PlayerId(0)));
        assert_eq!(fx.ledger.armies(TerritoryId(1)), 0);
        assert!(fx.regulator.reward().is_some());
        let deck_before = fx.deck.remaining();

        // Second conquest while a reward is pending draws nothing more.
        fx.machine.set_phase(GamePhase::Attack);
        fx.machine.take_changes();
        let events = fx
            .with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(2), &[(6, 1)]))
            .unwrap();
        assert!(!events.iter().any(|e| matches!(e, RuleEvent::RewardDrawn { .. })));
        assert_eq!(fx.deck.remaining(), deck_before);

        // The defender lost their last territory and the attacker the game.
        assert!(events.contains(&RuleEvent::PlayerEliminated { player: PlayerId(1) }));
        assert!(events.contains(&RuleEvent::GameWon { player: PlayerId(0) }));
        assert_eq!(fx.machine.winner(), Some(PlayerId(0)));
        assert_eq!(fx.machine.current_phase(), GamePhase::GameOver);
        assert!(!fx.machine.active_players().contains_slot(1));
    }

    #[test]
    fn tie_battle_costs_the_attacker() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        fx.ledger.claims(PlayerId(0), TerritoryId(0), 3);
        fx.ledger.claims(PlayerId(1), TerritoryId(1), 2);
        fx.with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(1), &[(3, 3)]))
            .unwrap();
        assert_eq!(fx.ledger.armies(TerritoryId(0)), 2);
        assert_eq!(fx.ledger.armies(TerritoryId(1)), 2);
        assert_eq!(fx.ledger.owner(TerritoryId(1)), Some(PlayerId(1)));
    }

    #[test]
    fn battle_from_unowned_source_is_rejected() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        let err = fx.with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(1), &[(6, 1)]));
        assert_eq!(err, Err(RuleError::UnownedTerritory(TerritoryId(0))));
        assert_eq!(fx.regulator.actions_counter(), 0);
    }

    fn trade_fixture() -> Fixture {
        let mut fx = Fixture::new(3, 3, 8, TestRules { setup_limit: 100, pool: 10 });
        fx.initialize(0);
        let hand = [
            Card::new(Insignia::Infantry, vec![TerritoryId(0)]),
            Card::new(Insignia::Infantry, vec![TerritoryId(1)]),
            Card::new(Insignia::Infantry, vec![TerritoryId(2)]),
        ];
        for card in hand {
            fx.roster.player_mut(PlayerId(0)).unwrap().add_card(card);
        }
        fx
    }

    #[test]
    fn trade_requires_turn_holder_and_three_distinct_cards() {
        let fx = trade_fixture();
        let r = &fx.regulator;
        assert!(!r.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(1), &[0, 1, 2]));
        assert!(!r.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(0), &[0, 1]));
        assert!(!r.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(0), &[0, 1, 1]));
        assert!(!r.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(0), &[0, 1, 7]));
        assert!(r.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(0), &[0, 1, 2]));
    }

    #[test]
    fn untradeable_cards_block_the_selection() {
        let mut fx = trade_fixture();
        let entry = fx.roster.player_mut(PlayerId(0)).unwrap();
        let card = entry.remove_card(2).unwrap().with_tradeable(false);
        entry.add_card(card);
        assert!(!fx.regulator.can_trade_in_cards(&fx.machine, &fx.roster, PlayerId(0), &[0, 1, 2]));
    }

    #[test]
    fn trade_in_credits_bonus_and_discards_descending() {
        let mut fx = trade_fixture();
        let limit_before = fx.regulator.current_actions_limit();
        fx.with(|r, t| r.trade_in_cards(t, PlayerId(0), &[0, 1, 2])).unwrap();
        assert_eq!(fx.machine.num_trades(), 1);
        // First trade pays 4 and widens the placement window by 4.
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().army_pool(), 14);
        assert_eq!(fx.regulator.current_actions_limit(), limit_before + 4);
        assert!(fx.roster.player(PlayerId(0)).unwrap().hand().is_empty());
    }

    #[test]
    fn single_matched_territory_gets_immediate_bonus() {
        let mut fx = trade_fixture();
        fx.ledger.claims(PlayerId(0), TerritoryId(1), 1);
        fx.roster.player_mut(PlayerId(0)).unwrap().add_territory(TerritoryId(1));
        let events = fx
            .with(|r, t| r.trade_in_cards(t, PlayerId(0), &[0, 1, 2]))
            .unwrap();
        assert!(!events.iter().any(|e| matches!(e, RuleEvent::ChooseTradeBonus { .. })));
        assert_eq!(fx.ledger.armies(TerritoryId(1)), 3);
    }

    #[test]
    fn multiple_matched_territories_defer_the_bonus() {
        let mut fx = trade_fixture();
        for t in [TerritoryId(0), TerritoryId(2)] {
            fx.ledger.claims(PlayerId(0), t, 1);
            fx.roster.player_mut(PlayerId(0)).unwrap().add_territory(t);
        }
        let events = fx
            .with(|r, t| r.trade_in_cards(t, PlayerId(0), &[0, 1, 2]))
            .unwrap();
        assert!(events.contains(&RuleEvent::ChooseTradeBonus {
            player: PlayerId(0),
            candidates: vec![TerritoryId(0), TerritoryId(2)],
        }));
        assert_eq!(fx.ledger.armies(TerritoryId(0)), 1);

        fx.with(|r, t| r.award_trade_in_bonus(t, TerritoryId(2))).unwrap();
        assert_eq!(fx.ledger.armies(TerritoryId(2)), 3);
    }

    #[test]
    fn invalid_trade_leaves_state_unchanged() {
        let mut fx = trade_fixture();
        let err = fx.with(|r, t| r.trade_in_cards(t, PlayerId(0), &[0, 1]));
        assert_eq!(err, Err(RuleError::InvalidTrade));
        assert_eq!(fx.machine.num_trades(), 0);
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().hand().len(), 3);
    }

    #[test]
    fn reward_delivery_is_idempotent() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        fx.ledger.claims(PlayerId(0), TerritoryId(0), 5);
        fx.ledger.claims(PlayerId(1), TerritoryId(1), 1);
        fx.roster.player_mut(PlayerId(0)).unwrap().add_territory(TerritoryId(0));
        fx.roster.player_mut(PlayerId(1)).unwrap().add_territory(TerritoryId(1));
        fx.with(|r, t| r.battle(t, TerritoryId(0), TerritoryId(1), &[(6, 1)]))
            .unwrap();
        assert!(fx.regulator.reward().is_some());

        let events = fx.with(|r, t| r.deliver_card_reward(t)).unwrap();
        assert!(events.contains(&RuleEvent::RewardDelivered { player: PlayerId(0) }));
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().hand().len(), 1);
        assert!(fx.regulator.reward().is_none());

        let events = fx.with(|r, t| r.deliver_card_reward(t)).unwrap();
        assert!(events.is_empty());
        assert_eq!(fx.roster.player(PlayerId(0)).unwrap().hand().len(), 1);
    }

    #[test]
    fn claim_is_rejected_outside_placement_phases() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        fx.machine.set_phase(GamePhase::Attack);
        fx.machine.take_changes();
        let err = fx.with(|r, t| r.claim_or_reinforce(t, TerritoryId(0)));
        assert_eq!(
            err,
            Err(RuleError::WrongPhase {
                operation: "claim_or_reinforce",
                phase: "attack",
            })
        );
    }

    #[test]
    fn move_outside_move_phase_spends_no_action() {
        let mut fx = Fixture::new(3, 3, 3, TestRules { setup_limit: 100, pool: 3 });
        fx.initialize(0);
        fx.ledger.claims(PlayerId(0), TerritoryId(0), 5);
        fx.with(|r, t| r.move_armies(t, TerritoryId(0), TerritoryId(1), 2))
            .unwrap();
        assert_eq!(fx.regulator.actions_counter(), 0);
        assert_eq!(fx.ledger.armies(TerritoryId(0)), 3);
        assert_eq!(fx.ledger.armies(TerritoryId(1)), 2);
    }
}
