//! Phase and turn bookkeeping for one game.
//!
//! [`StateMachine`] owns every field that drives turn rotation. Each mutator
//! records a [`StateChange`] into an internal outbox when the value actually
//! changed; the regulator drains the outbox after every transition step and
//! reacts to phase entries. This replaces an observer callback with an
//! auditable apply-then-react pipeline: nothing fires mid-mutation, and a
//! reaction that mutates the machine simply queues further changes for the
//! same drain loop.

use bitflags::bitflags;

use crate::error::RuleError;
use crate::state::{GamePhase, PhaseAdvance, PlayerId};

bitflags! {
    /// One bit per player slot, set while the player is still in the game.
    ///
    /// Persisted as a single byte, which is why the width is fixed at the
    /// six-player maximum.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PlayerSet: u8 {
        const P0 = 1 << 0;
        const P1 = 1 << 1;
        const P2 = 1 << 2;
        const P3 = 1 << 3;
        const P4 = 1 << 4;
        const P5 = 1 << 5;
    }
}

impl PlayerSet {
    /// Set containing the first `n` slots.
    pub fn first_n(n: u8) -> Self {
        Self::from_bits_truncate((1u8 << n.min(6)) - 1)
    }

    /// Single-slot set, empty for out-of-range slots.
    pub fn slot(index: u8) -> Self {
        Self::from_bits_truncate(1u8.checked_shl(u32::from(index)).unwrap_or(0))
    }

    /// Whether the given slot is active.
    pub fn contains_slot(&self, index: u8) -> bool {
        index < 6 && self.contains(Self::slot(index))
    }

    /// Circular search for the next active slot strictly after `current`.
    ///
    /// Wraps once around `num_players` slots; `None` when no bit is set.
    pub fn next_after(&self, current: u8, num_players: u8) -> Option<u8> {
        (1..=num_players)
            .map(|step| (current + step) % num_players)
            .find(|&slot| self.contains_slot(slot))
    }

    /// Circular search for the first active slot at or after `start`.
    pub fn first_from(&self, start: u8, num_players: u8) -> Option<u8> {
        (0..num_players)
            .map(|step| (start + step) % num_players)
            .find(|&slot| self.contains_slot(slot))
    }
}

/// Name of a machine field whose value just changed.
///
/// The payload-free design is deliberate: reactors read the new value from
/// the machine itself, so a change can never carry a stale snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum StateChange {
    CurrentPhase,
    StageTwo,
    PlayerTurn,
    Round,
    NumTrades,
    Winner,
    ActivePlayers,
}

/// Phase, turn, and round state for a single game.
#[derive(Clone, Debug, PartialEq)]
pub struct StateMachine {
    num_players: u8,
    current_phase: GamePhase,
    stage_two: bool,
    player_turn: u8,
    round: u32,
    num_trades: u32,
    winner: Option<PlayerId>,
    active: PlayerSet,
    changes: Vec<StateChange>,
}

impl StateMachine {
    /// Creates a machine for `num_players` (2..=6) players.
    ///
    /// Two-player games start in [`GamePhase::TwoPlayerSetup`]; larger games
    /// start in [`GamePhase::DefaultSetup`].
    pub fn new(num_players: u8) -> Result<Self, RuleError> {
        if !(2..=6).contains(&num_players) {
            return Err(RuleError::PlayerOutOfRange(num_players));
        }
        let phase = if num_players == 2 {
            GamePhase::TwoPlayerSetup
        } else {
            GamePhase::DefaultSetup
        };
        Ok(Self {
            num_players,
            current_phase: phase,
            stage_two: false,
            player_turn: 0,
            round: 0,
            num_trades: 0,
            winner: None,
            active: PlayerSet::first_n(num_players),
            changes: Vec::new(),
        })
    }

    /// Rebuilds a machine from persisted fields. No changes are queued.
    pub(crate) fn from_parts(
        num_players: u8,
        active: PlayerSet,
        stage_two: bool,
        current_phase: GamePhase,
        player_turn: u8,
        round: u32,
        num_trades: u32,
        winner: Option<PlayerId>,
    ) -> Self {
        Self {
            num_players,
            current_phase,
            stage_two,
            player_turn,
            round,
            num_trades,
            winner,
            active,
            changes: Vec::new(),
        }
    }

    pub fn num_players(&self) -> u8 {
        self.num_players
    }

    pub fn current_phase(&self) -> GamePhase {
        self.current_phase
    }

    pub fn stage_two(&self) -> bool {
        self.stage_two
    }

    pub fn player_turn(&self) -> PlayerId {
        PlayerId(self.player_turn)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn num_trades(&self) -> u32 {
        self.num_trades
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn active_players(&self) -> PlayerSet {
        self.active
    }

    /// Drains the queued change notifications in mutation order.
    pub fn take_changes(&mut self) -> Vec<StateChange> {
        core::mem::take(&mut self.changes)
    }

    /// Advances the phase ring.
    ///
    /// Stage two always clears first. `Move` has no successor within the
    /// turn, so it delegates to [`Self::increment_player_turn`]; the two
    /// terminal-adjacent phases hold.
    pub fn increment_phase(&mut self) -> Result<(), RuleError> {
        self.set_stage_two(false);
        match self.current_phase.successor() {
            PhaseAdvance::Next(next) => {
                self.set_phase(next);
                Ok(())
            }
            PhaseAdvance::EndOfTurn => self.increment_player_turn(),
            PhaseAdvance::Hold => Ok(()),
        }
    }

    /// Rotates the turn to the next active player.
    ///
    /// During setup, a turn index at or past `num_players` wraps to slot 0.
    /// Outside setup the same condition escalates to a round advance;
    /// otherwise the next active player takes over and the phase is forced
    /// to `Place`.
    pub fn increment_player_turn(&mut self) -> Result<(), RuleError> {
        if self.current_phase.is_setup() {
            if self.player_turn >= self.num_players {
                self.set_player_turn(0);
            } else {
                let next = self
                    .active
                    .next_after(self.player_turn, self.num_players)
                    .ok_or(RuleError::NoActivePlayers)?;
                self.set_player_turn(next);
            }
            Ok(())
        } else if self.player_turn >= self.num_players {
            self.increment_round()
        } else {
            let next = self
                .active
                .next_after(self.player_turn, self.num_players)
                .ok_or(RuleError::NoActivePlayers)?;
            self.set_player_turn(next);
            self.set_phase(GamePhase::Place);
            Ok(())
        }
    }

    /// Starts a new round: first active player from slot 0 takes the turn
    /// in the `Place` phase.
    pub fn increment_round(&mut self) -> Result<(), RuleError> {
        self.set_stage_two(false);
        let first = self
            .first_active_from(0)?
            .ok_or(RuleError::NoActivePlayers)?;
        self.set_player_turn(first);
        self.set_phase(GamePhase::Place);
        self.set_round(self.round + 1);
        Ok(())
    }

    /// First active slot at or after `start`, wrapping once.
    ///
    /// A start index outside the player range is a precondition violation.
    pub fn first_active_from(&self, start: u8) -> Result<Option<u8>, RuleError> {
        if start >= self.num_players {
            return Err(RuleError::PlayerOutOfRange(start));
        }
        Ok(self.active.first_from(start, self.num_players))
    }

    /// Removes a player from all future turn rotation.
    ///
    /// Out-of-range slots are silently ignored.
    pub fn disable_player(&mut self, player: PlayerId) {
        if !self.active.contains_slot(player.0) {
            return;
        }
        self.active.remove(PlayerSet::slot(player.0));
        self.changes.push(StateChange::ActivePlayers);
    }

    /// Pure additive update of the global trade counter.
    pub fn increment_num_trades(&mut self, delta: u32) {
        if delta == 0 {
            return;
        }
        self.num_trades += delta;
        self.changes.push(StateChange::NumTrades);
    }

    /// Records the winner and parks the machine in `GameOver`.
    pub fn declare_winner(&mut self, player: PlayerId) {
        if self.winner != Some(player) {
            self.winner = Some(player);
            self.changes.push(StateChange::Winner);
        }
        self.set_phase(GamePhase::GameOver);
    }

    pub(crate) fn set_phase(&mut self, phase: GamePhase) {
        if self.current_phase != phase {
            self.current_phase = phase;
            self.changes.push(StateChange::CurrentPhase);
        }
    }

    pub(crate) fn set_stage_two(&mut self, stage_two: bool) {
        if self.stage_two != stage_two {
            self.stage_two = stage_two;
            self.changes.push(StateChange::StageTwo);
        }
    }

    fn set_player_turn(&mut self, slot: u8) {
        if self.player_turn != slot {
            self.player_turn = slot;
            self.changes.push(StateChange::PlayerTurn);
        }
    }

    fn set_round(&mut self, round: u32) {
        if self.round != round {
            self.round = round;
            self.changes.push(StateChange::Round);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(n: u8) -> StateMachine {
        StateMachine::new(n).unwrap()
    }

    #[test]
    fn rejects_out_of_range_player_counts() {
        assert!(StateMachine::new(1).is_err());
        assert!(StateMachine::new(7).is_err());
        assert!(StateMachine::new(2).is_ok());
        assert!(StateMachine::new(6).is_ok());
    }

    #[test]
    fn two_player_games_start_in_two_player_setup() {
        assert_eq!(machine(2).current_phase(), GamePhase::TwoPlayerSetup);
        assert_eq!(machine(3).current_phase(), GamePhase::DefaultSetup);
    }

    #[test]
    fn phase_ring_returns_to_place_within_four_advances() {
        for start in [GamePhase::DefaultSetup, GamePhase::Place, GamePhase::Attack] {
            let mut m = machine(3);
            m.set_phase(start);
            m.take_changes();
            let mut advances = 0;
            loop {
                m.increment_phase().unwrap();
                advances += 1;
                if m.current_phase() == GamePhase::Place && advances > 0 {
                    break;
                }
                assert!(advances <= 4, "ring did not close from {start:?}");
            }
        }
    }

    #[test]
    fn two_player_setup_skips_default_setup() {
        let mut m = machine(2);
        m.increment_phase().unwrap();
        assert_eq!(m.current_phase(), GamePhase::Place);
    }

    #[test]
    fn move_phase_delegates_to_turn_advance() {
        let mut m = machine(3);
        m.set_phase(GamePhase::Move);
        m.take_changes();
        m.increment_phase().unwrap();
        assert_eq!(m.current_phase(), GamePhase::Place);
        assert_eq!(m.player_turn(), PlayerId(1));
    }

    #[test]
    fn turn_advance_skips_disabled_players() {
        let mut m = machine(4);
        m.set_phase(GamePhase::Move);
        m.disable_player(PlayerId(1));
        m.disable_player(PlayerId(2));
        m.increment_player_turn().unwrap();
        assert_eq!(m.player_turn(), PlayerId(3));
    }

    #[test]
    fn setup_turn_advance_wraps_without_forcing_place() {
        let mut m = machine(3);
        m.increment_player_turn().unwrap();
        assert_eq!(m.player_turn(), PlayerId(1));
        assert_eq!(m.current_phase(), GamePhase::DefaultSetup);
        m.increment_player_turn().unwrap();
        m.increment_player_turn().unwrap();
        assert_eq!(m.player_turn(), PlayerId(0));
    }

    #[test]
    fn all_players_disabled_makes_turn_advance_fatal() {
        let mut m = machine(3);
        m.set_phase(GamePhase::Attack);
        for p in 0..3 {
            m.disable_player(PlayerId(p));
        }
        assert_eq!(m.increment_player_turn(), Err(RuleError::NoActivePlayers));
        assert_eq!(m.increment_round(), Err(RuleError::NoActivePlayers));
    }

    #[test]
    fn round_advance_resets_to_first_active_player() {
        let mut m = machine(4);
        m.disable_player(PlayerId(0));
        m.increment_round().unwrap();
        assert_eq!(m.player_turn(), PlayerId(1));
        assert_eq!(m.current_phase(), GamePhase::Place);
        assert_eq!(m.round(), 1);
    }

    #[test]
    fn first_active_search_validates_start_index() {
        let m = machine(3);
        assert_eq!(
            m.first_active_from(3),
            Err(RuleError::PlayerOutOfRange(3))
        );
        assert_eq!(m.first_active_from(1).unwrap(), Some(1));
    }

    #[test]
    fn disable_ignores_out_of_range_slots() {
        let mut m = machine(3);
        m.take_changes();
        m.disable_player(PlayerId(9));
        assert!(m.take_changes().is_empty());
        assert_eq!(m.active_players(), PlayerSet::first_n(3));
    }

    #[test]
    fn idempotent_sets_do_not_notify() {
        let mut m = machine(3);
        m.take_changes();
        m.set_phase(GamePhase::DefaultSetup);
        m.set_stage_two(false);
        m.increment_num_trades(0);
        assert!(m.take_changes().is_empty());
    }

    #[test]
    fn mutations_notify_by_field_name() {
        let mut m = machine(3);
        m.take_changes();
        m.set_phase(GamePhase::Place);
        m.set_stage_two(true);
        m.increment_num_trades(1);
        assert_eq!(
            m.take_changes(),
            vec![
                StateChange::CurrentPhase,
                StateChange::StageTwo,
                StateChange::NumTrades
            ]
        );
        assert_eq!(StateChange::CurrentPhase.to_string(), "current_phase");
    }

    #[test]
    fn circular_searches_wrap_once() {
        let set = PlayerSet::P0 | PlayerSet::P2;
        assert_eq!(set.next_after(2, 4), Some(0));
        assert_eq!(set.next_after(0, 4), Some(2));
        assert_eq!(set.first_from(3, 4), Some(0));
        assert_eq!(PlayerSet::empty().next_after(0, 4), None);
        assert_eq!(PlayerSet::empty().first_from(0, 4), None);
    }
}
