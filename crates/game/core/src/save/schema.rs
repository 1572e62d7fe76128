//! Persisted field schemas, one [`Persist`] impl per stateful component.
//!
//! Field orders are load-bearing: saves written by older builds decode
//! only if these sequences stay stable. The state machine and regulator
//! keep their legacy layouts, including the numeric phase code and the
//! `0 | 1` reward-present flag with the card block following inline.

use std::str::FromStr;

use crate::board::{Board, TerritoryLedger};
use crate::rules::Regulator;
use crate::save::{FieldReader, FieldWriter, Persist, SaveError};
use crate::state::{
    Card, CardDeck, GamePhase, Insignia, Player, PlayerId, PlayerSet, Roster, StateMachine,
    TerritoryId,
};

impl Persist for StateMachine {
    const TAG: &'static str = "state_machine";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_i32("num_players", i32::from(self.num_players()));
        writer.write_u8("active_player_bits", self.active_players().bits());
        writer.write_bool("stage_two", self.stage_two());
        writer.write_i32("current_phase", self.current_phase().code());
        writer.write_i32("player_turn", i32::from(self.player_turn().0));
        writer.write_i32("round", self.round() as i32);
        writer.write_i32("num_trades", self.num_trades() as i32);
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let num_players = reader.read_i32("num_players")?;
        let num_players = u8::try_from(num_players)
            .ok()
            .filter(|n| (2..=6).contains(n))
            .ok_or_else(|| SaveError::InvalidValue {
                field: "num_players",
                value: num_players.to_string(),
            })?;
        let bits = reader.read_u8("active_player_bits")?;
        let active = PlayerSet::from_bits(bits).ok_or_else(|| SaveError::InvalidValue {
            field: "active_player_bits",
            value: bits.to_string(),
        })?;
        let stage_two = reader.read_bool("stage_two")?;
        let code = reader.read_i32("current_phase")?;
        let phase = GamePhase::from_code(code).ok_or_else(|| SaveError::InvalidValue {
            field: "current_phase",
            value: code.to_string(),
        })?;
        let turn = reader.read_i32("player_turn")?;
        let player_turn = u8::try_from(turn)
            .ok()
            .filter(|&t| t <= num_players)
            .ok_or_else(|| SaveError::InvalidValue {
                field: "player_turn",
                value: turn.to_string(),
            })?;
        let round = reader.read_count("round")?;
        let num_trades = reader.read_count("num_trades")?;
        // The winner is not part of the legacy layout; a finished game's
        // save reloads in `GameOver` with the winner unrecorded.
        Ok(Self::from_parts(
            num_players,
            active,
            stage_two,
            phase,
            player_turn,
            round,
            num_trades,
            None,
        ))
    }
}

impl Persist for Regulator {
    const TAG: &'static str = "regulator";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_i32("actions_counter", self.actions_counter() as i32);
        writer.write_i32("prev_action_count", self.prev_action_count() as i32);
        writer.write_i32("current_actions_limit", self.current_actions_limit() as i32);
        match self.reward() {
            Some(card) => {
                writer.write_i32("reward_present", 1);
                card.write_fields(writer);
            }
            None => writer.write_i32("reward_present", 0),
        }
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let actions_counter = reader.read_count("actions_counter")?;
        let prev_action_count = reader.read_count("prev_action_count")?;
        let current_actions_limit = reader.read_count("current_actions_limit")?;
        if prev_action_count > actions_counter {
            return Err(SaveError::InvalidValue {
                field: "prev_action_count",
                value: prev_action_count.to_string(),
            });
        }
        let reward = match reader.read_i32("reward_present")? {
            0 => None,
            1 => Some(Card::read_fields(reader)?),
            flag => {
                return Err(SaveError::InvalidValue {
                    field: "reward_present",
                    value: flag.to_string(),
                });
            }
        };
        Ok(Self::from_parts(
            actions_counter,
            prev_action_count,
            current_actions_limit,
            reward,
        ))
    }
}

impl Persist for Card {
    const TAG: &'static str = "card";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_str("insignia", self.insignia().as_ref());
        writer.write_bool("tradeable", self.is_tradeable());
        writer.write_ids("targets", self.targets().iter().map(|t| t.0).collect());
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let raw = reader.read_str("insignia")?;
        let insignia = Insignia::from_str(raw).map_err(|_| SaveError::InvalidValue {
            field: "insignia",
            value: raw.to_owned(),
        })?;
        let tradeable = reader.read_bool("tradeable")?;
        let targets = reader
            .read_ids("targets")?
            .iter()
            .map(|&t| TerritoryId(t))
            .collect();
        Ok(Card::new(insignia, targets).with_tradeable(tradeable))
    }
}

impl Persist for Player {
    const TAG: &'static str = "player";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_u8("number", self.number().0);
        writer.write_i32("army_pool", self.army_pool() as i32);
        writer.write_ids("territories", self.territories().map(|t| t.0).collect());
        writer.write_i32("hand_size", self.hand().len() as i32);
        for card in self.hand() {
            card.write_fields(writer);
        }
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let number = PlayerId(reader.read_u8("number")?);
        let army_pool = reader.read_count("army_pool")?;
        let territories = reader
            .read_ids("territories")?
            .iter()
            .map(|&t| TerritoryId(t))
            .collect();
        let hand_size = reader.read_count("hand_size")?;
        let mut hand = Vec::with_capacity(hand_size as usize);
        for _ in 0..hand_size {
            hand.push(Card::read_fields(reader)?);
        }
        Ok(Player::from_parts(number, army_pool, territories, hand))
    }
}

impl Persist for Roster {
    const TAG: &'static str = "roster";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_i32("player_count", self.len() as i32);
        for player in self.iter() {
            player.write_fields(writer);
        }
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let count = reader.read_count("player_count")?;
        let mut players = Vec::with_capacity(count as usize);
        for _ in 0..count {
            players.push(Player::read_fields(reader)?);
        }
        Ok(Roster::from_players(players))
    }
}

impl Persist for TerritoryLedger {
    const TAG: &'static str = "board";

    // Geography (continent groupings) is static data supplied by the host
    // at construction; only the mutable ownership and army state persists.
    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_i32("territory_count", i32::from(self.territory_count()));
        for index in 0..self.territory_count() {
            let territory = TerritoryId(index);
            let owner = self.owner(territory).map_or(-1, |p| i32::from(p.0));
            writer.write_i32("owner", owner);
            writer.write_i32("armies", self.armies(territory) as i32);
        }
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let count = reader.read_count("territory_count")?;
        let count = u16::try_from(count).map_err(|_| SaveError::InvalidValue {
            field: "territory_count",
            value: count.to_string(),
        })?;
        let mut ledger = TerritoryLedger::new(count);
        for index in 0..count {
            let raw = reader.read_i32("owner")?;
            let owner = if raw == -1 {
                None
            } else {
                let slot = u8::try_from(raw).map_err(|_| SaveError::InvalidValue {
                    field: "owner",
                    value: raw.to_string(),
                })?;
                Some(PlayerId(slot))
            };
            let armies = reader.read_count("armies")?;
            ledger.set_state(TerritoryId(index), owner, armies);
        }
        Ok(ledger)
    }
}

impl Persist for CardDeck {
    const TAG: &'static str = "deck";

    fn write_fields(&self, writer: &mut FieldWriter) {
        writer.write_i32("card_count", self.cards().len() as i32);
        for card in self.cards() {
            card.write_fields(writer);
        }
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, SaveError> {
        let count = reader.read_count("card_count")?;
        let mut cards = Vec::with_capacity(count as usize);
        for _ in 0..count {
            cards.push(Card::read_fields(reader)?);
        }
        Ok(CardDeck::from_cards(cards))
    }
}
