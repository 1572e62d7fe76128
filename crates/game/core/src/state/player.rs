//! Player bookkeeping: army pool, controlled territories, and hand.
//!
//! The regulator never edits these collections directly; it goes through the
//! mutation methods here so territory uniqueness and pool bounds hold no
//! matter which rule path performed the mutation.

use std::collections::BTreeSet;

use crate::error::RuleError;
use crate::state::{Card, PlayerId, TerritoryId};

/// One player slot, including the neutral dummy in two-player games.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    number: PlayerId,
    army_pool: u32,
    territories: BTreeSet<TerritoryId>,
    hand: Vec<Card>,
}

impl Player {
    pub fn new(number: PlayerId, army_pool: u32) -> Self {
        Self {
            number,
            army_pool,
            territories: BTreeSet::new(),
            hand: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        number: PlayerId,
        army_pool: u32,
        territories: BTreeSet<TerritoryId>,
        hand: Vec<Card>,
    ) -> Self {
        Self {
            number,
            army_pool,
            territories,
            hand,
        }
    }

    pub fn number(&self) -> PlayerId {
        self.number
    }

    pub fn army_pool(&self) -> u32 {
        self.army_pool
    }

    pub fn territories(&self) -> impl Iterator<Item = TerritoryId> + '_ {
        self.territories.iter().copied()
    }

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    pub fn controls(&self, territory: TerritoryId) -> bool {
        self.territories.contains(&territory)
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    /// Removes `amount` armies from the pool.
    pub fn spend_pool(&mut self, amount: u32) -> Result<(), RuleError> {
        if self.army_pool < amount {
            return Err(RuleError::EmptyArmyPool {
                player: self.number,
            });
        }
        self.army_pool -= amount;
        Ok(())
    }

    /// Adds `amount` armies to the pool.
    pub fn credit_pool(&mut self, amount: u32) {
        self.army_pool += amount;
    }

    /// Adds a territory to the controlled set. Returns false if it was
    /// already controlled.
    pub fn add_territory(&mut self, territory: TerritoryId) -> bool {
        self.territories.insert(territory)
    }

    /// Removes a territory from the controlled set. Returns false if it was
    /// not controlled.
    pub fn remove_territory(&mut self, territory: TerritoryId) -> bool {
        self.territories.remove(&territory)
    }

    /// Appends a card to the ordered hand.
    pub fn add_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Removes and returns the card at `index`, or `None` out of range.
    pub fn remove_card(&mut self, index: usize) -> Option<Card> {
        if index < self.hand.len() {
            Some(self.hand.remove(index))
        } else {
            None
        }
    }
}

/// The player collection for one game.
///
/// Two-player games carry a third, neutral slot ([`PlayerId::DUMMY`]) that
/// owns territories but never rotates into the turn order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Builds a roster of `slots` players, each starting with `army_pool`
    /// armies. Two-player games pass `slots = 3` to include the dummy.
    pub fn new(slots: u8, army_pool: u32) -> Self {
        let players = (0..slots)
            .map(|n| Player::new(PlayerId(n), army_pool))
            .collect();
        Self { players }
    }

    pub(crate) fn from_players(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id.0))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(usize::from(id.0))
    }
}
