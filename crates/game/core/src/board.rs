//! The board collaborator interface.
//!
//! The regulator never sees geography; it talks to a [`Board`] through the
//! narrow claim / reinforce / conquer surface plus read access to per
//! territory ownership and army counts. [`TerritoryLedger`] is the concrete
//! in-memory implementation used by the runtime and by tests; adjacency is
//! someone else's problem.

use crate::state::{PlayerId, TerritoryId};

/// Mutable view of territory ownership and army counts.
pub trait Board {
    /// Number of territories on the board.
    fn territory_count(&self) -> u16;

    /// Current owner of a territory, `None` while unclaimed.
    fn owner(&self, territory: TerritoryId) -> Option<PlayerId>;

    /// Armies stationed on a territory. Unknown territories report 0.
    fn armies(&self, territory: TerritoryId) -> u32;

    /// First-claim: assigns an unowned territory to `player` at `armies`.
    ///
    /// Returns false without mutating anything when the territory is
    /// already owned or does not exist.
    fn claims(&mut self, player: PlayerId, territory: TerritoryId, armies: u32) -> bool;

    /// Adjusts a territory's army count by `delta`, clamping at zero.
    fn reinforce(&mut self, territory: TerritoryId, delta: i32);

    /// Transfers ownership of `target` to `new_owner` after a battle won
    /// from `source`.
    fn conquer(&mut self, source: TerritoryId, target: TerritoryId, new_owner: PlayerId);

    /// Derived per-turn army bonus for `player`: territory share plus any
    /// continent bonuses.
    fn army_bonus(&self, player: PlayerId) -> u32;
}

/// A named territory group granting a bonus when fully controlled.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Continent {
    pub territories: Vec<TerritoryId>,
    pub bonus: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct TerritoryState {
    owner: Option<PlayerId>,
    armies: u32,
}

/// In-memory ownership and army ledger.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TerritoryLedger {
    territories: Vec<TerritoryState>,
    continents: Vec<Continent>,
}

impl TerritoryLedger {
    /// An all-unclaimed ledger of `count` territories with no continents.
    pub fn new(count: u16) -> Self {
        Self {
            territories: vec![TerritoryState::default(); usize::from(count)],
            continents: Vec::new(),
        }
    }

    pub fn with_continents(mut self, continents: Vec<Continent>) -> Self {
        self.continents = continents;
        self
    }

    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    /// Minimum per-turn bonus regardless of territory share.
    const FLOOR_BONUS: u32 = 3;

    /// One bonus army per this many controlled territories.
    const TERRITORY_DIVISOR: u32 = 3;

    pub(crate) fn set_state(
        &mut self,
        territory: TerritoryId,
        owner: Option<PlayerId>,
        armies: u32,
    ) {
        if let Some(slot) = self.territories.get_mut(usize::from(territory.0)) {
            slot.owner = owner;
            slot.armies = armies;
        }
    }

    fn owned_count(&self, player: PlayerId) -> u32 {
        self.territories
            .iter()
            .filter(|t| t.owner == Some(player))
            .count() as u32
    }
}

impl Board for TerritoryLedger {
    fn territory_count(&self) -> u16 {
        self.territories.len() as u16
    }

    fn owner(&self, territory: TerritoryId) -> Option<PlayerId> {
        self.territories
            .get(usize::from(territory.0))
            .and_then(|t| t.owner)
    }

    fn armies(&self, territory: TerritoryId) -> u32 {
        self.territories
            .get(usize::from(territory.0))
            .map(|t| t.armies)
            .unwrap_or(0)
    }

    fn claims(&mut self, player: PlayerId, territory: TerritoryId, armies: u32) -> bool {
        match self.territories.get_mut(usize::from(territory.0)) {
            Some(slot) if slot.owner.is_none() => {
                slot.owner = Some(player);
                slot.armies = armies;
                true
            }
            _ => false,
        }
    }

    fn reinforce(&mut self, territory: TerritoryId, delta: i32) {
        if let Some(slot) = self.territories.get_mut(usize::from(territory.0)) {
            slot.armies = slot.armies.saturating_add_signed(delta);
        }
    }

    fn conquer(&mut self, _source: TerritoryId, target: TerritoryId, new_owner: PlayerId) {
        if let Some(slot) = self.territories.get_mut(usize::from(target.0)) {
            slot.owner = Some(new_owner);
        }
    }

    fn army_bonus(&self, player: PlayerId) -> u32 {
        let share = (self.owned_count(player) / Self::TERRITORY_DIVISOR).max(Self::FLOOR_BONUS);
        let continents: u32 = self
            .continents
            .iter()
            .filter(|c| {
                !c.territories.is_empty()
                    && c.territories.iter().all(|&t| self.owner(t) == Some(player))
            })
            .map(|c| c.bonus)
            .sum();
        share + continents
    }
}
