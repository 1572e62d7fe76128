//! Two-player automatic territory pre-assignment.
//!
//! With exactly two human players the board is seeded before the first
//! placement: territories go to player 0, player 1, and the neutral dummy
//! in round-robin random order, each slot receiving `total / 3`. The
//! integer-division remainder is simply never assigned by this loop.

use crate::board::Board;
use crate::error::RuleError;
use crate::rng::{PcgRng, RngOracle, compute_seed};
use crate::state::{PlayerId, Roster, TerritoryId};

/// The three receiving slots, in exhaustion-flag bit order.
const SLOTS: [PlayerId; 3] = [PlayerId(0), PlayerId(1), PlayerId::DUMMY];

/// Distributes `total / 3` territories to each of player 0, player 1, and
/// the dummy, claiming each at one army and paying it from the slot's pool.
///
/// A slot leaves the random draw once its allotment is exhausted; a 3-bit
/// exhaustion flag re-derives the live draw range without re-scanning.
pub fn assign_two_player_territories(
    board: &mut dyn Board,
    roster: &mut Roster,
    seed: u64,
) -> Result<(), RuleError> {
    let total = board.territory_count();
    let share = u32::from(total) / SLOTS.len() as u32;
    let mut remaining = [share; 3];
    let mut exhausted: u8 = if share == 0 { 0b111 } else { 0 };
    let rng = PcgRng;

    for index in 0..total {
        if exhausted == 0b111 {
            break;
        }
        let live = SLOTS.len() as u32 - exhausted.count_ones();
        let pick = rng.range(compute_seed(seed, u64::from(index)), 0, live - 1);
        let slot = nth_live_slot(exhausted, pick);
        let player = SLOTS[slot];
        let territory = TerritoryId(index);

        if board.claims(player, territory, 1) {
            let entry = roster
                .player_mut(player)
                .ok_or(RuleError::PlayerOutOfRange(player.0))?;
            entry.add_territory(territory);
            entry.spend_pool(1)?;
        }

        remaining[slot] -= 1;
        if remaining[slot] == 0 {
            exhausted |= 1 << slot;
        }
    }
    Ok(())
}

/// Index of the `pick`-th slot whose exhaustion bit is clear.
fn nth_live_slot(exhausted: u8, pick: u32) -> usize {
    let mut seen = 0;
    for (slot, _) in SLOTS.iter().enumerate() {
        if exhausted & (1 << slot) == 0 {
            if seen == pick {
                return slot;
            }
            seen += 1;
        }
    }
    // The draw range is derived from the same flag, so this is unreachable.
    SLOTS.len() - 1
}
