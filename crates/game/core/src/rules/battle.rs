//! Battle resolution.
//!
//! Pure function from paired dice outcomes to army losses and conquest.
//! The caller pairs the dice: both sides sorted descending, truncated to
//! the shorter side. Extra attacker dice beyond the defender's count are
//! ignored rather than inflicting unopposed losses.

use arrayvec::ArrayVec;

/// Maximum exchanges in one battle (attacker rolls at most three dice).
pub const MAX_PAIRS: usize = 3;

/// One pre-paired exchange: attacker roll vs defender roll.
pub type DicePair = (u8, u8);

/// A battle's pre-paired, pre-sorted dice.
pub type DicePairs = ArrayVec<DicePair, MAX_PAIRS>;

/// Army losses and conquest determination for one battle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleOutcome {
    /// Armies the attacker loses from the source territory.
    pub attacker_losses: u32,
    /// Armies the defender loses from the target territory.
    pub defender_losses: u32,
    /// True when the defender's cumulative losses reach the target
    /// territory's army count.
    pub conquered: bool,
}

/// Resolves paired dice against a territory holding `defender_armies`.
///
/// For each pair the attacker wins the exchange only on a strictly higher
/// roll; ties favor the defender.
pub fn resolve(pairs: &[DicePair], defender_armies: u32) -> BattleOutcome {
    let mut outcome = BattleOutcome::default();
    for &(attack, defense) in pairs {
        if attack > defense {
            outcome.defender_losses += 1;
        } else {
            outcome.attacker_losses += 1;
        }
    }
    outcome.conquered = outcome.defender_losses >= defender_armies;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attacker_wins_strictly_higher_exchanges() {
        let outcome = resolve(&[(6, 5), (4, 3)], 5);
        assert_eq!(outcome.defender_losses, 2);
        assert_eq!(outcome.attacker_losses, 0);
        assert!(!outcome.conquered);
    }

    #[test]
    fn ties_favor_the_defender() {
        let outcome = resolve(&[(3, 3)], 2);
        assert_eq!(outcome.attacker_losses, 1);
        assert_eq!(outcome.defender_losses, 0);
        assert!(!outcome.conquered);
    }

    #[test]
    fn split_exchanges_split_losses() {
        let outcome = resolve(&[(6, 2), (3, 5)], 3);
        assert_eq!(outcome.defender_losses, 1);
        assert_eq!(outcome.attacker_losses, 1);
    }

    #[test]
    fn conquest_when_losses_reach_garrison() {
        let outcome = resolve(&[(6, 4), (5, 3)], 2);
        assert_eq!(outcome.defender_losses, 2);
        assert!(outcome.conquered);
    }

    #[test]
    fn empty_territory_falls_to_any_attack() {
        // An unowned, empty territory is conquered with zero exchanges won.
        let outcome = resolve(&[(1, 6)], 0);
        assert!(outcome.conquered);
        assert_eq!(outcome.attacker_losses, 1);
    }

    #[test]
    fn no_pairs_no_losses() {
        let outcome = resolve(&[], 3);
        assert_eq!(outcome, BattleOutcome {
            attacker_losses: 0,
            defender_losses: 0,
            conquered: false,
        });
    }
}
