//! Numeric rule tables.
//!
//! The regulator consumes these through the [`RuleValues`] trait so variant
//! rule sets can swap the economy without touching the transition logic.

/// Economy knobs consumed by the regulator.
pub trait RuleValues {
    /// Total setup actions for a game of `num_players` players.
    ///
    /// Unmapped player counts default to 0, which ends setup immediately.
    fn initial_actions_limit(&self, num_players: u8) -> u32;

    /// Armies each player starts with in a game of `num_players` players.
    fn initial_army_pool(&self, num_players: u8) -> u32;

    /// Army bonus granted by the `num_trades`-th trade-in (1-based).
    fn trade_bonus(&self, num_trades: u32) -> u32;

    /// Fixed reinforcement placed on a traded card's matched territory.
    fn territory_trade_bonus(&self) -> u32;
}

/// The classic rule numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardRules;

impl StandardRules {
    /// Escalating trade schedule; beyond the table each trade adds 5.
    const TRADE_SCHEDULE: [u32; 6] = [4, 6, 8, 10, 12, 15];

    /// Three placements per two-player micro-turn: two own, one neutral.
    const TWO_PLAYER_CYCLE: u32 = 3;
}

impl RuleValues for StandardRules {
    fn initial_actions_limit(&self, num_players: u8) -> u32 {
        let pool = self.initial_army_pool(num_players);
        match num_players {
            // Two-player setup spends two own armies plus one neutral army
            // per three-action cycle; the auto-assigned armies are already
            // on the board and never become actions.
            2 => pool / 2 * Self::TWO_PLAYER_CYCLE,
            3..=6 => pool * u32::from(num_players),
            _ => 0,
        }
    }

    fn initial_army_pool(&self, num_players: u8) -> u32 {
        match num_players {
            2 => 40,
            3 => 35,
            4 => 30,
            5 => 25,
            6 => 20,
            _ => 0,
        }
    }

    fn trade_bonus(&self, num_trades: u32) -> u32 {
        if num_trades == 0 {
            return 0;
        }
        let index = num_trades as usize - 1;
        match Self::TRADE_SCHEDULE.get(index) {
            Some(&bonus) => bonus,
            None => {
                let last = *Self::TRADE_SCHEDULE.last().expect("non-empty schedule");
                last + 5 * (num_trades - Self::TRADE_SCHEDULE.len() as u32)
            }
        }
    }

    fn territory_trade_bonus(&self) -> u32 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_schedule_escalates_then_grows_linearly() {
        let rules = StandardRules;
        assert_eq!(rules.trade_bonus(1), 4);
        assert_eq!(rules.trade_bonus(2), 6);
        assert_eq!(rules.trade_bonus(6), 15);
        assert_eq!(rules.trade_bonus(7), 20);
        assert_eq!(rules.trade_bonus(9), 30);
    }

    #[test]
    fn setup_limits_scale_with_player_count() {
        let rules = StandardRules;
        assert_eq!(rules.initial_actions_limit(3), 105);
        assert_eq!(rules.initial_actions_limit(4), 120);
        assert_eq!(rules.initial_actions_limit(5), 125);
        assert_eq!(rules.initial_actions_limit(6), 120);
        assert_eq!(rules.initial_actions_limit(2), 60);
        // Unmapped counts end setup immediately.
        assert_eq!(rules.initial_actions_limit(9), 0);
    }
}
