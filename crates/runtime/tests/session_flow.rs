//! End-to-end session scenario: a three-player game driven from setup
//! through the first full turn, with a mid-game save and restore.
//!
//! 1. Setup: 105 placement actions (42 claims, then reinforcements)
//! 2. Round 1 opens in Place with the turn-holder's army bonus
//! 3. Place window spends, Attack resolves one battle, Move ends the turn
//! 4. A snapshot taken mid-game restores into an equivalent session

use conquest_core::{Board, DicePairs, GamePhase, PlayerId, RuleValues, StandardRules, TerritoryId};
use conquest_runtime::{FileSaveRepository, Intent, Session, SessionConfig};

const TERRITORIES: u16 = 42;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn start_three_player_game() -> Session {
    let (session, _) = Session::new(SessionConfig {
        num_players: 3,
        territory_count: TERRITORIES,
        continents: Vec::new(),
        seed: Some(7),
    })
    .unwrap();
    session
}

/// Runs the whole default setup: players rotate one placement at a time,
/// claiming unowned territories first and reinforcing their home territory
/// once every territory is claimed.
fn run_setup(session: &mut Session) {
    let limit = StandardRules.initial_actions_limit(3);
    for action in 0..limit {
        let territory = if action < u32::from(TERRITORIES) {
            TerritoryId(action as u16)
        } else {
            TerritoryId(session.machine().player_turn().0 as u16)
        };
        session
            .dispatch(Intent::ClaimOrReinforce { territory })
            .unwrap();
    }
}

#[test]
fn three_player_game_plays_a_full_first_turn() {
    init_tracing();
    let mut session = start_three_player_game();
    run_setup(&mut session);

    // Setup spent: round 1 opens in Place for player 0 with the bonus for
    // 14 territories (14 / 3 = 4) already in the pool.
    assert_eq!(session.machine().round(), 1);
    assert_eq!(session.machine().current_phase(), GamePhase::Place);
    assert_eq!(session.machine().player_turn(), PlayerId(0));
    let pool = session.roster().player(PlayerId(0)).unwrap().army_pool();
    assert_eq!(pool, 4);

    // Spend the whole placement window on the home territory.
    for _ in 0..4 {
        session
            .dispatch(Intent::ClaimOrReinforce {
                territory: TerritoryId(0),
            })
            .unwrap();
    }
    assert_eq!(session.machine().current_phase(), GamePhase::Attack);

    // One battle spends the attack window: player 1's neighbor absorbs
    // three losses without falling.
    let pairs: DicePairs = [(6, 5), (6, 5), (6, 5)].into_iter().collect();
    let defender_before = session.board().armies(TerritoryId(1));
    session
        .dispatch(Intent::Battle {
            source: TerritoryId(0),
            target: TerritoryId(1),
            pairs,
        })
        .unwrap();
    assert_eq!(session.board().armies(TerritoryId(1)), defender_before - 3);
    assert_eq!(session.board().owner(TerritoryId(1)), Some(PlayerId(1)));
    assert_eq!(session.machine().current_phase(), GamePhase::Move);

    // The single permitted move ends the turn.
    session
        .dispatch(Intent::MoveArmies {
            source: TerritoryId(0),
            target: TerritoryId(3),
            count: 2,
        })
        .unwrap();
    assert_eq!(session.machine().current_phase(), GamePhase::Place);
    assert_eq!(session.machine().player_turn(), PlayerId(1));
}

#[test]
fn mid_game_save_restores_and_continues() {
    init_tracing();
    let mut session = start_three_player_game();
    run_setup(&mut session);

    let dir = tempfile::tempdir().unwrap();
    let repo = FileSaveRepository::new(dir.path()).unwrap();
    repo.save("midgame", &session.snapshot()).unwrap();

    let loaded = repo.load("midgame").unwrap();
    let mut restored = Session::restore(&loaded, Vec::new()).unwrap();
    assert_eq!(restored.snapshot(), session.snapshot());

    // Both sessions accept the same next intent and agree afterwards.
    let intent = Intent::ClaimOrReinforce {
        territory: TerritoryId(0),
    };
    session.dispatch(intent.clone()).unwrap();
    restored.dispatch(intent).unwrap();
    assert_eq!(restored.snapshot(), session.snapshot());
}
