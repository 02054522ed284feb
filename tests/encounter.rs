//! Whole encounters driven through the public API

use soul_maze::content;
use soul_maze::session::{Session, SessionPhase};
use soul_maze::sim::{
    Action, Battle, BattleEvent, BattleState, EncounterHooks, MovementInput, PatternCategory,
};
use soul_maze::Tuning;

fn idle() -> MovementInput {
    MovementInput::default()
}

#[derive(Default)]
struct Host {
    hp_lost: u32,
    ends: Vec<bool>,
}

impl EncounterHooks for Host {
    fn on_player_damaged(&mut self, amount: u32) {
        self.hp_lost += amount;
    }

    fn on_battle_end(&mut self, won: bool) {
        self.ends.push(won);
    }
}

/// Advance in frame-sized steps, delivering events as a host would
fn run_frames(battle: &mut Battle, host: &mut Host, ms: u64) {
    let mut left = ms;
    while left > 0 {
        let step = left.min(17);
        battle.update(step, idle());
        battle.dispatch(host);
        left -= step;
    }
}

#[test]
fn test_miss_cycle_returns_to_choosing() {
    let enemy = content::enemy(2).unwrap();
    let mut battle = Battle::new(enemy, Tuning::default(), 9);
    let mut host = Host::default();

    battle.attack().unwrap();
    // Nobody presses confirm
    run_frames(&mut battle, &mut host, 4000);
    assert_eq!(battle.dialogue(), "* You miss.");
    assert_eq!(battle.enemy_hp(), 4);

    run_frames(&mut battle, &mut host, 1500);
    assert_eq!(battle.state(), BattleState::EnemyTurn);
    run_frames(&mut battle, &mut host, 5000);
    assert_eq!(battle.state(), BattleState::Choosing);
    assert_eq!(battle.dialogue(), "* Forgotten Echo watches you curiously.");
    assert!(host.ends.is_empty());
}

#[test]
fn test_victory_reported_after_exact_delay() {
    let enemy = content::enemy(1).unwrap();
    let mut battle = Battle::new(enemy, Tuning::default(), 9);
    let mut host = Host::default();

    battle.attack().unwrap();
    battle.update(500, idle());
    battle.confirm_attack().unwrap();
    assert_eq!(battle.state(), BattleState::BattleVictory);
    let won_at = battle.now() + 3000;

    while host.ends.is_empty() {
        battle.update(1, idle());
        battle.dispatch(&mut host);
        assert_ne!(battle.state(), BattleState::EnemyTurn);
    }
    assert_eq!(battle.now(), won_at);
    assert_eq!(host.ends, vec![true]);
}

#[test]
fn test_switching_enemy_leaves_no_spawn_timers() {
    let mut battle = Battle::new(content::enemy(4).unwrap(), Tuning::default(), 9);
    battle.act().unwrap();
    battle.check().unwrap();
    battle.update(6000, idle());
    let arena = battle.arena().unwrap();
    assert_eq!(arena.pattern_cycle().category(), PatternCategory::Guardian);
    assert!(battle.pending_timers() > 1);

    battle.start_encounter(content::enemy(5).unwrap());
    assert_eq!(battle.pending_timers(), 0);
    assert!(battle.arena().is_none());

    // Nothing from the boss turn comes back
    battle.update(20_000, idle());
    assert_eq!(battle.state(), BattleState::Choosing);
    assert!(
        battle
            .drain_events()
            .iter()
            .all(|e| !matches!(e, BattleEvent::Ended { .. }))
    );
}

#[test]
fn test_refused_spare_then_befriend() {
    let mut battle = Battle::new(content::enemy(3).unwrap(), Tuning::default(), 9);
    let mut host = Host::default();

    battle.mercy().unwrap();
    battle.spare().unwrap();
    run_frames(&mut battle, &mut host, 2000);
    assert_eq!(battle.state(), BattleState::EnemyTurn);
    run_frames(&mut battle, &mut host, 5000);
    assert!(host.ends.is_empty());

    battle.act().unwrap();
    battle.talk().unwrap();
    run_frames(&mut battle, &mut host, 9000);
    battle.mercy().unwrap();
    battle.spare().unwrap();
    run_frames(&mut battle, &mut host, 2000);
    assert_eq!(host.ends, vec![true]);
}

#[test]
fn test_same_seed_same_battle() {
    let play = || {
        let mut battle = Battle::new(content::enemy(4).unwrap(), Tuning::default(), 1234);
        let mut host = Host::default();
        battle.act().unwrap();
        battle.check().unwrap();
        let held = MovementInput {
            left: true,
            up: true,
            ..MovementInput::default()
        };
        for _ in 0..700 {
            battle.update(17, held);
            battle.dispatch(&mut host);
        }
        (host.hp_lost, battle.snapshot(20, 20))
    };
    assert_eq!(play(), play());
}

#[test]
fn test_session_flee_and_return() {
    let mut session = Session::with_builtin_roster(Tuning::default(), 3);
    assert!(session.encounter_next());
    session.perform(Action::Mercy).unwrap();
    session.perform(Action::Flee).unwrap();
    assert_eq!(session.phase(), SessionPhase::Exploring);
    assert_eq!(session.player().hp, session.player().max_hp);
    assert_eq!(session.next_enemy().map(|e| e.id), Some(1));
}

#[test]
fn test_snapshot_json_for_presentation() {
    let mut session = Session::with_builtin_roster(Tuning::default(), 3);
    session.encounter(2);
    let json = serde_json::to_value(session.snapshot().unwrap()).unwrap();
    assert_eq!(json["state"], "CHOOSING");
    assert_eq!(json["enemyName"], "Forgotten Echo");
    assert_eq!(json["playerHp"], 20);
    assert_eq!(json["canSpare"], false);
    assert!(json["projectiles"].as_array().unwrap().is_empty());
}
