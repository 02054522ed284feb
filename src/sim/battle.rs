//! Turn-based battle state machine
//!
//! Drives one encounter at a time:
//! - the command menu (Fight, Act, Mercy and their sub-choices)
//! - the accuracy gauge during the player's attack
//! - the dodge arena during the enemy's turn
//!
//! Every delayed transition is a keyed timer on the battle's own [`Scheduler`]. Taking an
//! action, starting an encounter or unmounting cancels all of them, and each timer handler
//! checks that the battle is still in the state that armed it before acting.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::accuracy::{AccuracyGauge, AttackOutcome};
use super::arena::{Arena, ArenaEvent, MovementInput};
use super::enemy::EnemyRecord;
use super::scheduler::Scheduler;
use crate::error::BattleError;
use crate::tuning::Tuning;

/// Where the battle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleState {
    /// Top-level menu
    Choosing,
    /// Act submenu (Check, Talk, Back)
    ChoosingAct,
    /// Mercy submenu (Spare, Flee, Back)
    Mercy,
    /// A line is on screen; input is locked until the next transition
    Dialogue,
    /// Accuracy gauge running, or its result on screen
    PlayerAttack,
    /// Dodge arena running
    EnemyTurn,
    /// Enemy defeated, outcome pending
    BattleVictory,
}

/// Player commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Attack,
    Act,
    Mercy,
    Check,
    Talk,
    Spare,
    Flee,
    Back,
    Confirm,
}

/// Delayed transitions, keyed by what they lead to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BattleTimer {
    /// Unconfirmed gauge resolves as a miss
    AttackTimeout,
    /// Hit feedback over, enemy attacks
    FeedbackOver,
    /// Dialogue over, enemy attacks
    DialogueOver,
    /// Enemy turn over, back to the menu
    TurnOver,
    /// Report the outcome to the host
    Finish { won: bool },
}

/// Something the host needs to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    PlayerDamaged(u32),
    Ended { won: bool },
}

/// Host callbacks for one encounter
pub trait EncounterHooks {
    fn on_player_damaged(&mut self, amount: u32);
    /// Called exactly once per encounter
    fn on_battle_end(&mut self, won: bool);
}

/// Projectile as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub rotation: Option<f32>,
}

/// The soul as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoulView {
    pub x: f32,
    pub y: f32,
    pub invincible: bool,
}

/// Everything needed to draw one frame of the battle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    pub state: BattleState,
    pub dialogue: String,
    pub enemy_name: String,
    pub enemy_hp: u32,
    pub enemy_max_hp: u32,
    pub is_boss: bool,
    pub player_hp: u32,
    pub player_max_hp: u32,
    pub can_spare: bool,
    pub enemy_hit: bool,
    /// Present while the arena is mounted
    pub soul: Option<SoulView>,
    pub projectiles: Vec<ProjectileView>,
    /// Left edge of the gauge marker while attacking
    pub marker: Option<f32>,
}

fn appear_line(name: &str) -> String {
    format!("* {name} appears before you.")
}

fn idle_line(name: &str) -> String {
    format!("* {name} watches you curiously.")
}

fn refusal_line(name: &str) -> String {
    format!("* {name} is not ready to be spared yet.")
}

const ACT_LINE: &str = "* What will you do?";
const MERCY_LINE: &str = "* Your mercy is your strength.";
const MISS_LINE: &str = "* You miss.";

/// One battle, reused across encounters
#[derive(Debug, Clone)]
pub struct Battle {
    enemy: EnemyRecord,
    tuning: Tuning,
    state: BattleState,
    dialogue: String,
    enemy_hp: u32,
    can_spare: bool,
    enemy_hit: bool,
    timers: Scheduler<BattleTimer>,
    arena: Option<Arena>,
    gauge: Option<AccuracyGauge>,
    /// Seeds each arena mount
    rng: Pcg32,
    events: Vec<BattleEvent>,
    ended: bool,
    mounted: bool,
}

impl Battle {
    /// Start a battle against `enemy` at virtual time 0
    pub fn new(enemy: EnemyRecord, tuning: Tuning, seed: u64) -> Self {
        let mut battle = Self {
            dialogue: String::new(),
            enemy_hp: enemy.max_hp,
            enemy,
            tuning,
            state: BattleState::Choosing,
            can_spare: false,
            enemy_hit: false,
            timers: Scheduler::new(0),
            arena: None,
            gauge: None,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            ended: false,
            mounted: true,
        };
        let enemy = battle.enemy.clone();
        battle.start_encounter(enemy);
        battle
    }

    /// Switch to a new enemy, dropping everything the previous encounter left running
    pub fn start_encounter(&mut self, enemy: EnemyRecord) {
        self.teardown();
        log::info!(
            "encounter: {} (hp {}, {} patterns{})",
            enemy.name,
            enemy.max_hp,
            enemy.pattern.as_str(),
            if enemy.is_boss { ", boss" } else { "" }
        );
        self.enemy_hp = enemy.max_hp;
        self.dialogue = appear_line(&enemy.name);
        self.enemy = enemy;
        self.state = BattleState::Choosing;
        self.can_spare = false;
        self.enemy_hit = false;
        self.ended = false;
        self.mounted = true;
    }

    // Commands

    pub fn attack(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Attack, &[BattleState::Choosing])?;
        self.timers.cancel_all();
        self.set_state(BattleState::PlayerAttack);
        self.dialogue.clear();
        self.gauge = Some(AccuracyGauge::start(self.timers.now(), &self.tuning));
        self.timers
            .schedule_once(BattleTimer::AttackTimeout, self.tuning.attack_timeout_ms);
        Ok(())
    }

    pub fn act(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Act, &[BattleState::Choosing])?;
        self.timers.cancel_all();
        self.set_state(BattleState::ChoosingAct);
        self.dialogue = ACT_LINE.to_string();
        Ok(())
    }

    pub fn mercy(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Mercy, &[BattleState::Choosing])?;
        self.timers.cancel_all();
        self.set_state(BattleState::Mercy);
        self.dialogue = MERCY_LINE.to_string();
        Ok(())
    }

    /// Read the enemy's stats; makes it spareable for the rest of the encounter
    pub fn check(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Check, &[BattleState::ChoosingAct])?;
        let line = self.enemy.dialogue.check.clone();
        self.open_up(line);
        Ok(())
    }

    /// Talk to the enemy; makes it spareable for the rest of the encounter
    pub fn talk(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Talk, &[BattleState::ChoosingAct])?;
        let line = self.enemy.dialogue.talk.clone();
        self.open_up(line);
        Ok(())
    }

    fn open_up(&mut self, line: String) {
        self.timers.cancel_all();
        self.can_spare = true;
        self.dialogue = line;
        self.set_state(BattleState::Dialogue);
        self.timers
            .schedule_once(BattleTimer::DialogueOver, self.tuning.dialogue_delay_ms);
    }

    /// Win peacefully if Check or Talk came first, otherwise the enemy refuses and attacks
    pub fn spare(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Spare, &[BattleState::Mercy])?;
        self.timers.cancel_all();
        self.set_state(BattleState::Dialogue);
        if self.can_spare {
            self.dialogue = self.enemy.dialogue.spare.clone();
            self.timers.schedule_once(
                BattleTimer::Finish { won: true },
                self.tuning.spare_delay_ms,
            );
        } else {
            log::debug!("{} refused to be spared", self.enemy.name);
            self.dialogue = refusal_line(&self.enemy.name);
            self.timers
                .schedule_once(BattleTimer::DialogueOver, self.tuning.refusal_delay_ms);
        }
        Ok(())
    }

    /// Run away; the battle ends at once as a loss
    pub fn flee(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Flee, &[BattleState::Mercy])?;
        self.finish(false);
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), BattleError> {
        self.guard(Action::Back, &[BattleState::ChoosingAct, BattleState::Mercy])?;
        self.timers.cancel_all();
        self.set_state(BattleState::Choosing);
        self.dialogue = idle_line(&self.enemy.name);
        Ok(())
    }

    /// Stop the gauge marker. Confirmations after the first are accepted and ignored.
    pub fn confirm_attack(&mut self) -> Result<(), BattleError> {
        self.guard(
            Action::Confirm,
            &[BattleState::PlayerAttack, BattleState::BattleVictory],
        )?;
        let now = self.timers.now();
        let Some(outcome) = self.gauge.as_mut().and_then(|g| g.confirm(now)) else {
            log::trace!("attack already resolved, confirmation ignored");
            return Ok(());
        };
        self.resolve_attack(outcome);
        Ok(())
    }

    /// Dispatch a command by value
    pub fn perform(&mut self, action: Action) -> Result<(), BattleError> {
        match action {
            Action::Attack => self.attack(),
            Action::Act => self.act(),
            Action::Mercy => self.mercy(),
            Action::Check => self.check(),
            Action::Talk => self.talk(),
            Action::Spare => self.spare(),
            Action::Flee => self.flee(),
            Action::Back => self.back(),
            Action::Confirm => self.confirm_attack(),
        }
    }

    // Time

    /// Advance the virtual clock by `dt_ms`, firing due transitions and running the arena.
    ///
    /// The arena is brought up to each transition's due time before the transition fires,
    /// so an enemy turn runs for exactly its duration.
    pub fn update(&mut self, dt_ms: u64, input: MovementInput) {
        if !self.mounted || self.ended {
            return;
        }
        let until = self.timers.now().saturating_add(dt_ms);

        while let Some(at) = self.timers.next_due().filter(|&at| at <= until) {
            self.advance_arena(at, input);
            if let Some(timer) = self.timers.pop_due(at) {
                self.fire(timer);
            }
        }

        self.advance_arena(until, input);
        self.timers.advance_clock(until);
    }

    fn advance_arena(&mut self, until: u64, input: MovementInput) {
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let mut hits = Vec::new();
        arena.advance_to(until, input, &mut hits);
        for hit in hits {
            match hit {
                ArenaEvent::PlayerHit { damage } => {
                    self.events.push(BattleEvent::PlayerDamaged(damage));
                }
            }
        }
    }

    fn fire(&mut self, timer: BattleTimer) {
        match (timer, self.state) {
            (BattleTimer::AttackTimeout, BattleState::PlayerAttack) => {
                let now = self.timers.now();
                if let Some(outcome) = self.gauge.as_mut().and_then(|g| g.expire(now)) {
                    log::debug!("attack gauge timed out");
                    self.resolve_attack(outcome);
                }
            }
            (BattleTimer::FeedbackOver, BattleState::PlayerAttack) => {
                self.enemy_hit = false;
                self.begin_enemy_turn();
            }
            (BattleTimer::DialogueOver, BattleState::Dialogue) => self.begin_enemy_turn(),
            (BattleTimer::TurnOver, BattleState::EnemyTurn) => self.end_enemy_turn(),
            (
                BattleTimer::Finish { won },
                BattleState::Dialogue | BattleState::BattleVictory,
            ) => self.finish(won),
            (timer, state) => {
                log::warn!("stale {:?} timer ignored in {:?}", timer, state);
            }
        }
    }

    // Transitions

    fn resolve_attack(&mut self, outcome: AttackOutcome) {
        if !matches!(
            self.state,
            BattleState::PlayerAttack | BattleState::Choosing
        ) {
            log::warn!("attack resolved late in {:?}, ignored", self.state);
            return;
        }
        self.timers.cancel_all();

        let damage = outcome.damage;
        self.enemy_hp = self.enemy_hp.saturating_sub(damage);
        if damage > 0 {
            self.enemy_hit = true;
        }
        log::info!(
            "{:?} for {} damage, {} hp {}/{}",
            outcome.quality,
            damage,
            self.enemy.name,
            self.enemy_hp,
            self.enemy.max_hp
        );

        if self.enemy_hp == 0 {
            self.set_state(BattleState::BattleVictory);
            self.dialogue = self.enemy.dialogue.defeat.clone();
            self.timers.schedule_once(
                BattleTimer::Finish { won: true },
                self.tuning.victory_delay_ms,
            );
        } else {
            self.dialogue = if damage > 0 {
                format!("* You deal {damage} damage!")
            } else {
                MISS_LINE.to_string()
            };
            self.timers
                .schedule_once(BattleTimer::FeedbackOver, self.tuning.hit_feedback_ms);
        }
    }

    fn begin_enemy_turn(&mut self) {
        self.set_state(BattleState::EnemyTurn);
        self.dialogue = format!("* {}", self.enemy.dialogue.attack);
        self.gauge = None;

        let now = self.timers.now();
        let seed = self.rng.random::<u64>();
        self.arena = Some(Arena::mount(
            self.enemy.pattern,
            self.enemy.damage,
            &self.tuning,
            now,
            seed,
        ));
        self.timers.schedule_once(
            BattleTimer::TurnOver,
            self.tuning.enemy_turn_for(self.enemy.is_boss),
        );
    }

    fn end_enemy_turn(&mut self) {
        self.drop_arena();
        self.set_state(BattleState::Choosing);
        self.dialogue = idle_line(&self.enemy.name);
    }

    /// Report the outcome once and stop everything
    fn finish(&mut self, won: bool) {
        if self.ended {
            return;
        }
        self.teardown();
        self.ended = true;
        log::info!(
            "battle with {} ended: {}",
            self.enemy.name,
            if won { "won" } else { "fled" }
        );
        self.events.push(BattleEvent::Ended { won });
    }

    fn set_state(&mut self, state: BattleState) {
        if self.state != state {
            log::info!("battle {:?} -> {:?}", self.state, state);
        }
        self.state = state;
    }

    fn guard(&self, action: Action, allowed: &[BattleState]) -> Result<(), BattleError> {
        if !self.mounted {
            return Err(BattleError::Unmounted);
        }
        if self.ended {
            return Err(BattleError::Finished);
        }
        if !allowed.contains(&self.state) {
            log::warn!("{:?} rejected in {:?}", action, self.state);
            return Err(BattleError::IllegalAction {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn drop_arena(&mut self) {
        if let Some(mut arena) = self.arena.take() {
            arena.unmount();
        }
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.drop_arena();
        self.gauge = None;
    }

    /// Tear the battle down without reporting an outcome
    pub fn unmount(&mut self) {
        self.teardown();
        self.mounted = false;
        log::debug!("battle unmounted");
    }

    // Host interface

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Deliver pending events to the host
    pub fn dispatch(&mut self, hooks: &mut impl EncounterHooks) {
        for event in self.drain_events() {
            match event {
                BattleEvent::PlayerDamaged(amount) => hooks.on_player_damaged(amount),
                BattleEvent::Ended { won } => hooks.on_battle_end(won),
            }
        }
    }

    /// Render state; player HP is owned by the host
    pub fn snapshot(&self, player_hp: u32, player_max_hp: u32) -> BattleView {
        let now = self.timers.now();
        let arena = self.arena.as_ref().filter(|a| a.is_mounted());
        BattleView {
            state: self.state,
            dialogue: self.dialogue.clone(),
            enemy_name: self.enemy.name.clone(),
            enemy_hp: self.enemy_hp,
            enemy_max_hp: self.enemy.max_hp,
            is_boss: self.enemy.is_boss,
            player_hp,
            player_max_hp,
            can_spare: self.can_spare,
            enemy_hit: self.enemy_hit,
            soul: arena.map(|a| SoulView {
                x: a.player().pos.x,
                y: a.player().pos.y,
                invincible: a.player().invincible,
            }),
            projectiles: arena
                .map(|a| {
                    a.projectiles()
                        .iter()
                        .map(|p| ProjectileView {
                            x: p.pos.x,
                            y: p.pos.y,
                            size: p.size,
                            rotation: p.rotation,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            marker: self.gauge.as_ref().map(|g| g.marker_at(now)),
        }
    }

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn dialogue(&self) -> &str {
        &self.dialogue
    }

    pub fn enemy(&self) -> &EnemyRecord {
        &self.enemy
    }

    pub fn enemy_hp(&self) -> u32 {
        self.enemy_hp
    }

    pub fn can_spare(&self) -> bool {
        self.can_spare
    }

    pub fn enemy_hit(&self) -> bool {
        self.enemy_hit
    }

    /// Virtual time in ms
    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    pub fn gauge(&self) -> Option<&AccuracyGauge> {
        self.gauge.as_ref()
    }

    /// Outstanding transitions plus the arena's spawn timers
    pub fn pending_timers(&self) -> usize {
        self.timers.pending() + self.arena.as_ref().map_or(0, Arena::pending_timers)
    }
}
