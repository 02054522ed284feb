//! Bullet pattern library
//!
//! Each enemy class has a pattern category; each category has a fixed list of variants.
//! A running variant is an [`ActivePattern`]: its own timers, its own small state, and a
//! spawn sink it writes projectiles into. [`PatternCycle`] swaps variants at random on a
//! fixed interval.
//!
//! Velocities are in arena units per tick. Patterns see the player only as a snapshot
//! taken when one of their triggers fires.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::projectile::{Motion, ProjectileSpawn};
use super::scheduler::Scheduler;
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH, OFFSCREEN};
use crate::direction;
use crate::tuning::Tuning;

/// Receives projectiles produced by a pattern
pub trait Spawn {
    fn spawn(&mut self, projectile: ProjectileSpawn);
}

impl Spawn for Vec<ProjectileSpawn> {
    fn spawn(&mut self, projectile: ProjectileSpawn) {
        self.push(projectile);
    }
}

/// Attack style of an enemy class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    Shadow,
    Echo,
    /// Boss tier
    Guardian,
}

impl PatternCategory {
    /// Variants a cycle picks from
    pub fn variants(self) -> &'static [PatternVariant] {
        use PatternVariant::*;
        match self {
            PatternCategory::Shadow => &[FallingScatter, WallSweep],
            PatternCategory::Echo => &[TwinSpiral, TrackingRain],
            PatternCategory::Guardian => &[
                RadialBurst,
                HomingOrbs,
                LineWalls,
                FastSpiral,
                AimedSpread,
                CrossWaves,
            ],
        }
    }

    pub fn is_boss_tier(self) -> bool {
        self == PatternCategory::Guardian
    }

    /// How long each variant runs before the cycle picks another
    pub fn cycle_ms(self, tuning: &Tuning) -> u64 {
        if self.is_boss_tier() {
            tuning.boss_pattern_cycle_ms
        } else {
            tuning.pattern_cycle_ms
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Shadow => "shadow",
            PatternCategory::Echo => "echo",
            PatternCategory::Guardian => "guardian",
        }
    }
}

/// One concrete spawn schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternVariant {
    /// Sparse drops from above with a slight sideways drift
    FallingScatter,
    /// Five-bullet columns entering from alternating side walls
    WallSweep,
    /// Two opposed emitters spinning at the center
    TwinSpiral,
    /// Bursts of three drops aimed at the player's column, 150 ms apart
    TrackingRain,
    /// Sixteen rays from the center
    RadialBurst,
    /// Slow orbs from the side walls that re-aim at the player every tick
    HomingOrbs,
    /// A static row or column of bullets across the arena
    LineWalls,
    /// A fast single-arm spiral from the center
    FastSpiral,
    /// Five jittered shots from the center at the player, 80 ms apart
    AimedSpread,
    /// Sine-wave rains from the top edge and the right edge at once
    CrossWaves,
}

impl PatternVariant {
    /// Period of the variant's main trigger (ms)
    pub fn period_ms(self) -> u64 {
        match self {
            PatternVariant::FallingScatter => 300,
            PatternVariant::WallSweep => 1000,
            PatternVariant::TwinSpiral => 100,
            PatternVariant::TrackingRain => 1000,
            PatternVariant::RadialBurst => 900,
            PatternVariant::HomingOrbs => 1200,
            PatternVariant::LineWalls => 1500,
            PatternVariant::FastSpiral => 50,
            PatternVariant::AimedSpread => 1000,
            PatternVariant::CrossWaves => 100,
        }
    }

    /// Number of staggered sub-shots per main trigger, and the gap between them (ms)
    fn volley(self) -> Option<(u8, u64)> {
        match self {
            PatternVariant::TrackingRain => Some((3, 150)),
            PatternVariant::AimedSpread => Some((5, 80)),
            _ => None,
        }
    }

    /// Begin producing projectiles at `now`. Dropping or cancelling the returned pattern
    /// stops every future spawn.
    pub fn start(self, now: u64, rng: &mut Pcg32) -> ActivePattern {
        let mut timers = Scheduler::new(now);
        timers.schedule_repeating(PatternTimer::Trigger, self.period_ms());

        let angle = match self {
            PatternVariant::TwinSpiral => rng.random::<f32>() * TAU,
            _ => 0.0,
        };

        ActivePattern {
            variant: self,
            timers,
            angle,
            from_left: true,
            frame: 0,
            aim: Vec2::ZERO,
        }
    }
}

/// Timers owned by one running variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternTimer {
    /// Main periodic trigger
    Trigger,
    /// Staggered sub-shot `n` of the current volley
    Volley(u8),
}

fn arena_center() -> Vec2 {
    Vec2::new(ARENA_WIDTH / 2.0, ARENA_HEIGHT / 2.0)
}

/// Top-left position that puts a projectile of `size` centered on `center`
fn centered(center: Vec2, size: f32) -> Vec2 {
    center - Vec2::splat(size / 2.0)
}

/// A variant that is currently producing projectiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePattern {
    variant: PatternVariant,
    timers: Scheduler<PatternTimer>,
    /// Emitter angle for spiral variants
    angle: f32,
    /// Side the next wall sweep enters from
    from_left: bool,
    /// Trigger count for wave variants
    frame: u32,
    /// Player snapshot taken at the start of a volley
    aim: Vec2,
}

impl ActivePattern {
    pub fn variant(&self) -> PatternVariant {
        self.variant
    }

    /// Due time of the next trigger or sub-shot
    pub fn next_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Number of outstanding triggers
    pub fn pending(&self) -> usize {
        self.timers.pending()
    }

    /// Stop all future spawns
    pub fn cancel(&mut self) {
        self.timers.cancel_all();
    }

    /// Fire every trigger due at or before `until`
    ///
    /// `player` is the center of the player soul at this instant.
    pub fn run_until(&mut self, until: u64, player: Vec2, rng: &mut Pcg32, out: &mut impl Spawn) {
        while let Some(timer) = self.timers.pop_due(until) {
            match timer {
                PatternTimer::Trigger => self.trigger(player, rng, out),
                PatternTimer::Volley(_) => self.volley_shot(rng, out),
            }
        }
        self.timers.advance_clock(until);
    }

    fn trigger(&mut self, player: Vec2, rng: &mut Pcg32, out: &mut impl Spawn) {
        let w = ARENA_WIDTH;
        let h = ARENA_HEIGHT;

        match self.variant {
            PatternVariant::FallingScatter => {
                out.spawn(ProjectileSpawn::new(
                    Vec2::new(rng.random::<f32>() * w, -OFFSCREEN),
                    Vec2::new((rng.random::<f32>() - 0.5) * 2.0, 2.0 + rng.random::<f32>()),
                    8.0,
                ));
            }
            PatternVariant::WallSweep => {
                let (x, vx) = if self.from_left {
                    (-OFFSCREEN, 2.5)
                } else {
                    (w + OFFSCREEN, -2.5)
                };
                for i in 0..5 {
                    let y = i as f32 * h / 4.0 + rng.random_range(-10.0..10.0);
                    out.spawn(ProjectileSpawn::new(Vec2::new(x, y), Vec2::new(vx, 0.0), 10.0));
                }
                self.from_left = !self.from_left;
            }
            PatternVariant::TwinSpiral => {
                self.angle += 0.8;
                for i in 0..2 {
                    let heading = self.angle + i as f32 * PI;
                    out.spawn(ProjectileSpawn::new(
                        centered(arena_center(), 7.0),
                        direction(heading) * 2.0,
                        7.0,
                    ));
                }
            }
            PatternVariant::RadialBurst => {
                let step = PI / 8.0;
                for i in 0..16 {
                    out.spawn(ProjectileSpawn::new(
                        centered(arena_center(), 6.0),
                        direction(i as f32 * step) * 3.5,
                        6.0,
                    ));
                }
            }
            PatternVariant::HomingOrbs => {
                let x = if rng.random_bool(0.5) {
                    -OFFSCREEN
                } else {
                    w + OFFSCREEN
                };
                let y = rng.random::<f32>() * h;
                out.spawn(
                    ProjectileSpawn::new(Vec2::new(x, y), Vec2::ZERO, 12.0)
                        .with_motion(Motion::Homing { speed: 1.5 }),
                );
            }
            PatternVariant::LineWalls => {
                let vertical = rng.random_bool(0.5);
                let line = rng.random::<f32>() * if vertical { w } else { h };
                for i in 0..20 {
                    let along = i as f32;
                    let pos = if vertical {
                        Vec2::new(line, along * h / 20.0)
                    } else {
                        Vec2::new(along * w / 20.0, line)
                    };
                    out.spawn(ProjectileSpawn::new(pos, Vec2::ZERO, 10.0));
                }
            }
            PatternVariant::FastSpiral => {
                self.angle += 0.5;
                out.spawn(
                    ProjectileSpawn::new(
                        centered(arena_center(), 8.0),
                        direction(self.angle) * 2.5,
                        8.0,
                    )
                    .with_rotation(self.angle),
                );
            }
            PatternVariant::CrossWaves => {
                self.frame += 1;
                let phase = self.frame as f32 * 0.1;
                out.spawn(ProjectileSpawn::new(
                    Vec2::new(w / 2.0 + phase.sin() * (w / 2.5), -OFFSCREEN),
                    Vec2::new(0.0, 3.0),
                    10.0,
                ));
                out.spawn(ProjectileSpawn::new(
                    Vec2::new(w + OFFSCREEN, h / 2.0 + phase.cos() * (h / 2.5)),
                    Vec2::new(-3.0, 0.0),
                    10.0,
                ));
            }
            PatternVariant::TrackingRain | PatternVariant::AimedSpread => {
                self.aim = player;
                if let Some((shots, gap)) = self.variant.volley() {
                    for n in 0..shots {
                        self.timers
                            .schedule_once(PatternTimer::Volley(n), u64::from(n) * gap);
                    }
                }
            }
        }
    }

    fn volley_shot(&mut self, rng: &mut Pcg32, out: &mut impl Spawn) {
        match self.variant {
            PatternVariant::TrackingRain => {
                let x = self.aim.x + rng.random_range(-20.0..20.0) - 9.0 / 2.0;
                out.spawn(ProjectileSpawn::new(
                    Vec2::new(x, -OFFSCREEN),
                    Vec2::new(0.0, 3.0),
                    9.0,
                ));
            }
            PatternVariant::AimedSpread => {
                let spread = (rng.random::<f32>() - 0.5) * 0.4;
                out.spawn(
                    ProjectileSpawn::new(centered(arena_center(), 7.0), Vec2::ZERO, 7.0)
                        .with_motion(Motion::AimAt {
                            target: self.aim,
                            speed: 4.0,
                            spread,
                        }),
                );
            }
            other => log::warn!("{:?} has no volley", other),
        }
    }
}

/// Timer owned by the cycle itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum CycleTimer {
    Switch,
}

/// Runs random variants of one category, switching on a fixed interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCycle {
    category: PatternCategory,
    timers: Scheduler<CycleTimer>,
    active: Option<ActivePattern>,
    /// Variants started so far, including the first
    started: u32,
}

impl PatternCycle {
    /// Pick the first variant and arm the switch interval
    pub fn start(category: PatternCategory, tuning: &Tuning, now: u64, rng: &mut Pcg32) -> Self {
        let mut timers = Scheduler::new(now);
        timers.schedule_repeating(CycleTimer::Switch, category.cycle_ms(tuning));
        let mut cycle = Self {
            category,
            timers,
            active: None,
            started: 0,
        };
        cycle.switch(now, rng);
        cycle
    }

    fn switch(&mut self, now: u64, rng: &mut Pcg32) {
        if let Some(mut previous) = self.active.take() {
            previous.cancel();
        }
        let variants = self.category.variants();
        let variant = variants[rng.random_range(0..variants.len())];
        log::debug!("{} pattern -> {:?}", self.category.as_str(), variant);
        self.active = Some(variant.start(now, rng));
        self.started += 1;
    }

    pub fn category(&self) -> PatternCategory {
        self.category
    }

    pub fn active_variant(&self) -> Option<PatternVariant> {
        self.active.as_ref().map(ActivePattern::variant)
    }

    pub fn variants_started(&self) -> u32 {
        self.started
    }

    /// Outstanding timers across the cycle and its running variant
    pub fn pending_timers(&self) -> usize {
        self.timers.pending() + self.active.as_ref().map_or(0, ActivePattern::pending)
    }

    /// Due time of the next spawn trigger or variant switch
    pub fn next_due(&self) -> Option<u64> {
        let pattern = self.active.as_ref().and_then(ActivePattern::next_due);
        match (pattern, self.timers.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire everything due at or before `until`, in time order. A variant's own trigger
    /// fires before a switch scheduled for the same instant.
    pub fn run_until(&mut self, until: u64, player: Vec2, rng: &mut Pcg32, out: &mut impl Spawn) {
        loop {
            let pattern_due = self.active.as_ref().and_then(ActivePattern::next_due);
            let switch_due = self.timers.next_due();
            let next = match (pattern_due, switch_due) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => break,
            };
            if next > until {
                break;
            }

            if pattern_due == Some(next) {
                if let Some(active) = self.active.as_mut() {
                    active.run_until(next, player, rng, out);
                }
            } else if self.timers.pop_due(next).is_some() {
                self.switch(next, rng);
            }
        }

        self.timers.advance_clock(until);
        if let Some(active) = self.active.as_mut() {
            active.run_until(until, player, rng, out);
        }
    }

    /// Stop the cycle and its running variant
    pub fn cancel(&mut self) {
        self.timers.cancel_all();
        if let Some(mut active) = self.active.take() {
            active.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    fn run(variant: PatternVariant, until: u64, player: Vec2) -> Vec<ProjectileSpawn> {
        let mut rng = rng();
        let mut active = variant.start(0, &mut rng);
        let mut out = Vec::new();
        active.run_until(until, player, &mut rng, &mut out);
        out
    }

    #[test]
    fn test_category_variant_counts() {
        assert_eq!(PatternCategory::Shadow.variants().len(), 2);
        assert_eq!(PatternCategory::Echo.variants().len(), 2);
        assert_eq!(PatternCategory::Guardian.variants().len(), 6);
    }

    #[test]
    fn test_cycle_interval_by_tier() {
        let tuning = Tuning::default();
        assert_eq!(PatternCategory::Guardian.cycle_ms(&tuning), 4000);
        assert_eq!(PatternCategory::Shadow.cycle_ms(&tuning), 5000);
        assert_eq!(PatternCategory::Echo.cycle_ms(&tuning), 5000);
    }

    #[test]
    fn test_nothing_before_first_period() {
        assert!(run(PatternVariant::FallingScatter, 299, Vec2::ZERO).is_empty());
        assert_eq!(run(PatternVariant::FallingScatter, 300, Vec2::ZERO).len(), 1);
        assert_eq!(run(PatternVariant::FallingScatter, 900, Vec2::ZERO).len(), 3);
    }

    #[test]
    fn test_radial_burst_sixteen_rays() {
        let shots = run(PatternVariant::RadialBurst, 900, Vec2::ZERO);
        assert_eq!(shots.len(), 16);
        for shot in &shots {
            assert!((shot.vel.length() - 3.5).abs() < 1e-4);
        }
        // Rays are distinct headings
        let first = shots[0].vel.normalize();
        assert!(shots[1..].iter().all(|s| s.vel.normalize().dot(first) < 0.99));
    }

    #[test]
    fn test_wall_sweep_alternates_sides() {
        let shots = run(PatternVariant::WallSweep, 2000, Vec2::ZERO);
        assert_eq!(shots.len(), 10);
        assert!(shots[..5].iter().all(|s| s.pos.x < 0.0 && s.vel.x > 0.0));
        assert!(shots[5..].iter().all(|s| s.pos.x > ARENA_WIDTH && s.vel.x < 0.0));
    }

    #[test]
    fn test_tracking_rain_staggers_three_drops() {
        let mut rng = rng();
        let mut active = PatternVariant::TrackingRain.start(0, &mut rng);
        let player = Vec2::new(60.0, 150.0);
        let mut out = Vec::new();

        active.run_until(1000, player, &mut rng, &mut out);
        assert_eq!(out.len(), 1);
        active.run_until(1149, player, &mut rng, &mut out);
        assert_eq!(out.len(), 1);
        active.run_until(1150, player, &mut rng, &mut out);
        assert_eq!(out.len(), 2);
        // Player moves mid-volley; the volley keeps the snapshot
        active.run_until(1300, Vec2::new(180.0, 150.0), &mut rng, &mut out);
        assert_eq!(out.len(), 3);
        for drop in &out {
            let center_x = drop.pos.x + drop.size / 2.0;
            assert!((center_x - 60.0).abs() <= 20.0);
            assert_eq!(drop.vel, Vec2::new(0.0, 3.0));
        }
    }

    #[test]
    fn test_aimed_spread_targets_snapshot() {
        let player = Vec2::new(100.0, 190.0);
        let shots = run(PatternVariant::AimedSpread, 1400, player);
        assert_eq!(shots.len(), 5);
        for shot in &shots {
            match shot.motion {
                Motion::AimAt {
                    target,
                    speed,
                    spread,
                } => {
                    assert_eq!(target, player);
                    assert_eq!(speed, 4.0);
                    assert!(spread.abs() <= 0.2);
                }
                other => panic!("unexpected motion {:?}", other),
            }
        }
    }

    #[test]
    fn test_homing_orbs_enter_from_walls() {
        let shots = run(PatternVariant::HomingOrbs, 3600, Vec2::ZERO);
        assert_eq!(shots.len(), 3);
        for shot in &shots {
            assert!(shot.pos.x < 0.0 || shot.pos.x > ARENA_WIDTH);
            assert!(matches!(shot.motion, Motion::Homing { .. }));
        }
    }

    #[test]
    fn test_line_walls_are_static() {
        let shots = run(PatternVariant::LineWalls, 1500, Vec2::ZERO);
        assert_eq!(shots.len(), 20);
        assert!(shots.iter().all(|s| s.vel == Vec2::ZERO));
        let xs_equal = shots.iter().all(|s| s.pos.x == shots[0].pos.x);
        let ys_equal = shots.iter().all(|s| s.pos.y == shots[0].pos.y);
        assert!(xs_equal ^ ys_equal);
    }

    #[test]
    fn test_cross_waves_two_edges() {
        let shots = run(PatternVariant::CrossWaves, 100, Vec2::ZERO);
        assert_eq!(shots.len(), 2);
        assert!(shots[0].pos.y < 0.0 && shots[0].vel.y > 0.0);
        assert!(shots[1].pos.x > ARENA_WIDTH && shots[1].vel.x < 0.0);
    }

    #[test]
    fn test_cancel_stops_spawns() {
        let mut rng = rng();
        let mut active = PatternVariant::FastSpiral.start(0, &mut rng);
        active.cancel();
        assert_eq!(active.pending(), 0);
        let mut out = Vec::new();
        active.run_until(10_000, Vec2::ZERO, &mut rng, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_cycle_switches_on_interval() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let mut cycle = PatternCycle::start(PatternCategory::Guardian, &tuning, 0, &mut rng);
        let mut out = Vec::new();
        assert_eq!(cycle.variants_started(), 1);

        cycle.run_until(3999, Vec2::ZERO, &mut rng, &mut out);
        assert_eq!(cycle.variants_started(), 1);
        cycle.run_until(4000, Vec2::ZERO, &mut rng, &mut out);
        assert_eq!(cycle.variants_started(), 2);
        cycle.run_until(12_000, Vec2::ZERO, &mut rng, &mut out);
        assert_eq!(cycle.variants_started(), 4);
        assert!(
            PatternCategory::Guardian
                .variants()
                .contains(&cycle.active_variant().unwrap())
        );
    }

    #[test]
    fn test_cycle_cancel_leaves_no_timers() {
        let tuning = Tuning::default();
        let mut rng = rng();
        let mut cycle = PatternCycle::start(PatternCategory::Echo, &tuning, 0, &mut rng);
        let mut out = Vec::new();
        cycle.run_until(2500, Vec2::new(90.0, 90.0), &mut rng, &mut out);
        assert!(cycle.pending_timers() > 0);

        cycle.cancel();
        assert_eq!(cycle.pending_timers(), 0);
        assert_eq!(cycle.next_due(), None);

        let spawned = out.len();
        cycle.run_until(60_000, Vec2::ZERO, &mut rng, &mut out);
        assert_eq!(out.len(), spawned);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&PatternCategory::Guardian).unwrap();
        assert_eq!(json, "\"guardian\"");
        let parsed: PatternCategory = serde_json::from_str("\"echo\"").unwrap();
        assert_eq!(parsed, PatternCategory::Echo);
    }
}
