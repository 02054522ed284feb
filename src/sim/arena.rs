//! Dodge arena for the enemy turn
//!
//! The arena exists only while an enemy turn is running. It owns the live projectiles,
//! the player soul, the projectile id counter and the pattern cycle feeding it. Time is
//! advanced by the owner; fixed 60 Hz ticks and pattern triggers are interleaved in time
//! order, triggers first on a tie.

use std::collections::HashSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{circles_overlap, clamp_player, outside_cull_bounds};
use super::patterns::{PatternCategory, PatternCycle, Spawn};
use super::projectile::{Projectile, ProjectileSpawn};
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH, PLAYER_SIZE};
use crate::tick_offset_ms;
use crate::tuning::Tuning;

/// A movement direction of the soul
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Map a keyboard key name to a direction
    ///
    /// Accepts arrows, WASD, and the same physical keys on a Russian layout (ц ы ф в).
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "arrowup" | "w" | "ц" => Some(Direction::Up),
            "arrowdown" | "s" | "ы" => Some(Direction::Down),
            "arrowleft" | "a" | "ф" => Some(Direction::Left),
            "arrowright" | "d" | "в" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Directions held during one tick (opposites cancel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementInput {
    /// Displacement for one tick at `speed`
    pub fn displacement(&self, speed: f32) -> Vec2 {
        let mut d = Vec2::ZERO;
        if self.up {
            d.y -= speed;
        }
        if self.down {
            d.y += speed;
        }
        if self.left {
            d.x -= speed;
        }
        if self.right {
            d.x += speed;
        }
        d
    }
}

/// Keys currently held down, tracked by name so aliases release independently
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    keys: HashSet<String>,
}

impl HeldKeys {
    pub fn press(&mut self, key: &str) {
        self.keys.insert(key.to_lowercase());
    }

    pub fn release(&mut self, key: &str) {
        self.keys.remove(&key.to_lowercase());
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Collapse held keys into directions
    pub fn movement(&self) -> MovementInput {
        let mut input = MovementInput::default();
        for dir in self.keys.iter().filter_map(|k| Direction::from_key(k)) {
            match dir {
                Direction::Up => input.up = true,
                Direction::Down => input.down = true,
                Direction::Left => input.left = true,
                Direction::Right => input.right = true,
            }
        }
        input
    }
}

/// The player's soul inside the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSoul {
    /// Top-left of the footprint, clamped to the arena
    pub pos: Vec2,
    /// True from a hit until the invincibility window lapses
    pub invincible: bool,
    pub last_hit_ms: Option<u64>,
}

impl PlayerSoul {
    /// Soul centered in the arena
    pub fn centered() -> Self {
        Self {
            pos: Vec2::new(
                ARENA_WIDTH / 2.0 - PLAYER_SIZE / 2.0,
                ARENA_HEIGHT / 2.0 - PLAYER_SIZE / 2.0,
            ),
            invincible: false,
            last_hit_ms: None,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(PLAYER_SIZE / 2.0)
    }
}

/// Something the owner needs to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaEvent {
    PlayerHit { damage: u32 },
}

/// Live projectiles plus the arena-scoped id counter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectileField {
    projectiles: Vec<Projectile>,
    next_id: u32,
}

impl Spawn for ProjectileField {
    fn spawn(&mut self, projectile: ProjectileSpawn) {
        self.next_id += 1;
        self.projectiles
            .push(Projectile::from_spawn(self.next_id, projectile));
    }
}

/// The dodge arena of one enemy turn
#[derive(Debug, Clone)]
pub struct Arena {
    mounted_at: u64,
    now: u64,
    ticks: u64,
    damage: u32,
    invincibility_ms: u64,
    player_speed: f32,
    player: PlayerSoul,
    field: ProjectileField,
    cycle: PatternCycle,
    rng: Pcg32,
    mounted: bool,
}

impl Arena {
    /// Mount a fresh arena at `now`: centered soul, no projectiles, first variant picked
    pub fn mount(
        category: PatternCategory,
        damage: u32,
        tuning: &Tuning,
        now: u64,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let cycle = PatternCycle::start(category, tuning, now, &mut rng);
        log::debug!(
            "arena mounted at {}ms ({} patterns, {} damage)",
            now,
            category.as_str(),
            damage
        );
        Self {
            mounted_at: now,
            now,
            ticks: 0,
            damage,
            invincibility_ms: tuning.invincibility_ms,
            player_speed: tuning.player_speed,
            player: PlayerSoul::centered(),
            field: ProjectileField::default(),
            cycle,
            rng,
            mounted: true,
        }
    }

    /// Advance to `until`, running every tick and pattern trigger due on the way
    pub fn advance_to(&mut self, until: u64, input: MovementInput, events: &mut Vec<ArenaEvent>) {
        if !self.mounted {
            return;
        }

        loop {
            let next_tick = self.mounted_at + tick_offset_ms(self.ticks + 1);
            let next_trigger = self.cycle.next_due();

            if let Some(at) = next_trigger.filter(|&at| at <= until && at <= next_tick) {
                let player = self.player.center();
                self.cycle.run_until(at, player, &mut self.rng, &mut self.field);
                self.now = self.now.max(at);
                continue;
            }

            if next_tick > until {
                break;
            }
            self.now = next_tick;
            self.step(input, events);
        }

        self.now = self.now.max(until);
    }

    /// One fixed tick: move the soul, move projectiles, cull, then check for a hit
    fn step(&mut self, input: MovementInput, events: &mut Vec<ArenaEvent>) {
        self.ticks += 1;

        self.player.pos = clamp_player(self.player.pos + input.displacement(self.player_speed));

        let target = self.player.center();
        for projectile in &mut self.field.projectiles {
            projectile.advance(target);
        }
        self.field
            .projectiles
            .retain(|p| !outside_cull_bounds(p.pos, p.size));

        let vulnerable = self
            .player
            .last_hit_ms
            .is_none_or(|last| self.now - last > self.invincibility_ms);
        if !vulnerable {
            return;
        }
        self.player.invincible = false;

        let center = self.player.center();
        let hit = self
            .field
            .projectiles
            .iter()
            .find(|p| circles_overlap(center, PLAYER_SIZE, p.center(), p.size));
        if let Some(projectile) = hit {
            log::debug!(
                "soul hit by projectile {} at tick {} ({} damage)",
                projectile.id,
                self.ticks,
                self.damage
            );
            events.push(ArenaEvent::PlayerHit {
                damage: self.damage,
            });
            self.player.invincible = true;
            self.player.last_hit_ms = Some(self.now);
        }
    }

    /// Stop ticking and cancel every pattern timer
    pub fn unmount(&mut self) {
        if self.mounted {
            log::debug!(
                "arena unmounted after {} ticks, {} projectiles live",
                self.ticks,
                self.field.projectiles.len()
            );
        }
        self.cycle.cancel();
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn player(&self) -> &PlayerSoul {
        &self.player
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.field.projectiles
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pattern_cycle(&self) -> &PatternCycle {
        &self.cycle
    }

    /// Outstanding spawn triggers
    pub fn pending_timers(&self) -> usize {
        self.cycle.pending_timers()
    }
}
