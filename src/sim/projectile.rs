//! Arena projectiles
//!
//! Positions are the top-left corner of the projectile's square footprint, the same
//! convention the player soul uses, so centers compare in one coordinate space.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{direction, velocity_toward};

/// How a projectile's velocity evolves each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Keeps its spawn velocity
    Constant,
    /// Heads for a point fixed when the projectile was spawned, offset by `spread` radians.
    /// Resolved into a constant velocity on the first tick.
    AimAt { target: Vec2, speed: f32, spread: f32 },
    /// Re-aims at the player every tick
    Homing { speed: f32 },
}

/// A projectile as requested by a pattern, before the arena assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpawn {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub motion: Motion,
    /// Sprite orientation in radians, if the projectile is drawn rotated
    pub rotation: Option<f32>,
}

impl ProjectileSpawn {
    /// A straight-flying projectile
    pub fn new(pos: Vec2, vel: Vec2, size: f32) -> Self {
        Self {
            pos,
            vel,
            size,
            motion: Motion::Constant,
            rotation: None,
        }
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = Some(rotation);
        self
    }
}

/// A live projectile owned by the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub motion: Motion,
    pub rotation: Option<f32>,
}

impl Projectile {
    pub fn from_spawn(id: u32, spawn: ProjectileSpawn) -> Self {
        Self {
            id,
            pos: spawn.pos,
            vel: spawn.vel,
            size: spawn.size,
            motion: spawn.motion,
            rotation: spawn.rotation,
        }
    }

    /// Center of the footprint
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size / 2.0)
    }

    /// Apply the motion rule toward `target` (a center point), then integrate one tick
    pub fn advance(&mut self, target: Vec2) {
        match self.motion {
            Motion::Constant => {}
            Motion::AimAt {
                target: aim,
                speed,
                spread,
            } => {
                let delta = aim - self.center();
                self.vel = direction(delta.y.atan2(delta.x) + spread) * speed;
                self.motion = Motion::Constant;
            }
            Motion::Homing { speed } => {
                self.vel = velocity_toward(self.center(), target, speed);
            }
        }
        self.pos += self.vel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_integrates_velocity() {
        let mut p = Projectile::from_spawn(
            1,
            ProjectileSpawn::new(Vec2::new(10.0, 10.0), Vec2::new(2.0, -1.0), 8.0),
        );
        p.advance(Vec2::ZERO);
        p.advance(Vec2::ZERO);
        assert_eq!(p.pos, Vec2::new(14.0, 8.0));
    }

    #[test]
    fn test_homing_tracks_moving_target() {
        let spawn = ProjectileSpawn::new(Vec2::ZERO, Vec2::ZERO, 10.0)
            .with_motion(Motion::Homing { speed: 1.5 });
        let mut p = Projectile::from_spawn(1, spawn);

        // Target to the right of the center
        p.advance(Vec2::new(100.0, 5.0));
        assert!((p.vel.x - 1.5).abs() < 1e-4);
        assert!(p.vel.y.abs() < 1e-4);

        // Target now straight below the center
        let below = p.center() + Vec2::new(0.0, 50.0);
        p.advance(below);
        assert!(p.vel.x.abs() < 1e-4);
        assert!((p.vel.y - 1.5).abs() < 1e-4);
        assert!(matches!(p.motion, Motion::Homing { .. }));
    }

    #[test]
    fn test_aim_at_locks_heading() {
        let spawn = ProjectileSpawn::new(Vec2::ZERO, Vec2::ZERO, 10.0).with_motion(Motion::AimAt {
            target: Vec2::new(105.0, 5.0),
            speed: 2.0,
            spread: 0.0,
        });
        let mut p = Projectile::from_spawn(1, spawn);
        // The live player position is ignored; the spawn-time target wins
        p.advance(Vec2::new(-500.0, 500.0));
        let locked = p.vel;
        assert!((locked.x - 2.0).abs() < 1e-4);
        assert!(locked.y.abs() < 1e-4);

        p.advance(Vec2::new(500.0, -500.0));
        assert_eq!(p.vel, locked);
        assert_eq!(p.motion, Motion::Constant);
    }

    #[test]
    fn test_aim_at_spread_rotates_heading() {
        let spawn = ProjectileSpawn::new(Vec2::ZERO, Vec2::ZERO, 10.0).with_motion(Motion::AimAt {
            target: Vec2::new(105.0, 5.0),
            speed: 2.0,
            spread: std::f32::consts::FRAC_PI_2,
        });
        let mut p = Projectile::from_spawn(1, spawn);
        p.advance(Vec2::ZERO);
        assert!(p.vel.x.abs() < 1e-4);
        assert!((p.vel.y - 2.0).abs() < 1e-4);
    }
}
