//! Soul Maze - battle core of a small narrative maze game
//!
//! Core modules:
//! - `sim`: Deterministic battle simulation (bullet patterns, dodge arena, accuracy gauge and
//!   turn machine)
//! - `tuning`: Data-driven timing and balance
//! - `content`: Built-in enemy roster
//! - `session`: Outer game session that hosts encounters
//! - `error`: Error types

pub mod content;
pub mod error;
pub mod session;
pub mod sim;
pub mod tuning;

pub use error::{BattleError, TuningError};
pub use session::Session;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Arena simulation rate
    pub const TICK_HZ: u64 = 60;

    /// Arena dimensions
    pub const ARENA_WIDTH: f32 = 200.0;
    pub const ARENA_HEIGHT: f32 = 200.0;

    /// Player soul
    pub const PLAYER_SIZE: f32 = 16.0;
    /// Displacement per tick per held direction
    pub const PLAYER_SPEED: f32 = 4.0;

    /// Projectiles are culled once they leave the arena by more than their size plus this
    pub const CULL_MARGIN: f32 = 20.0;
    /// Spawn offset used by patterns that enter from outside the arena
    pub const OFFSCREEN: f32 = 10.0;

    /// Outer session
    pub const PLAYER_MAX_HP: u32 = 20;
}

/// Millisecond timestamp of arena tick `n` counted from the mount time (exact 60 Hz, no drift)
#[inline]
pub fn tick_offset_ms(n: u64) -> u64 {
    n * 1000 / consts::TICK_HZ
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Velocity of the given speed pointing from `from` toward `to` (zero if they coincide)
#[inline]
pub fn velocity_toward(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    let delta = to - from;
    if delta.length_squared() < f32::EPSILON {
        return Vec2::ZERO;
    }
    direction(delta.y.atan2(delta.x)) * speed
}
