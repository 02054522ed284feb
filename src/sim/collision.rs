//! Overlap and bounds checks for the dodge arena
//!
//! Everything in the arena is a square footprint positioned by its top-left corner.
//! Hits use the circles inscribed in those squares.

use glam::Vec2;

use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH, CULL_MARGIN, PLAYER_SIZE};

/// Check whether two inscribed circles overlap (strictly)
#[inline]
pub fn circles_overlap(a_center: Vec2, a_size: f32, b_center: Vec2, b_size: f32) -> bool {
    a_center.distance(b_center) < a_size / 2.0 + b_size / 2.0
}

/// Check whether a projectile has left the arena far enough to be culled
///
/// The live region is the arena grown by `size + CULL_MARGIN` on every side.
#[inline]
pub fn outside_cull_bounds(pos: Vec2, size: f32) -> bool {
    let pad = size + CULL_MARGIN;
    !(pos.x > -pad && pos.x < ARENA_WIDTH + pad && pos.y > -pad && pos.y < ARENA_HEIGHT + pad)
}

/// Clamp the player soul so its footprint stays inside the arena
#[inline]
pub fn clamp_player(pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x.clamp(0.0, ARENA_WIDTH - PLAYER_SIZE),
        pos.y.clamp(0.0, ARENA_HEIGHT - PLAYER_SIZE),
    )
}
