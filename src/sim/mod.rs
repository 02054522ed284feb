//! Deterministic battle simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Virtual millisecond clock only, advanced by the host
//! - Seeded RNG only
//! - Stable iteration order (by projectile ID)
//! - No rendering or platform dependencies

pub mod accuracy;
pub mod arena;
pub mod battle;
pub mod collision;
pub mod enemy;
pub mod patterns;
pub mod projectile;
pub mod scheduler;

pub use accuracy::{AccuracyGauge, AttackOutcome, HitQuality, MARKER_WIDTH, TRACK_WIDTH};
pub use arena::{Arena, ArenaEvent, Direction, HeldKeys, MovementInput, PlayerSoul};
pub use battle::{
    Action, Battle, BattleEvent, BattleState, BattleView, EncounterHooks, ProjectileView,
    SoulView,
};
pub use enemy::{EnemyDialogue, EnemyRecord};
pub use patterns::{PatternCategory, PatternCycle, PatternVariant, Spawn};
pub use projectile::{Motion, Projectile, ProjectileSpawn};
pub use scheduler::Scheduler;
