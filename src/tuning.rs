//! Battle timing and balance
//!
//! Every fixed delay and threshold of the battle lives here so the whole encounter can be
//! rebalanced from JSON. Defaults are the shipped game balance.

use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_SPEED;
use crate::error::TuningError;

/// Longest delay any tuning duration may ask for (one hour, ms)
pub const MAX_DURATION_MS: u64 = 60 * 60 * 1000;

/// Timing/balance knobs for one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena ===
    /// Cooldown after a hit during which no further hits register (ms)
    pub invincibility_ms: u64,
    /// Player displacement per tick per held direction
    pub player_speed: f32,
    /// How long one pattern variant runs before a new one is picked (ms)
    pub pattern_cycle_ms: u64,
    /// Pattern cycle for boss-tier categories (ms)
    pub boss_pattern_cycle_ms: u64,

    // === Turn sequencing ===
    /// Check/Talk dialogue shown before the enemy attacks (ms)
    pub dialogue_delay_ms: u64,
    /// Refused Spare dialogue shown before the enemy attacks (ms)
    pub refusal_delay_ms: u64,
    /// Successful Spare dialogue shown before the battle ends (ms)
    pub spare_delay_ms: u64,
    /// Hit/miss feedback shown before the enemy attacks (ms)
    pub hit_feedback_ms: u64,
    /// Defeat dialogue shown before the battle ends (ms)
    pub victory_delay_ms: u64,
    /// Enemy turn length (ms)
    pub enemy_turn_ms: u64,
    /// Enemy turn length for bosses (ms)
    pub boss_enemy_turn_ms: u64,

    // === Accuracy gauge ===
    /// Unconfirmed attacks resolve as a miss after this long (ms)
    pub attack_timeout_ms: u64,
    /// One marker sweep across the track (ms); a round trip takes twice as long
    pub marker_sweep_ms: u64,
    /// Critical zone radius as a fraction of track width
    pub critical_zone: f32,
    /// Normal band radius as a fraction of track width
    pub normal_zone: f32,
    /// Damage dealt by a critical hit
    pub critical_damage: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            invincibility_ms: 1500,
            player_speed: PLAYER_SPEED,
            pattern_cycle_ms: 5000,
            boss_pattern_cycle_ms: 4000,

            dialogue_delay_ms: 4000,
            refusal_delay_ms: 2000,
            spare_delay_ms: 2000,
            hit_feedback_ms: 1500,
            victory_delay_ms: 3000,
            enemy_turn_ms: 5000,
            boss_enemy_turn_ms: 8000,

            attack_timeout_ms: 4000,
            marker_sweep_ms: 1000,
            critical_zone: 0.05,
            normal_zone: 0.4,
            critical_damage: 3,
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would stall or break the battle
    pub fn validate(&self) -> Result<(), TuningError> {
        let durations = [
            ("invincibility_ms", self.invincibility_ms),
            ("pattern_cycle_ms", self.pattern_cycle_ms),
            ("boss_pattern_cycle_ms", self.boss_pattern_cycle_ms),
            ("enemy_turn_ms", self.enemy_turn_ms),
            ("boss_enemy_turn_ms", self.boss_enemy_turn_ms),
            ("attack_timeout_ms", self.attack_timeout_ms),
            ("marker_sweep_ms", self.marker_sweep_ms),
        ];
        if let Some(&(field, _)) = durations.iter().find(|(_, v)| *v == 0) {
            return Err(TuningError::NonPositive { field });
        }
        if self.critical_damage == 0 {
            return Err(TuningError::NonPositive { field: "critical_damage" });
        }

        let delays = [
            ("dialogue_delay_ms", self.dialogue_delay_ms),
            ("refusal_delay_ms", self.refusal_delay_ms),
            ("spare_delay_ms", self.spare_delay_ms),
            ("hit_feedback_ms", self.hit_feedback_ms),
            ("victory_delay_ms", self.victory_delay_ms),
        ];
        if let Some(&(field, value)) = durations
            .iter()
            .chain(delays.iter())
            .find(|(_, v)| *v > MAX_DURATION_MS)
        {
            return Err(TuningError::TooLong {
                field,
                value,
                max: MAX_DURATION_MS,
            });
        }
        if self.player_speed <= 0.0 {
            return Err(TuningError::NonPositive { field: "player_speed" });
        }
        if self.critical_zone <= 0.0 {
            return Err(TuningError::NonPositive { field: "critical_zone" });
        }
        if self.critical_zone >= self.normal_zone {
            return Err(TuningError::BandOrder {
                critical: self.critical_zone,
                normal: self.normal_zone,
            });
        }
        Ok(())
    }

    /// Enemy turn length for the given encounter
    pub fn enemy_turn_for(&self, is_boss: bool) -> u64 {
        if is_boss {
            self.boss_enemy_turn_ms
        } else {
            self.enemy_turn_ms
        }
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "soul_maze_tuning";

    /// Load tuning overrides from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(tuning) => {
                        log::info!("Loaded tuning overrides from LocalStorage");
                        return tuning;
                    }
                    Err(e) => log::warn!("Ignoring stored tuning: {}", e),
                }
            }
        }

        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "enemy_turn_ms": 6000 }"#).unwrap();
        assert_eq!(tuning.enemy_turn_ms, 6000);
        assert_eq!(tuning.boss_enemy_turn_ms, 8000);
        assert_eq!(tuning.invincibility_ms, 1500);
    }

    #[test]
    fn test_rejects_zero_duration() {
        let err = Tuning::from_json(r#"{ "attack_timeout_ms": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::NonPositive { field: "attack_timeout_ms" }
        ));
    }

    #[test]
    fn test_rejects_huge_durations() {
        let err = Tuning::from_json(r#"{ "attack_timeout_ms": 18446744073709551615 }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            TuningError::TooLong { field: "attack_timeout_ms", .. }
        ));

        let err = Tuning::from_json(r#"{ "marker_sweep_ms": 18446744073709551615 }"#).unwrap_err();
        assert!(matches!(err, TuningError::TooLong { field: "marker_sweep_ms", .. }));

        let err = Tuning::from_json(r#"{ "victory_delay_ms": 3600001 }"#).unwrap_err();
        assert!(matches!(err, TuningError::TooLong { field: "victory_delay_ms", .. }));

        let tuning = Tuning::from_json(r#"{ "enemy_turn_ms": 3600000 }"#).unwrap();
        assert_eq!(tuning.enemy_turn_ms, MAX_DURATION_MS);
    }

    #[test]
    fn test_rejects_inverted_bands() {
        let err = Tuning::from_json(r#"{ "critical_zone": 0.5 }"#).unwrap_err();
        assert!(matches!(err, TuningError::BandOrder { .. }));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Tuning::from_json("not json"),
            Err(TuningError::Json(_))
        ));
    }

    #[test]
    fn test_enemy_turn_for_boss() {
        let tuning = Tuning::default();
        assert_eq!(tuning.enemy_turn_for(true), 8000);
        assert_eq!(tuning.enemy_turn_for(false), 5000);
    }
}
