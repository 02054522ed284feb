//! Timing gauge for the player's attack
//!
//! A marker sweeps back and forth along a track. Stopping it near the center hits hard,
//! anywhere in the wide middle band grazes, and the far ends miss. The marker position is
//! a triangle wave of elapsed time, so the outcome never depends on what was drawn.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Track length in gauge units
pub const TRACK_WIDTH: f32 = 400.0;
/// Marker length in gauge units
pub const MARKER_WIDTH: f32 = 8.0;

/// Quality of a resolved attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitQuality {
    Miss,
    Graze,
    Critical,
}

/// Result of one attack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub quality: HitQuality,
    pub damage: u32,
    /// Distance from track center to marker center (None on timeout)
    pub distance: Option<f32>,
}

impl AttackOutcome {
    /// The attack was never confirmed
    pub fn timed_out() -> Self {
        Self {
            quality: HitQuality::Miss,
            damage: 0,
            distance: None,
        }
    }
}

/// Left edge of the marker `elapsed_ms` after the gauge started
///
/// Starts at the left end, reaches the right end after one sweep, and returns.
pub fn marker_position(elapsed_ms: u64, sweep_ms: u64) -> f32 {
    let sweep = sweep_ms.max(1);
    let phase = elapsed_ms % sweep.saturating_mul(2);
    let t = if phase <= sweep {
        phase as f32 / sweep as f32
    } else {
        2.0 - phase as f32 / sweep as f32
    };
    t * (TRACK_WIDTH - MARKER_WIDTH)
}

/// Score a marker stopped `distance` units from the track center
///
/// Critical inside the critical zone; otherwise inside the normal band damage falls from 2
/// toward 0 across the half-track, floored at 1; outside the band it is a miss.
pub fn score(distance: f32, tuning: &Tuning) -> AttackOutcome {
    let critical_radius = TRACK_WIDTH * tuning.critical_zone;
    let normal_radius = TRACK_WIDTH * tuning.normal_zone;

    let (quality, damage) = if distance < critical_radius {
        (HitQuality::Critical, tuning.critical_damage)
    } else if distance < normal_radius {
        let scaled = (2.0 * (1.0 - distance / (TRACK_WIDTH / 2.0))).round();
        (HitQuality::Graze, (scaled.max(0.0) as u32).max(1))
    } else {
        (HitQuality::Miss, 0)
    };

    AttackOutcome {
        quality,
        damage,
        distance: Some(distance),
    }
}

/// One run of the gauge, from the Attack choice until it resolves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyGauge {
    started_at: u64,
    tuning: Tuning,
    outcome: Option<AttackOutcome>,
    stopped_at: Option<u64>,
}

impl AccuracyGauge {
    pub fn start(now: u64, tuning: &Tuning) -> Self {
        Self {
            started_at: now,
            tuning: tuning.clone(),
            outcome: None,
            stopped_at: None,
        }
    }

    /// Left edge of the marker at `now` (frozen once resolved)
    pub fn marker_at(&self, now: u64) -> f32 {
        let at = self.stopped_at.unwrap_or(now);
        marker_position(at.saturating_sub(self.started_at), self.tuning.marker_sweep_ms)
    }

    /// When an unconfirmed gauge gives up
    pub fn deadline(&self) -> u64 {
        self.started_at.saturating_add(self.tuning.attack_timeout_ms)
    }

    pub fn outcome(&self) -> Option<AttackOutcome> {
        self.outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    /// Stop the marker. Only the first resolution counts; later calls return `None`.
    pub fn confirm(&mut self, now: u64) -> Option<AttackOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let elapsed = now.saturating_sub(self.started_at);
        let left = marker_position(elapsed, self.tuning.marker_sweep_ms);
        let marker_center = left + MARKER_WIDTH / 2.0;
        let distance = (TRACK_WIDTH / 2.0 - marker_center).abs();
        let outcome = score(distance, &self.tuning);
        self.outcome = Some(outcome);
        self.stopped_at = Some(now);
        Some(outcome)
    }

    /// Resolve as a miss if still unconfirmed at the deadline
    pub fn expire(&mut self, now: u64) -> Option<AttackOutcome> {
        if self.outcome.is_some() || now < self.deadline() {
            return None;
        }
        let outcome = AttackOutcome::timed_out();
        self.outcome = Some(outcome);
        self.stopped_at = Some(now);
        Some(outcome)
    }
}
