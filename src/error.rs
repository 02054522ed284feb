//! Error types
//!
//! The simulation has no I/O, so these only cover rejected player actions and bad config.

use thiserror::Error;

use crate::sim::battle::{Action, BattleState};

/// A battle action that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    /// The action is not offered in the current state (e.g. Spare while choosing)
    #[error("{action:?} is not available while {state:?}")]
    IllegalAction { action: Action, state: BattleState },
    /// The encounter already reported its outcome
    #[error("battle has already ended")]
    Finished,
    /// The battle was torn down before it ended
    #[error("battle is unmounted")]
    Unmounted,
}

/// Invalid tuning or content data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{field}` must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("`{field}` is {value} ms, longer than the {max} ms limit")]
    TooLong {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("critical zone ({critical}) must be narrower than the normal band ({normal})")]
    BandOrder { critical: f32, normal: f32 },
}
