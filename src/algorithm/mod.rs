//! Interval and point algorithm implementations.

pub mod leitner;
pub mod sm2;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CardState;

/// Result of an SM-2 review.
#[derive(Debug, Clone)]
pub struct Sm2Review {
    pub new_state: CardState,
    pub next_due: DateTime<Utc>,
}

/// Result of a correct answer under the Leitner engine, with the display
/// breakdown the surrounding application logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectReview {
    pub new_state: CardState,
    pub points_delta: u32,
    pub base_points: u32,
    pub success_multiplier: f64,
    pub streak_bonus: f64,
    pub level_before: u8,
    pub level_after: u8,
}

/// Result of an incorrect answer under the Leitner engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncorrectReview {
    pub new_state: CardState,
    pub points_deducted: u32,
    pub error_factor: f64,
    pub level_factor: f64,
    pub streak_loss_factor: f64,
    pub level_before: u8,
    pub level_after: u8,
}

/// Either outcome of a single Leitner review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReviewOutcome {
    Correct(CorrectReview),
    Incorrect(IncorrectReview),
}

impl ReviewOutcome {
    /// The card state after this review.
    pub fn new_state(&self) -> &CardState {
        match self {
            Self::Correct(review) => &review.new_state,
            Self::Incorrect(review) => &review.new_state,
        }
    }

    /// Signed point movement: positive for awards, negative for deductions.
    pub fn net_points(&self) -> i64 {
        match self {
            Self::Correct(review) => i64::from(review.points_delta),
            Self::Incorrect(review) => -i64::from(review.points_deducted),
        }
    }
}
