//! Classic SM-2 interval/ease updater, kept as the legacy scheduling mode.

use chrono::{DateTime, Duration, Utc};

use super::Sm2Review;
use crate::error::{Result, SchedulerError};
use crate::types::CardState;

/// SM-2 with configurable ease parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub minimum_ease: f64,
    pub ease_gain: f64,
    pub ease_penalty: f64,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            minimum_ease: 1.3,
            ease_gain: 0.1,
            ease_penalty: 0.2,
        }
    }
}

impl Sm2 {
    /// Apply one graded review. `quality` is the 0-5 recall grade; 3 and up
    /// counts as a pass.
    ///
    /// An out-of-range grade is rejected before any field is touched, so a
    /// failed call leaves the caller's state exactly as it was.
    pub fn review(&self, state: &CardState, quality: u8, now: DateTime<Utc>) -> Result<Sm2Review> {
        if quality > 5 {
            return Err(SchedulerError::InvalidQuality { quality });
        }

        let mut next = state.clone();
        if quality >= 3 {
            next.interval_days = match next.consecutive_correct {
                0 => 1,
                1 => 6,
                _ => (next.interval_days as f64 * next.ease_factor).floor() as i64,
            };
            next.consecutive_correct += 1;
            next.ease_factor += self.ease_gain;
            next.success_count += 1;
        } else {
            next.consecutive_correct = 0;
            next.interval_days = 1;
            next.ease_factor -= self.ease_penalty;
        }
        next.ease_factor = next.ease_factor.max(self.minimum_ease);

        next.last_reviewed = Some(now);
        next.next_review_date = now + Duration::days(next.interval_days);
        next.repetitions += 1;

        Ok(Sm2Review {
            next_due: next.next_review_date,
            new_state: next,
        })
    }
}
