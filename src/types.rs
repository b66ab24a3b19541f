//! Core types for the review-scheduling engine.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithm::leitner;

/// Number of recent outcomes kept for the success-rate window.
pub const HISTORY_WINDOW: usize = 10;

/// Flashcard content. Owned by the surrounding application; the engine only
/// needs it to filter session candidates by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

/// Mutable scheduling record for one flashcard.
///
/// `level` is always a pure function of `points`; every mutation path and the
/// persistence codec recompute it so the two can never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub id: String,
    pub points: u32,
    /// Leitner level 1-10, derived from `points`.
    pub level: u8,
    pub positive_streak: u32,
    pub negative_streak: u32,
    /// Lifetime miss counter, monotonically non-decreasing.
    pub total_incorrect: u32,
    /// Most recent outcomes, bounded at [`HISTORY_WINDOW`].
    pub success_history: VecDeque<bool>,
    pub in_recovery: bool,
    pub recovery_interval_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: DateTime<Utc>,
    // SM-2 compatibility fields.
    pub interval_days: i64,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub consecutive_correct: u32,
    pub success_count: u32,
}

impl CardState {
    /// Initial state for a card entering the learning pool: zero points,
    /// level 1, due immediately.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            points: 0,
            level: 1,
            positive_streak: 0,
            negative_streak: 0,
            total_incorrect: 0,
            success_history: VecDeque::new(),
            in_recovery: false,
            recovery_interval_days: 1,
            last_reviewed: None,
            next_review_date: now,
            interval_days: 0,
            ease_factor: 2.5,
            repetitions: 0,
            consecutive_correct: 0,
            success_count: 0,
        }
    }

    /// Mean of the bounded outcome window, in `[0, 1]`. Zero when no reviews
    /// have been recorded yet.
    pub fn success_rate(&self) -> f64 {
        if self.success_history.is_empty() {
            return 0.0;
        }
        let hits = self.success_history.iter().filter(|&&ok| ok).count();
        hits as f64 / self.success_history.len() as f64
    }

    /// All-time success rate in `[0, 1]`, from the lifetime counters rather
    /// than the bounded window.
    pub fn lifetime_success_rate(&self) -> f64 {
        if self.repetitions == 0 {
            return 0.0;
        }
        f64::from(self.success_count) / f64::from(self.repetitions)
    }

    pub(crate) fn push_outcome(&mut self, correct: bool) {
        self.success_history.push_back(correct);
        while self.success_history.len() > HISTORY_WINDOW {
            self.success_history.pop_front();
        }
    }

    pub(crate) fn sync_level(&mut self) {
        self.level = leitner::level_of(self.points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_card_starts_at_level_one_and_due_now() {
        let now = Utc::now();
        let state = CardState::new("c1", now);
        assert_eq!(state.points, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.next_review_date, now);
        assert!(state.last_reviewed.is_none());
    }

    #[test]
    fn success_rate_is_zero_for_empty_history() {
        let state = CardState::new("c1", Utc::now());
        assert_eq!(state.success_rate(), 0.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut state = CardState::new("c1", Utc::now());
        for i in 0..25 {
            state.push_outcome(i % 2 == 0);
            assert!(state.success_history.len() <= HISTORY_WINDOW);
            let rate = state.success_rate();
            assert!((0.0..=1.0).contains(&rate));
        }
        assert_eq!(state.success_history.len(), HISTORY_WINDOW);
    }

    #[test]
    fn unreviewed_state_round_trips_through_json() {
        // last_reviewed is omitted from the serialized form until the first
        // review; decoding must tolerate the absence.
        let state = CardState::new("c1", Utc::now());
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("last_reviewed"));
        let decoded: CardState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn uncategorized_card_round_trips_through_json() {
        let card = Card {
            id: "c1".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            category: None,
            subcategory: None,
        };
        let json = serde_json::to_string(&card).unwrap();
        let decoded: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, card.id);
        assert_eq!(decoded.category, None);
        assert_eq!(decoded.subcategory, None);
    }

    #[test]
    fn history_keeps_most_recent_outcomes() {
        let mut state = CardState::new("c1", Utc::now());
        for _ in 0..10 {
            state.push_outcome(false);
        }
        for _ in 0..10 {
            state.push_outcome(true);
        }
        assert_eq!(state.success_rate(), 1.0);
    }
}
