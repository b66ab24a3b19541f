//! Ten-level Leitner point engine.
//!
//! Points move a card through ten levels, each with its own review interval.
//! Correct answers award `base * success-multiplier * streak-bonus` points
//! (floored, minimum 1); misses deduct the product of an error factor, a
//! level factor, and a streak-loss factor, then drop the card into recovery
//! mode where the interval restarts at one day and doubles until it rejoins
//! the level interval.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

use super::{CorrectReview, IncorrectReview};
use crate::types::CardState;

/// One row of the level table.
#[derive(Debug, Clone, Copy)]
pub struct LevelSpec {
    /// Inclusive upper point bound for this level.
    pub upper_bound: u32,
    /// Review interval in days once a card sits at this level.
    pub interval_days: i64,
    /// Deduction factor applied when a card at this level is missed.
    pub miss_factor: f64,
}

/// Fixed level table. Level 10 is the open-ended catch-all.
pub const LEVELS: [LevelSpec; 10] = [
    LevelSpec { upper_bound: 10, interval_days: 1, miss_factor: 1.00 },
    LevelSpec { upper_bound: 25, interval_days: 2, miss_factor: 1.25 },
    LevelSpec { upper_bound: 50, interval_days: 4, miss_factor: 1.50 },
    LevelSpec { upper_bound: 85, interval_days: 7, miss_factor: 1.75 },
    LevelSpec { upper_bound: 120, interval_days: 10, miss_factor: 2.00 },
    LevelSpec { upper_bound: 175, interval_days: 12, miss_factor: 2.25 },
    LevelSpec { upper_bound: 220, interval_days: 14, miss_factor: 2.50 },
    LevelSpec { upper_bound: 285, interval_days: 20, miss_factor: 2.75 },
    LevelSpec { upper_bound: 350, interval_days: 25, miss_factor: 3.00 },
    LevelSpec { upper_bound: u32::MAX, interval_days: 30, miss_factor: 4.00 },
];

/// Level (1-10) for a point total: the first table row whose upper bound
/// covers it.
pub fn level_of(points: u32) -> u8 {
    for (index, spec) in LEVELS.iter().enumerate() {
        if points <= spec.upper_bound {
            return (index + 1) as u8;
        }
    }
    10
}

fn spec_of(level: u8) -> &'static LevelSpec {
    &LEVELS[usize::from(level.clamp(1, 10)) - 1]
}

/// Review interval in days for a level.
pub fn interval_of(level: u8) -> i64 {
    spec_of(level).interval_days
}

/// Miss-deduction factor for a level.
pub fn level_factor_of(level: u8) -> f64 {
    spec_of(level).miss_factor
}

/// Exponential success-rate multiplier over a percentage in `[0, 100]`.
///
/// Piecewise with exact values at the seams: `m(0)=0`, `m(50)=1`, `m(85)=2`,
/// `m(100)=3`.
pub fn success_multiplier(rate_pct: f64) -> f64 {
    if rate_pct <= 0.0 {
        0.0
    } else if rate_pct <= 50.0 {
        (rate_pct / 50.0).powi(2)
    } else if rate_pct <= 85.0 {
        1.0 + ((rate_pct - 50.0) / 35.0).powf(1.5)
    } else {
        2.0 + ((rate_pct - 85.0) / 15.0).powf(1.2)
    }
}

/// Bonus multiplier for a running positive streak.
pub fn streak_bonus(streak: u32) -> f64 {
    match streak {
        s if s >= 20 => 3.0,
        s if s >= 15 => 2.5,
        s if s >= 10 => 2.0,
        s if s >= 5 => 1.5,
        _ => 1.0,
    }
}

/// Deduction factor from the lifetime miss count.
pub fn error_factor(total_incorrect: u32) -> f64 {
    match total_incorrect {
        0..=5 => 1.0,
        6..=10 => 2.0,
        11..=15 => 3.0,
        16..=20 => 4.0,
        _ => 5.0,
    }
}

/// Deduction factor from the length of the positive streak a miss breaks.
pub fn streak_loss_factor(broken_streak: u32) -> f64 {
    match broken_streak {
        0..=4 => 1.0,
        5..=9 => 1.5,
        10..=14 => 2.0,
        15..=19 => 3.0,
        _ => 4.0,
    }
}

/// The 10-level Leitner scheduler. Stateless; all inputs are explicit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Leitner;

impl Leitner {
    /// Score a correct answer and derive the next due date.
    ///
    /// `was_wrong_in_session` marks a card already missed once in the current
    /// session: it earns nothing, keeps its positive streak untouched, and
    /// stays due today so a future session picks it up again.
    pub fn answer_correct(
        &self,
        state: &CardState,
        was_wrong_in_session: bool,
        now: DateTime<Utc>,
    ) -> CorrectReview {
        let level_before = state.level;
        // Multiplier reads the window as it stood before this answer, so a
        // card's very first review always scores with rate 0.
        let rate_pct = state.success_rate() * 100.0;
        let mut next = state.clone();

        if was_wrong_in_session {
            next.push_outcome(true);
            next.next_review_date = now;
            next.last_reviewed = Some(now);
            next.repetitions += 1;
            next.success_count += 1;
            return CorrectReview {
                new_state: next,
                points_delta: 0,
                base_points: 0,
                success_multiplier: 0.0,
                streak_bonus: 0.0,
                level_before,
                level_after: level_before,
            };
        }

        next.positive_streak += 1;
        next.negative_streak = 0;
        next.consecutive_correct += 1;
        next.push_outcome(true);
        next.repetitions += 1;
        next.success_count += 1;

        let base = next.positive_streak;
        let multiplier = success_multiplier(rate_pct);
        let bonus = streak_bonus(next.positive_streak);
        let delta = ((f64::from(base) * multiplier * bonus).floor() as u32).max(1);
        next.points += delta;
        next.sync_level();

        if next.in_recovery {
            let full = interval_of(next.level);
            next.recovery_interval_days = (next.recovery_interval_days * 2).min(full);
            if next.recovery_interval_days >= full {
                next.in_recovery = false;
            }
            next.next_review_date = now + Duration::days(next.recovery_interval_days);
        } else {
            next.next_review_date = now + Duration::days(interval_of(next.level));
        }
        next.last_reviewed = Some(now);

        CorrectReview {
            level_after: next.level,
            new_state: next,
            points_delta: delta,
            base_points: base,
            success_multiplier: multiplier,
            streak_bonus: bonus,
            level_before,
        }
    }

    /// Deduct points for a miss and put the card into recovery mode, due
    /// again immediately.
    pub fn answer_incorrect(&self, state: &CardState, now: DateTime<Utc>) -> IncorrectReview {
        let level_before = state.level;
        let broken_streak = state.positive_streak;
        let mut next = state.clone();

        next.negative_streak += 1;
        next.positive_streak = 0;
        next.consecutive_correct = 0;
        next.total_incorrect += 1;
        next.push_outcome(false);
        next.repetitions += 1;

        let error = error_factor(next.total_incorrect);
        // Level factor reads the level held when the miss happened, before
        // the deduction can demote the card.
        let level = level_factor_of(level_before);
        let streak_loss = streak_loss_factor(broken_streak);
        let deducted = (error * level * streak_loss).floor() as u32;
        next.points = next.points.saturating_sub(deducted);
        next.sync_level();

        next.in_recovery = true;
        next.recovery_interval_days = 1;
        next.next_review_date = now;
        next.last_reviewed = Some(now);

        IncorrectReview {
            level_after: next.level,
            new_state: next,
            points_deducted: deducted,
            error_factor: error,
            level_factor: level,
            streak_loss_factor: streak_loss,
            level_before,
        }
    }

    /// Spread due dates evenly across each level's interval span.
    ///
    /// Pure batch operation over points and levels: the returned states carry
    /// new `next_review_date`s only, pinned to noon UTC. The whole batch is
    /// computed before anything is handed back, so a caller can commit it
    /// all-or-nothing.
    pub fn reschedule_due_dates_evenly(
        &self,
        states: &[CardState],
        today: NaiveDate,
    ) -> Vec<CardState> {
        let mut groups: BTreeMap<u8, Vec<&CardState>> = BTreeMap::new();
        for state in states {
            groups.entry(level_of(state.points)).or_default().push(state);
        }

        let mut rescheduled = Vec::with_capacity(states.len());
        for (level, group) in groups {
            let span = interval_of(level);
            let n = group.len();
            for (index, state) in group.iter().enumerate() {
                let offset = if n == 1 {
                    span
                } else {
                    ((index as f64 / (n - 1) as f64) * span as f64).round() as i64
                };
                let mut next = (*state).clone();
                next.sync_level();
                next.next_review_date = noon_utc(today + Duration::days(offset));
                rescheduled.push(next);
            }
        }
        rescheduled
    }
}

// Noon keeps the rescheduled dates clear of day-boundary timezone drift.
fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap()
    }

    fn card(points: u32) -> CardState {
        let mut state = CardState::new("c1", now());
        state.points = points;
        state.sync_level();
        state
    }

    #[test]
    fn level_table_boundaries() {
        let cases = [
            (0, 1),
            (10, 1),
            (11, 2),
            (25, 2),
            (26, 3),
            (50, 3),
            (51, 4),
            (85, 4),
            (86, 5),
            (120, 5),
            (121, 6),
            (175, 6),
            (176, 7),
            (220, 7),
            (221, 8),
            (285, 8),
            (286, 9),
            (350, 9),
            (351, 10),
            (100_000, 10),
        ];
        for (points, level) in cases {
            assert_eq!(level_of(points), level, "points={points}");
        }
    }

    #[test]
    fn level_of_is_non_decreasing() {
        let mut previous = level_of(0);
        for points in 0..=400 {
            let level = level_of(points);
            assert!(level >= previous, "points={points}");
            previous = level;
        }
    }

    #[test]
    fn intervals_are_non_decreasing() {
        for level in 1..10u8 {
            assert!(interval_of(level + 1) >= interval_of(level));
            assert!(level_factor_of(level + 1) >= level_factor_of(level));
        }
    }

    #[test]
    fn multiplier_boundary_contract() {
        assert_eq!(success_multiplier(0.0), 0.0);
        assert_eq!(success_multiplier(50.0), 1.0);
        assert_eq!(success_multiplier(85.0), 2.0);
        assert_eq!(success_multiplier(100.0), 3.0);
    }

    #[test]
    fn multiplier_is_continuous_at_segment_seams() {
        for seam in [50.0, 85.0] {
            let below = success_multiplier(seam - 1e-9);
            let above = success_multiplier(seam + 1e-9);
            assert!((above - below).abs() < 1e-6, "seam={seam}");
        }
    }

    #[test]
    fn first_ever_correct_answer_earns_the_minimum_point() {
        // Empty window means rate 0 and multiplier 0; the floor-at-1 rule
        // still awards a single point.
        let state = card(0);
        let review = Leitner.answer_correct(&state, false, now());
        assert_eq!(review.base_points, 1);
        assert_eq!(review.success_multiplier, 0.0);
        assert_eq!(review.streak_bonus, 1.0);
        assert_eq!(review.points_delta, 1);
        assert_eq!(review.new_state.points, 1);
        assert_eq!(review.new_state.level, 1);
    }

    #[test]
    fn correct_answer_resets_negative_streak_and_grows_positive() {
        let mut state = card(5);
        state.negative_streak = 3;
        let review = Leitner.answer_correct(&state, false, now());
        assert_eq!(review.new_state.positive_streak, 1);
        assert_eq!(review.new_state.negative_streak, 0);
        assert_eq!(review.new_state.consecutive_correct, 1);
    }

    #[test]
    fn correct_answer_uses_full_level_interval_outside_recovery() {
        let mut state = card(100);
        for _ in 0..10 {
            state.push_outcome(true);
        }
        let review = Leitner.answer_correct(&state, false, now());
        let level = review.new_state.level;
        assert_eq!(
            review.new_state.next_review_date,
            now() + Duration::days(interval_of(level))
        );
    }

    #[test]
    fn award_combines_rate_multiplier_and_streak_bonus() {
        // Window full of hits: rate 100% so m=3; streak reaching 5 earns the
        // 1.5x bonus. delta = floor(5 * 3 * 1.5) = 22.
        let mut state = card(20);
        state.positive_streak = 4;
        for _ in 0..10 {
            state.push_outcome(true);
        }
        let review = Leitner.answer_correct(&state, false, now());
        assert_eq!(review.base_points, 5);
        assert_eq!(review.success_multiplier, 3.0);
        assert_eq!(review.streak_bonus, 1.5);
        assert_eq!(review.points_delta, 22);
        assert_eq!(review.new_state.points, 42);
    }

    #[test]
    fn wrong_in_session_correct_earns_nothing_and_stays_due() {
        let mut state = card(30);
        state.positive_streak = 2;
        let review = Leitner.answer_correct(&state, true, now());
        assert_eq!(review.points_delta, 0);
        assert_eq!(review.base_points, 0);
        assert_eq!(review.success_multiplier, 0.0);
        assert_eq!(review.streak_bonus, 0.0);
        assert_eq!(review.new_state.points, 30);
        // Streak survives untouched but does not grow.
        assert_eq!(review.new_state.positive_streak, 2);
        assert_eq!(review.new_state.next_review_date, now());
        assert_eq!(review.new_state.repetitions, state.repetitions + 1);
        assert_eq!(review.new_state.success_count, state.success_count + 1);
    }

    #[test]
    fn miss_deduction_arithmetic() {
        // points=50 is level 3; the sixth lifetime miss doubles the error
        // factor and a broken 12-streak doubles again:
        // floor(2 * 1.5 * 2.0) = 6.
        let mut state = card(50);
        state.total_incorrect = 5;
        state.positive_streak = 12;
        let review = Leitner.answer_incorrect(&state, now());
        assert_eq!(review.error_factor, 2.0);
        assert_eq!(review.level_factor, 1.5);
        assert_eq!(review.streak_loss_factor, 2.0);
        assert_eq!(review.points_deducted, 6);
        assert_eq!(review.new_state.points, 44);
        assert_eq!(review.new_state.level, 3);
        assert_eq!(review.level_before, 3);
    }

    #[test]
    fn miss_never_drives_points_below_zero() {
        let mut state = card(2);
        state.total_incorrect = 30;
        state.positive_streak = 25;
        let review = Leitner.answer_incorrect(&state, now());
        assert_eq!(review.new_state.points, 0);
        assert_eq!(review.new_state.level, 1);
    }

    #[test]
    fn miss_flips_streaks_and_enters_recovery() {
        let mut state = card(40);
        state.positive_streak = 7;
        let review = Leitner.answer_incorrect(&state, now());
        let next = &review.new_state;
        assert_eq!(next.positive_streak, 0);
        assert_eq!(next.negative_streak, 1);
        assert_eq!(next.consecutive_correct, 0);
        assert_eq!(next.total_incorrect, 1);
        assert!(next.in_recovery);
        assert_eq!(next.recovery_interval_days, 1);
        assert_eq!(next.next_review_date, now());
    }

    #[test]
    fn recovery_interval_doubles_until_it_rejoins_the_level_interval() {
        let mut state = card(100);
        for _ in 0..10 {
            state.push_outcome(true);
        }
        state = Leitner.answer_incorrect(&state, now()).new_state;
        assert!(state.in_recovery);

        // Level 5 interval is 10 days: 2, 4, 8, then capped at 10 and out.
        let mut expected = Vec::new();
        for _ in 0..4 {
            let review = Leitner.answer_correct(&state, false, now());
            state = review.new_state;
            expected.push(state.recovery_interval_days);
        }
        assert_eq!(expected, vec![2, 4, 8, 10]);
        assert!(!state.in_recovery);
    }

    #[test]
    fn reschedule_offsets_follow_the_rounding_rule() {
        // Three level-1 cards over a 1-day span: round(0/2)=0, round(1/2)=1,
        // round(2/2)=1.
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let states: Vec<CardState> = (0..3)
            .map(|i| CardState::new(format!("c{i}"), now()))
            .collect();
        let rescheduled = Leitner.reschedule_due_dates_evenly(&states, today);
        let offsets: Vec<i64> = rescheduled
            .iter()
            .map(|s| (s.next_review_date.date_naive() - today).num_days())
            .collect();
        assert_eq!(offsets, vec![0, 1, 1]);
        for state in &rescheduled {
            assert_eq!(state.next_review_date.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        }
    }

    #[test]
    fn reschedule_singleton_group_lands_at_the_full_interval() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let state = card(100); // level 5, 10-day interval
        let rescheduled = Leitner.reschedule_due_dates_evenly(&[state], today);
        assert_eq!(rescheduled.len(), 1);
        let offset = (rescheduled[0].next_review_date.date_naive() - today).num_days();
        assert_eq!(offset, 10);
    }

    #[test]
    fn reschedule_offsets_are_non_decreasing_and_bounded() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let states: Vec<CardState> = (0..7)
            .map(|i| {
                let mut s = CardState::new(format!("c{i}"), now());
                s.points = 100; // all level 5
                s.sync_level();
                s
            })
            .collect();
        let rescheduled = Leitner.reschedule_due_dates_evenly(&states, today);
        let offsets: Vec<i64> = rescheduled
            .iter()
            .map(|s| (s.next_review_date.date_naive() - today).num_days())
            .collect();
        let span = interval_of(5);
        for pair in offsets.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap(), span);
        for offset in offsets {
            assert!((0..=span).contains(&offset));
        }
    }

    #[test]
    fn reschedule_leaves_points_and_levels_alone() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let states = vec![card(40), card(200), card(3)];
        let rescheduled = Leitner.reschedule_due_dates_evenly(&states, today);
        let mut points: Vec<u32> = rescheduled.iter().map(|s| s.points).collect();
        points.sort_unstable();
        assert_eq!(points, vec![3, 40, 200]);
    }
}
