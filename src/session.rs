//! Session selection and in-session retry handling.
//!
//! The orchestrator builds a session queue from due cards and routes each
//! answer through the Leitner engine. Missed cards are pushed back a few
//! positions into the queue; once a card has been missed, a later correct
//! answer in the same session resolves it without awarding points.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::algorithm::leitner::{level_of, Leitner};
use crate::algorithm::ReviewOutcome;
use crate::types::{Card, CardState};

/// How far ahead of today a card's due date may lie and still be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueWindow {
    Days(i64),
    /// Ignore due dates entirely.
    All,
}

/// Where a missed card goes back into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReinsertMode {
    /// A few positions back, regardless of the card.
    Fixed,
    /// Further back the better the card's lifetime success rate.
    SuccessRate,
}

impl Default for ReinsertMode {
    fn default() -> Self {
        Self::Fixed
    }
}

/// Filters applied when building a session queue.
#[derive(Debug, Clone)]
pub struct DueQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub level: Option<u8>,
    pub due_window: DueWindow,
    pub limit: usize,
}

impl Default for DueQuery {
    fn default() -> Self {
        Self {
            category: None,
            subcategory: None,
            level: None,
            due_window: DueWindow::Days(0),
            limit: usize::MAX,
        }
    }
}

/// A card paired with its scheduling state for the duration of a session.
#[derive(Debug, Clone)]
pub struct StudyCard {
    pub card: Card,
    pub state: CardState,
}

/// One answered review within a session.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub card_id: String,
    pub outcome: ReviewOutcome,
    pub reviewed_at: DateTime<Utc>,
}

/// Aggregated counters for a finished (or in-flight) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub reviewed: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub net_points: i64,
    pub elapsed: Duration,
}

/// The queue and bookkeeping for one review session. Owned by exactly one
/// session; carries no rendering concerns.
#[derive(Debug, Clone)]
pub struct SessionState {
    queue: VecDeque<StudyCard>,
    wrong_ids: HashSet<String>,
    records: Vec<ReviewRecord>,
    started_at: DateTime<Utc>,
}

impl SessionState {
    /// The card currently at the front of the queue.
    pub fn current(&self) -> Option<&StudyCard> {
        self.queue.front()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    /// Whether a card has been missed at least once this session.
    pub fn was_wrong(&self, card_id: &str) -> bool {
        self.wrong_ids.contains(card_id)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let mut correct = 0;
        let mut incorrect = 0;
        let mut net_points = 0i64;
        for record in &self.records {
            match &record.outcome {
                ReviewOutcome::Correct(_) => correct += 1,
                ReviewOutcome::Incorrect(_) => incorrect += 1,
            }
            net_points += record.outcome.net_points();
        }
        SessionSummary {
            reviewed: self.records.len(),
            correct,
            incorrect,
            net_points,
            elapsed: now - self.started_at,
        }
    }
}

/// Builds session queues and applies answers through the Leitner engine.
#[derive(Debug, Clone, Default)]
pub struct SessionOrchestrator {
    scheduler: Leitner,
    reinsert_mode: ReinsertMode,
}

impl SessionOrchestrator {
    pub fn new(reinsert_mode: ReinsertMode) -> Self {
        Self {
            scheduler: Leitner,
            reinsert_mode,
        }
    }

    /// Select due cards into a fresh session queue.
    ///
    /// Cards pass the optional category/subcategory/level filters and the due
    /// window, then are grouped by due date, shuffled within each date group,
    /// and concatenated in ascending date order before the limit applies.
    pub fn select_due<R: Rng>(
        &self,
        cards: &[StudyCard],
        query: &DueQuery,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SessionState {
        // Date granularity, not timestamps: a card due later today is due
        // for a session started this morning, matching the date grouping
        // below and the noon-pinned dates the even reschedule writes.
        let horizon = match query.due_window {
            DueWindow::Days(days) => Some(now.date_naive() + Duration::days(days)),
            DueWindow::All => None,
        };

        let mut by_date: BTreeMap<NaiveDate, Vec<StudyCard>> = BTreeMap::new();
        for study_card in cards {
            if !matches_query(study_card, query) {
                continue;
            }
            if let Some(horizon) = horizon {
                if study_card.state.next_review_date.date_naive() > horizon {
                    continue;
                }
            }
            by_date
                .entry(study_card.state.next_review_date.date_naive())
                .or_default()
                .push(study_card.clone());
        }

        let mut queue = VecDeque::new();
        for mut group in by_date.into_values() {
            group.shuffle(rng);
            queue.extend(group);
        }
        queue.truncate(query.limit);

        SessionState {
            queue,
            wrong_ids: HashSet::new(),
            records: Vec::new(),
            started_at: now,
        }
    }

    /// Apply the learner's answer to the card at the front of the queue.
    ///
    /// Correct answers drop the card from the session. Incorrect answers
    /// reinsert it a few positions back and remember it as missed, so a later
    /// correct answer resolves it without points and without reinsertion.
    ///
    /// Returns `None` (with a warning) when the queue is empty; stale UI
    /// references must not panic the engine.
    pub fn answer<R: Rng>(
        &self,
        session: &mut SessionState,
        correct: bool,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<ReviewOutcome> {
        let Some(mut front) = session.queue.pop_front() else {
            warn!("answer reported with an empty session queue, ignoring");
            return None;
        };

        let outcome = if correct {
            let was_wrong = session.wrong_ids.contains(&front.card.id);
            let review = self.scheduler.answer_correct(&front.state, was_wrong, now);
            ReviewOutcome::Correct(review)
        } else {
            session.wrong_ids.insert(front.card.id.clone());
            let review = self.scheduler.answer_incorrect(&front.state, now);
            front.state = review.new_state.clone();
            let slot = self.reinsert_slot(&front.state, session.queue.len(), rng);
            session.queue.insert(slot, front.clone());
            ReviewOutcome::Incorrect(review)
        };

        session.records.push(ReviewRecord {
            card_id: front.card.id,
            outcome: outcome.clone(),
            reviewed_at: now,
        });
        Some(outcome)
    }

    fn reinsert_slot<R: Rng>(&self, state: &CardState, remaining: usize, rng: &mut R) -> usize {
        if remaining == 0 {
            return 0;
        }
        let (low, high) = match self.reinsert_mode {
            ReinsertMode::Fixed => (3, 5),
            ReinsertMode::SuccessRate => {
                let rate_pct = state.lifetime_success_rate() * 100.0;
                if rate_pct < 30.0 {
                    (3, 5)
                } else if rate_pct < 50.0 {
                    (5, 8)
                } else if rate_pct < 65.0 {
                    (8, 10)
                } else {
                    (15, 30)
                }
            }
        };
        let low = low.min(remaining);
        let high = high.min(remaining);
        rng.gen_range(low..=high)
    }
}

fn matches_query(study_card: &StudyCard, query: &DueQuery) -> bool {
    if let Some(category) = &query.category {
        if study_card.card.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(subcategory) = &query.subcategory {
        if study_card.card.subcategory.as_deref() != Some(subcategory.as_str()) {
            return false;
        }
    }
    if let Some(level) = query.level {
        if level_of(study_card.state.points) != level {
            return false;
        }
    }
    true
}
