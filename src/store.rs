//! Card persistence seam.
//!
//! The engine performs no I/O itself; the surrounding application hands it a
//! [`CardStore`]. [`PersistedCardState`] is the logical persisted record:
//! every field the scheduler added over time is optional with its initial
//! value declared here, once, so records written by older versions decode
//! cleanly.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::types::{CardState, HISTORY_WINDOW};

/// Loads and saves scheduling state. Owned by the surrounding application.
pub trait CardStore {
    fn load_all(&self) -> Result<Vec<CardState>>;
    fn save(&mut self, state: &CardState) -> Result<()>;
}

/// In-memory store keyed by card id, for tests and embedded callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    states: BTreeMap<String, CardState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&CardState> {
        self.states.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<CardState> {
        self.states
            .remove(id)
            .ok_or_else(|| SchedulerError::UnknownCard { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl CardStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<CardState>> {
        Ok(self.states.values().cloned().collect())
    }

    fn save(&mut self, state: &CardState) -> Result<()> {
        self.states.insert(state.id.clone(), state.clone());
        Ok(())
    }
}

fn default_ease() -> f64 {
    2.5
}

fn default_recovery_interval() -> i64 {
    1
}

/// The persisted shape of a [`CardState`]. Dates travel as RFC 3339 strings;
/// all Leitner fields default so pre-Leitner records still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCardState {
    pub id: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub positive_streak: u32,
    #[serde(default)]
    pub negative_streak: u32,
    #[serde(default)]
    pub total_incorrect: u32,
    #[serde(default)]
    pub success_history: Vec<bool>,
    #[serde(default)]
    pub in_recovery: bool,
    #[serde(default = "default_recovery_interval")]
    pub recovery_interval_days: i64,
    #[serde(default)]
    pub last_reviewed: Option<String>,
    #[serde(default)]
    pub next_review_date: Option<String>,
    #[serde(default)]
    pub interval_days: i64,
    #[serde(default = "default_ease")]
    pub ease_factor: f64,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub consecutive_correct: u32,
    #[serde(default)]
    pub success_count: u32,
}

impl PersistedCardState {
    /// Decode into a live state. Unparsable or missing timestamps fall back
    /// to `now` with a warning; the level is recomputed from the points so a
    /// stale persisted level can never leak in.
    pub fn into_state(self, now: DateTime<Utc>) -> CardState {
        let last_reviewed = self
            .last_reviewed
            .map(|raw| parse_timestamp(&raw, now, &self.id, "last_reviewed"));
        let next_review_date = match self.next_review_date {
            Some(raw) => parse_timestamp(&raw, now, &self.id, "next_review_date"),
            None => now,
        };

        let mut history: VecDeque<bool> = self.success_history.into_iter().collect();
        while history.len() > HISTORY_WINDOW {
            history.pop_front();
        }

        let mut state = CardState {
            id: self.id,
            points: self.points,
            level: 1,
            positive_streak: self.positive_streak,
            negative_streak: self.negative_streak,
            total_incorrect: self.total_incorrect,
            success_history: history,
            in_recovery: self.in_recovery,
            recovery_interval_days: self.recovery_interval_days.max(1),
            last_reviewed,
            next_review_date,
            interval_days: self.interval_days,
            ease_factor: self.ease_factor.max(1.3),
            repetitions: self.repetitions,
            consecutive_correct: self.consecutive_correct,
            success_count: self.success_count,
        };
        state.sync_level();
        state
    }

    pub fn from_state(state: &CardState) -> Self {
        Self {
            id: state.id.clone(),
            points: state.points,
            positive_streak: state.positive_streak,
            negative_streak: state.negative_streak,
            total_incorrect: state.total_incorrect,
            success_history: state.success_history.iter().copied().collect(),
            in_recovery: state.in_recovery,
            recovery_interval_days: state.recovery_interval_days,
            last_reviewed: state.last_reviewed.map(|t| t.to_rfc3339()),
            next_review_date: Some(state.next_review_date.to_rfc3339()),
            interval_days: state.interval_days,
            ease_factor: state.ease_factor,
            repetitions: state.repetitions,
            consecutive_correct: state.consecutive_correct,
            success_count: state.success_count,
        }
    }
}

fn parse_timestamp(raw: &str, now: DateTime<Utc>, id: &str, field: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(err) => {
            warn!(card = %id, %field, %err, "unparsable persisted timestamp, defaulting to now");
            now
        }
    }
}
