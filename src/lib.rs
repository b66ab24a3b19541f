//! Adaptive review-scheduling engine for flashcard learning.
//!
//! Provides:
//! - The 10-level Leitner point engine (success-rate multipliers, streak
//!   bonuses, multi-factor miss penalties, recovery mode)
//! - Classic SM-2 interval/ease scheduling as the legacy mode
//! - Session selection with in-session retry reinsertion
//! - Batch due-date redistribution
//! - A `CardStore` seam and a versioned persisted-record codec
//!
//! The engine is pure and synchronous: every operation takes the current
//! time explicitly, mutates nothing it does not return, and performs no I/O.

pub mod algorithm;
pub mod error;
pub mod session;
pub mod store;
pub mod types;

pub use algorithm::leitner::{
    error_factor, interval_of, level_factor_of, level_of, streak_bonus, streak_loss_factor,
    success_multiplier, Leitner, LevelSpec, LEVELS,
};
pub use algorithm::sm2::Sm2;
pub use algorithm::{CorrectReview, IncorrectReview, ReviewOutcome, Sm2Review};
pub use error::{Result, SchedulerError};
pub use session::{
    DueQuery, DueWindow, ReinsertMode, ReviewRecord, SessionOrchestrator, SessionState,
    SessionSummary, StudyCard,
};
pub use store::{CardStore, MemoryStore, PersistedCardState};
pub use types::{Card, CardState, HISTORY_WINDOW};
