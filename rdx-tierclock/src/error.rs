//! Error types produced by the tierclock engine.
//!
//! Registration problems are returned to the caller *and* logged, so a timer
//! that is rejected is observable both ways: it never fires, and the caller
//! gets a [`TimerError`] it may inspect or ignore.

use crate::tier::Tier;
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The numeric tier id has no entry in the tier table.
    #[error("unknown tier id {id}")]
    UnknownTier { id: u8 },

    /// The interval falls outside the chosen tier's accepted range.
    #[error("interval {interval}ms outside tier {tier} range [{min}, {max}]")]
    IntervalOutOfRange {
        tier: Tier,
        interval: i64,
        min: i64,
        max: i64,
    },

    /// No finer tier covers a cascade remainder. Indicates a broken tier table.
    #[error("no cascade target below tier {from} for remaining {remaining}ms")]
    NoCascadeTarget { from: Tier, remaining: i64 },

    /// `start` was called on an engine whose workers are already running.
    #[error("engine already started")]
    AlreadyStarted,

    /// The engine's workers were never started.
    #[error("engine not started")]
    NotStarted,

    /// The engine has been shut down and no longer ticks.
    #[error("engine stopped")]
    Stopped,
}

impl TimerError {
    /// Returns a short stable label (snake_case) for use in logs and events.
    ///
    /// # Example
    /// ```
    /// use tierclock::error::TimerError;
    ///
    /// assert_eq!(TimerError::UnknownTier { id: 9 }.as_label(), "unknown_tier");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TimerError::UnknownTier { .. } => "unknown_tier",
            TimerError::IntervalOutOfRange { .. } => "interval_out_of_range",
            TimerError::NoCascadeTarget { .. } => "no_cascade_target",
            TimerError::AlreadyStarted => "already_started",
            TimerError::NotStarted => "not_started",
            TimerError::Stopped => "stopped",
        }
    }

    /// Whether the error is a caller mistake rather than an engine fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TimerError::UnknownTier { .. } | TimerError::IntervalOutOfRange { .. }
        )
    }
}
