//! Defines the scheduled unit of work a wheel holds.

use crate::common::TaskId;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// The work a timer performs. Shared between a task and its cascaded remainders.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// A timer waiting in a wheel.
///
/// `scales` accumulates elapsed milliseconds since the last fire or cascade.
/// `enqueued_at` is when the task entered its current wheel; only ticks
/// scheduled after that instant count towards it.
/// Each cycle ends in exactly one action, either a direct fire or a cascade of
/// the remainder to a finer wheel, and the task leaves its wheel once
/// `mark() == runs`.
pub struct Task {
    pub id: TaskId,
    pub created_at: DateTime<Utc>,
    pub enqueued_at: Instant,
    pub started_at: Option<Instant>,
    pub interval: i64,
    pub runs: i64,
    pub callback: Callback,
    pub scales: i64,
    pub fired: i64,
    pub cascaded: i64,
}

impl Task {
    /// Creates a waiting task. A non-positive `runs` is treated as a single run.
    pub fn new(id: TaskId, interval: i64, runs: i64, callback: Callback) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            enqueued_at: Instant::now(),
            started_at: None,
            interval,
            runs: runs.max(1),
            callback,
            scales: 0,
            fired: 0,
            cascaded: 0,
        }
    }

    /// Builds the single-shot remainder that continues this task on a finer
    /// wheel, as of the tick scheduled at `at`.
    pub fn remainder(&self, remaining: i64, at: Instant) -> Task {
        let mut rest = Task::new(self.id, remaining, 1, self.callback.clone());
        rest.enqueued_at = at;
        rest
    }

    /// Whether a tick scheduled at `tick_at` covers time this task spent queued.
    pub fn is_eligible(&self, tick_at: Instant) -> bool {
        self.enqueued_at < tick_at
    }

    /// Completed actions, fires and cascades alike.
    pub fn mark(&self) -> i64 {
        self.fired + self.cascaded
    }

    pub fn is_complete(&self) -> bool {
        self.mark() >= self.runs
    }

    /// Time left in the current cycle after the scale accumulated so far.
    pub fn remaining(&self) -> i64 {
        self.interval - self.scales
    }

    /// Records the first tick that touched this task.
    pub(crate) fn touch(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub(crate) fn record_fire(&mut self) {
        self.scales = 0;
        self.fired += 1;
    }

    pub(crate) fn record_cascade(&mut self) {
        self.scales = 0;
        self.cascaded += 1;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("runs", &self.runs)
            .field("scales", &self.scales)
            .field("fired", &self.fired)
            .field("cascaded", &self.cascaded)
            .finish_non_exhaustive()
    }
}
