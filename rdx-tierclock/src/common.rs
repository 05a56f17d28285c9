//! Contains common, primitive types shared across the engine.
//!
//! Two identifiers exist. [`TaskId`] names a registered timer for its whole
//! life, including every remainder it cascades into a finer wheel. [`TaskKey`]
//! is the slot a task occupies inside one wheel's storage and is only
//! meaningful to that wheel.

use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Uniquely identifies a task's slot inside a single wheel.
    ///
    /// Keys are never reused by a wheel, so a stale key cannot alias a newer task.
    pub struct TaskKey;
}

/// Identifies a registered timer.
///
/// A cascaded remainder carries the id of the timer it was split from, so
/// events from every tier can be correlated back to the original registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}
