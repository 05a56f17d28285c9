//! Decides what a tick does to a task, and where a cascading remainder goes.

use crate::tier::Tier;

/// The outcome of advancing one task by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The cycle's deadline has been reached.
    Fire,
    /// The deadline falls inside the current tick window; hand `remaining` to `to`.
    Cascade { to: Tier, remaining: i64 },
    /// Keep accumulating on the current wheel.
    Wait,
    /// A cascade was due but no finer tier covers the remainder. The task keeps
    /// accumulating and will fire late on its own wheel.
    Stalled { remaining: i64 },
}

/// Classifies a task on `tier` given the time left in its cycle.
pub fn decide(tier: Tier, remaining: i64) -> Decision {
    if remaining <= 0 {
        return Decision::Fire;
    }
    if remaining >= tier.scale() {
        return Decision::Wait;
    }
    match cascade_target(tier, remaining) {
        Some(to) => Decision::Cascade { to, remaining },
        // The finest wheel has nowhere to go; its next tick fires the task.
        None if tier.is_finest() => Decision::Wait,
        None => Decision::Stalled { remaining },
    }
}

/// Picks the finest-fitting tier below `from` for a remainder of `remaining` ms.
///
/// Tiers are scanned from the next finer one down to the finest. A remainder
/// shorter than anything the finest tier accepts still goes to the finest
/// tier, whose first tick fires it.
pub fn cascade_target(from: Tier, remaining: i64) -> Option<Tier> {
    if remaining <= 0 {
        return None;
    }
    let mut candidate = from.finer();
    while let Some(tier) = candidate {
        if tier.range().covers(remaining) {
            return Some(tier);
        }
        candidate = tier.finer();
    }
    if !from.is_finest() && remaining < Tier::FINEST.range().min {
        return Some(Tier::FINEST);
    }
    None
}
