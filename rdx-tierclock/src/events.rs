//! Defines all public event types broadcast by the tierclock engine.
//!
//! Subscribers get a strongly-typed view of what every wheel does. Events are
//! best-effort: a subscriber that falls behind sees `RecvError::Lagged`, and
//! nothing in the engine waits on subscribers.

use crate::common::TaskId;
use crate::tier::Tier;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once all wheel loops and the migration consumer are live.
    EngineStarted { timestamp: Instant },
    /// Fired when a wheel's clock loop begins ticking.
    WheelStarted { tier: Tier },
    /// Fired when a wheel's clock loop exits after a stop signal.
    WheelStopped { tier: Tier },
    /// Fired once the stop signal has been broadcast.
    EngineShutdown,
}

/// Events related to individual timers.
#[derive(Debug, Clone)]
pub enum TimerEvent {
    /// A timer was accepted and queued on its nominal tier.
    TaskScheduled { id: TaskId, tier: Tier, interval: i64 },
    /// A registration was refused; the timer will never fire.
    TaskRejected { tier_id: u8, interval: i64, reason: &'static str },
    /// A timer's callback was dispatched. `fired` counts fires on this tier's copy.
    TaskFired { id: TaskId, tier: Tier, fired: i64, at: Instant },
    /// A timer's callback panicked. The wheel keeps ticking.
    CallbackPanicked { id: TaskId, tier: Tier },
    /// A remainder was handed to a finer tier.
    TaskCascaded { id: TaskId, from: Tier, to: Tier, remaining: i64 },
    /// A remainder was delivered into its destination wheel.
    TaskMigrated { id: TaskId, tier: Tier },
    /// The migration channel refused a remainder; the task stays on `from`.
    CascadeDropped { id: TaskId, from: Tier, to: Tier },
    /// A remainder matched no finer tier.
    CascadeStalled { id: TaskId, tier: Tier, remaining: i64 },
    /// A task spent its run count and left its wheel.
    TaskCompleted { id: TaskId, tier: Tier },
}
