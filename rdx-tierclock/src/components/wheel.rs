//! One resolution tier's runtime state: an ordered task queue and the
//! synchronous tick step the engine's clock loop drives.
//!
//! A tick is split in two so the engine can attempt migrations without the
//! wheel knowing about channels. [`Wheel::advance`] accumulates scale and
//! returns what happened; fires are committed immediately, cascades only once
//! the engine reports a successful hand-off through [`Wheel::commit_cascade`].
//! [`Wheel::retire_completed`] then drops every task whose run count is spent.

use crate::common::{TaskId, TaskKey};
use crate::components::router::{decide, Decision};
use crate::components::task::{Callback, Task};
use crate::config::ServiceMode;
use crate::tier::Tier;
use slotmap::SlotMap;
use std::collections::VecDeque;
use tokio::time::Instant;

/// A remainder in flight between two wheels.
#[derive(Debug)]
pub struct MigrationEnvelope {
    /// The destination wheel.
    pub tier: Tier,
    /// A fresh single-shot task carrying the remaining interval.
    pub task: Task,
}

/// What advancing a single task produced during a tick.
pub enum Step {
    /// Committed: the task's cycle ended and its callback must run.
    Fire {
        id: TaskId,
        callback: Callback,
        fired: i64,
    },
    /// Pending: the remainder must reach `envelope.tier` before the cascade counts.
    Cascade {
        key: TaskKey,
        id: TaskId,
        envelope: MigrationEnvelope,
    },
    /// No finer tier accepts the remainder.
    Stalled { id: TaskId, remaining: i64 },
}

pub struct Wheel {
    tier: Tier,
    tasks: SlotMap<TaskKey, Task>,
    order: VecDeque<TaskKey>,
}

impl Wheel {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            tasks: SlotMap::with_key(),
            order: VecDeque::new(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Appends a task at the tail of the queue.
    pub fn push(&mut self, task: Task) -> TaskKey {
        let key = self.tasks.insert(task);
        self.order.push_back(key);
        key
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: TaskKey) -> Option<&Task> {
        self.tasks.get(key)
    }

    pub fn head(&self) -> Option<&Task> {
        self.order.front().and_then(|key| self.tasks.get(*key))
    }

    /// Advances the serviced tasks by one tick scheduled at `tick_at`.
    ///
    /// A task enqueued at or after `tick_at` is not credited: a remainder
    /// delivered on a coarse tick shares that instant with this wheel's own
    /// tick, which covers time the remainder never waited.
    pub fn advance(&mut self, mode: ServiceMode, tick_at: Instant) -> Vec<Step> {
        let serviced: Vec<TaskKey> = match mode {
            ServiceMode::HeadOnly => self.order.front().copied().into_iter().collect(),
            ServiceMode::AllDue => self.order.iter().copied().collect(),
        };

        let tier = self.tier;
        let mut steps = Vec::new();
        for key in serviced {
            let Some(task) = self.tasks.get_mut(key) else {
                continue;
            };
            if !task.is_eligible(tick_at) {
                continue;
            }
            task.touch(tick_at);
            task.scales += tier.scale();
            match decide(tier, task.remaining()) {
                Decision::Fire => {
                    task.record_fire();
                    steps.push(Step::Fire {
                        id: task.id,
                        callback: task.callback.clone(),
                        fired: task.fired,
                    });
                }
                Decision::Cascade { to, remaining } => {
                    steps.push(Step::Cascade {
                        key,
                        id: task.id,
                        envelope: MigrationEnvelope {
                            tier: to,
                            task: task.remainder(remaining, tick_at),
                        },
                    });
                }
                Decision::Wait => {}
                Decision::Stalled { remaining } => {
                    steps.push(Step::Stalled {
                        id: task.id,
                        remaining,
                    });
                }
            }
        }
        steps
    }

    /// Counts a cascade against the task once its remainder has been handed off.
    pub fn commit_cascade(&mut self, key: TaskKey) {
        if let Some(task) = self.tasks.get_mut(key) {
            task.record_cascade();
        }
    }

    /// Removes every task whose run count is spent, preserving queue order.
    pub fn retire_completed(&mut self) -> Vec<Task> {
        let tasks = &mut self.tasks;
        let mut retired = Vec::new();
        self.order.retain(|key| {
            let done = tasks.get(*key).map_or(true, Task::is_complete);
            if done {
                if let Some(task) = tasks.remove(*key) {
                    retired.push(task);
                }
            }
            !done
        });
        retired
    }
}
