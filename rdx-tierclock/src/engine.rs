//! The core engine that owns every wheel and orchestrates the tierclock system.

use crate::common::TaskId;
use crate::components::task::{Callback, Task};
use crate::components::wheel::{MigrationEnvelope, Step, Wheel};
use crate::config::{CallbackDispatch, TierclockConfig};
use crate::error::TimerError;
use crate::events::{SystemEvent, TimerEvent};
use crate::tier::Tier;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Barrier, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// The main tierclock engine.
///
/// Holds one [`Wheel`] per [`Tier`], the bounded migration channel that moves
/// cascading remainders between wheels, and the event streams. The engine is a
/// cheap-to-clone handle; every clone drives the same wheels.
///
/// Each wheel sits behind its own mutex. Registration, migration delivery and
/// the wheel's clock loop are the only writers and all of them take that lock.
#[derive(Clone)]
pub struct TierclockEngine {
    config: Arc<TierclockConfig>,
    wheels: Arc<Vec<Mutex<Wheel>>>,
    migration_sender: mpsc::Sender<MigrationEnvelope>,
    migration_receiver: Arc<Mutex<Option<mpsc::Receiver<MigrationEnvelope>>>>,
    shutdown_sender: broadcast::Sender<()>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    timer_event_sender: broadcast::Sender<TimerEvent>,
    next_task_id: Arc<AtomicU64>,
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

// Core implementation block for internal logic.
impl TierclockEngine {
    /// Creates a new `TierclockEngine` with the given configuration.
    ///
    /// No worker runs until [`start`](Self::start) is called; timers added
    /// before that wait in their wheels.
    pub fn new(config: TierclockConfig) -> Self {
        let (migration_sender, migration_receiver) = mpsc::channel(config.migration_capacity);
        let (shutdown_sender, _) = broadcast::channel(1);
        let (system_event_sender, _) = broadcast::channel(64);
        let (timer_event_sender, _) = broadcast::channel(config.event_capacity);

        let wheels: Vec<Mutex<Wheel>> = Tier::ALL
            .iter()
            .map(|tier| Mutex::new(Wheel::new(*tier)))
            .collect();

        Self {
            config: Arc::new(config),
            wheels: Arc::new(wheels),
            migration_sender,
            migration_receiver: Arc::new(Mutex::new(Some(migration_receiver))),
            shutdown_sender,
            system_event_sender,
            timer_event_sender,
            next_task_id: Arc::new(AtomicU64::new(1)),
            started: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    fn wheel(&self, tier: Tier) -> &Mutex<Wheel> {
        &self.wheels[tier.index()]
    }

    #[doc(hidden)]
    async fn wheel_loop(
        self,
        tier: Tier,
        mut shutdown_rx: broadcast::Receiver<()>,
        ready: Arc<Barrier>,
    ) {
        let period = tier.period();
        let mut ticker = interval_at(Instant::now() + period, period);
        // A stalled loop resumes one period later instead of replaying missed ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.system_event_sender
            .send(SystemEvent::WheelStarted { tier })
            .ok();
        ready.wait().await;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                tick_at = ticker.tick() => self.process_tick(tier, tick_at).await,
            }
        }
        debug!(%tier, "Wheel loop stopped.");
        self.system_event_sender
            .send(SystemEvent::WheelStopped { tier })
            .ok();
    }

    #[doc(hidden)]
    async fn migration_loop(
        self,
        mut migration_rx: mpsc::Receiver<MigrationEnvelope>,
        mut shutdown_rx: broadcast::Receiver<()>,
        ready: Arc<Barrier>,
    ) {
        ready.wait().await;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                envelope = migration_rx.recv() => match envelope {
                    Some(envelope) => self.deliver(envelope).await,
                    None => break,
                },
            }
        }
        debug!("Migration loop stopped.");
    }

    /// Appends a migrated remainder to its destination wheel.
    #[doc(hidden)]
    async fn deliver(&self, envelope: MigrationEnvelope) {
        let MigrationEnvelope { tier, task } = envelope;
        let id = task.id;
        self.wheel(tier).lock().await.push(task);
        trace!(%id, %tier, "Remainder delivered.");
        self.timer_event_sender
            .send(TimerEvent::TaskMigrated { id, tier })
            .ok();
    }

    /// One tick of `tier`'s wheel, scheduled at `tick_at`.
    ///
    /// The wheel lock is released while callbacks run and remainders are sent,
    /// so a full migration channel can never hold a wheel the consumer needs.
    /// Only this loop removes tasks from the wheel, so the keys returned by
    /// `advance` stay valid until the lock is taken again.
    #[doc(hidden)]
    async fn process_tick(&self, tier: Tier, tick_at: Instant) {
        let steps = {
            let mut wheel = self.wheel(tier).lock().await;
            if wheel.is_empty() {
                return;
            }
            trace!(%tier, pending = wheel.len(), "Tick.");
            wheel.advance(self.config.service_mode, tick_at)
        };

        let mut delivered = Vec::new();
        for step in steps {
            match step {
                Step::Fire {
                    id,
                    callback,
                    fired,
                } => {
                    self.dispatch(id, tier, callback);
                    self.timer_event_sender
                        .send(TimerEvent::TaskFired {
                            id,
                            tier,
                            fired,
                            at: Instant::now(),
                        })
                        .ok();
                }
                Step::Cascade { key, id, envelope } => {
                    let to = envelope.tier;
                    let remaining = envelope.task.interval;
                    if self.migrate(envelope).await {
                        debug!(%id, from = %tier, %to, remaining, "Task cascaded.");
                        delivered.push(key);
                        self.timer_event_sender
                            .send(TimerEvent::TaskCascaded {
                                id,
                                from: tier,
                                to,
                                remaining,
                            })
                            .ok();
                    } else {
                        warn!(%id, from = %tier, %to, "Migration channel full; remainder dropped.");
                        self.timer_event_sender
                            .send(TimerEvent::CascadeDropped { id, from: tier, to })
                            .ok();
                    }
                }
                Step::Stalled { id, remaining } => {
                    let fault = TimerError::NoCascadeTarget {
                        from: tier,
                        remaining,
                    };
                    error!(%id, "{fault}");
                    self.timer_event_sender
                        .send(TimerEvent::CascadeStalled {
                            id,
                            tier,
                            remaining,
                        })
                        .ok();
                }
            }
        }

        let mut wheel = self.wheel(tier).lock().await;
        for key in delivered {
            wheel.commit_cascade(key);
        }
        for task in wheel.retire_completed() {
            trace!(id = %task.id, %tier, fired = task.fired, cascaded = task.cascaded, "Task completed.");
            self.timer_event_sender
                .send(TimerEvent::TaskCompleted { id: task.id, tier })
                .ok();
        }
    }

    /// Hands a remainder to the migration channel under the configured
    /// backpressure policy. Returns `false` if it was refused.
    #[doc(hidden)]
    async fn migrate(&self, envelope: MigrationEnvelope) -> bool {
        match self.config.backpressure.timeout() {
            None => self.migration_sender.try_send(envelope).is_ok(),
            Some(timeout) => self
                .migration_sender
                .send_timeout(envelope, timeout)
                .await
                .is_ok(),
        }
    }

    /// Runs a fired task's callback. A panicking callback is logged and
    /// reported; it never takes the wheel's loop down with it.
    #[doc(hidden)]
    fn dispatch(&self, id: TaskId, tier: Tier, callback: Callback) {
        match self.config.dispatch {
            CallbackDispatch::Inline => {
                if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                    self.report_panic(id, tier);
                }
            }
            CallbackDispatch::Pool => {
                let handle = tokio::task::spawn_blocking(move || callback());
                let engine = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle.await {
                        if err.is_panic() {
                            engine.report_panic(id, tier);
                        }
                    }
                });
            }
        }
    }

    #[doc(hidden)]
    fn report_panic(&self, id: TaskId, tier: Tier) {
        error!(%id, %tier, "Timer callback panicked.");
        self.timer_event_sender
            .send(TimerEvent::CallbackPanicked { id, tier })
            .ok();
    }

    /// Logs and broadcasts a refused registration, then hands the error back.
    #[doc(hidden)]
    fn reject(&self, tier_id: u8, interval: i64, err: TimerError) -> TimerError {
        error!(tier_id, interval, "Timer rejected: {err}");
        self.timer_event_sender
            .send(TimerEvent::TaskRejected {
                tier_id,
                interval,
                reason: err.as_label(),
            })
            .ok();
        err
    }
}

// Public API implementation block.
impl TierclockEngine {
    /// Spawns one clock loop per wheel plus the migration consumer.
    ///
    /// Returns once every worker is live. Must be called from within a tokio
    /// runtime; a second call returns [`TimerError::AlreadyStarted`].
    pub async fn start(&self) -> Result<(), TimerError> {
        let migration_rx = self
            .migration_receiver
            .lock()
            .await
            .take()
            .ok_or(TimerError::AlreadyStarted)?;
        self.started.store(true, Ordering::SeqCst);

        let ready = Arc::new(Barrier::new(Tier::ALL.len() + 2));
        for tier in Tier::ALL {
            let wheel = self.clone();
            let shutdown_rx = self.shutdown_sender.subscribe();
            let ready = ready.clone();
            tokio::spawn(async move { wheel.wheel_loop(tier, shutdown_rx, ready).await });
        }

        let consumer = self.clone();
        let shutdown_rx = self.shutdown_sender.subscribe();
        let consumer_ready = ready.clone();
        tokio::spawn(async move {
            consumer
                .migration_loop(migration_rx, shutdown_rx, consumer_ready)
                .await
        });

        ready.wait().await;
        info!(wheels = Tier::ALL.len(), "TierclockEngine started.");
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: Instant::now(),
            })
            .ok();
        Ok(())
    }

    /// Broadcasts the stop signal to every worker.
    ///
    /// Best effort: a tick already in progress finishes first, and queued
    /// timers are discarded with the engine.
    pub fn shutdown(&self) -> Result<(), TimerError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(TimerError::NotStarted);
        }
        self.stopped.store(true, Ordering::SeqCst);
        if self.shutdown_sender.send(()).is_err() {
            error!("Failed to send shutdown signal. Some wheels may already be stopped.");
        }
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("TierclockEngine has shut down.");
        Ok(())
    }

    /// Starts the engine if needed and runs until Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        match self.start().await {
            Ok(()) | Err(TimerError::AlreadyStarted) => {}
            Err(err) => return Err(err.into()),
        }
        info!("Engine running. Press Ctrl+C to shut down.");
        tokio::signal::ctrl_c().await?;

        info!("Shutdown signal received. Broadcasting to all wheels...");
        self.shutdown()?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    /// Registers a timer on `tier`.
    ///
    /// # Arguments
    /// * `tier` - The nominal tier, matching the interval's magnitude.
    /// * `interval` - Milliseconds per cycle; must lie within `tier.range()`.
    /// * `runs` - Cycles before the timer is removed. Values below 1 mean 1.
    /// * `callback` - Invoked once per cycle.
    ///
    /// # Errors
    /// [`TimerError::IntervalOutOfRange`] if the interval does not fit the tier,
    /// [`TimerError::Stopped`] once the engine has been shut down.
    /// The rejection is also logged and broadcast; a rejected timer never fires.
    pub async fn add_timer(
        &self,
        tier: Tier,
        interval: i64,
        runs: i64,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<TaskId, TimerError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(self.reject(tier.id(), interval, TimerError::Stopped));
        }
        let range = tier.range();
        if !range.accepts(interval) {
            let err = TimerError::IntervalOutOfRange {
                tier,
                interval,
                min: range.min,
                max: range.max,
            };
            return Err(self.reject(tier.id(), interval, err));
        }

        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        let task = Task::new(id, interval, runs, Arc::new(callback));
        self.wheel(tier).lock().await.push(task);
        debug!(%id, %tier, interval, runs, "Timer scheduled.");
        self.timer_event_sender
            .send(TimerEvent::TaskScheduled { id, tier, interval })
            .ok();
        Ok(id)
    }

    /// Registers a timer on the tier with numeric id `tier_id` (`1..=7`).
    ///
    /// # Errors
    /// [`TimerError::UnknownTier`] for an id outside the tier table, plus
    /// everything [`add_timer`](Self::add_timer) returns.
    pub async fn add_timer_by_id(
        &self,
        tier_id: u8,
        interval: i64,
        runs: i64,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<TaskId, TimerError> {
        match Tier::try_from(tier_id) {
            Ok(tier) => self.add_timer(tier, interval, runs, callback).await,
            Err(err) => Err(self.reject(tier_id, interval, err)),
        }
    }

    /// Number of tasks currently queued on `tier`.
    pub async fn pending(&self, tier: Tier) -> usize {
        self.wheel(tier).lock().await.len()
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &TierclockConfig {
        &self.config
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `TimerEvent` stream.
    pub fn subscribe_timer_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.timer_event_sender.subscribe()
    }
}
