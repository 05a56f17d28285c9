//! Defines all configuration structures for the tierclock engine.
//!
//! The tier table itself is fixed (see [`crate::tier`]); what can be tuned is
//! how the engine moves tasks between wheels and how it runs callbacks. These
//! structs deserialize from a TOML file and `TIERCLOCK__*` environment
//! variables through the `config` crate.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `TIERCLOCK__SERVICE_MODE=all_due`.
pub const ENV_PREFIX: &str = "TIERCLOCK";

/// The top-level configuration for the `TierclockEngine`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierclockConfig {
    /// Capacity of the cross-tier migration channel.
    pub migration_capacity: usize,

    /// What a wheel does when the migration channel is full.
    pub backpressure: BackpressurePolicy,

    /// Which queued tasks a wheel advances on every tick.
    pub service_mode: ServiceMode,

    /// Where callbacks run when a task fires.
    pub dispatch: CallbackDispatch,

    /// Capacity of the broadcast channels for timer and system events.
    pub event_capacity: usize,
}

/// Producer policy for a full migration channel.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Give up on the cascade immediately.
    Drop,
    /// Wait up to `timeout_ms` for room, then give up.
    Block { timeout_ms: u64 },
}

/// How many tasks a wheel services per tick.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Only the head of the queue progresses; tasks behind it wait until it is removed.
    #[default]
    HeadOnly,
    /// Every queued task accumulates and may fire or cascade on each tick.
    AllDue,
}

/// Execution context for task callbacks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallbackDispatch {
    /// Run on the blocking pool so a slow callback cannot stall its wheel.
    #[default]
    Pool,
    /// Run synchronously on the wheel's clock loop.
    Inline,
}

impl BackpressurePolicy {
    /// The wait budget, or `None` when the policy never waits.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            BackpressurePolicy::Drop => None,
            BackpressurePolicy::Block { timeout_ms } => Some(Duration::from_millis(*timeout_ms)),
        }
    }
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        BackpressurePolicy::Block { timeout_ms: 100 }
    }
}

impl Default for TierclockConfig {
    fn default() -> Self {
        Self {
            migration_capacity: default_migration_capacity(),
            backpressure: BackpressurePolicy::default(),
            service_mode: ServiceMode::default(),
            dispatch: CallbackDispatch::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl TierclockConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// `TIERCLOCK__*` environment overrides on top.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize::<Self>()?.sanitized())
    }

    /// Parses configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize::<Self>()?.sanitized())
    }

    /// Channels cannot have zero capacity.
    fn sanitized(mut self) -> Self {
        self.migration_capacity = self.migration_capacity.max(1);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}

// --- Default value functions for serde ---

fn default_migration_capacity() -> usize {
    1000
}

fn default_event_capacity() -> usize {
    256
}
