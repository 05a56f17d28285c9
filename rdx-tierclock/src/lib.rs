//! # Tierclock
//!
//! A hierarchical, multi-resolution timer scheduler for Rust.
//!
//! One clock ticking every few milliseconds is wasteful for a timer due in a
//! week, and one coarse clock cannot hit a millisecond deadline. Tierclock runs
//! several wheels at once, each at its own resolution, and moves a timer to a
//! finer wheel as its deadline approaches. Precision improves exactly when it
//! matters while the cost stays proportional to tick resolution, not to the
//! number of timers.
//!
//! ## Core Concepts
//!
//! - **Tier**: a fixed resolution class (5ms, 50ms, 1s, 60s, 30min, 12h, 15d)
//!   with the interval range it accepts at registration.
//! - **Wheel**: one tier's task queue plus a clock loop ticking at the tier's period.
//! - **Cascade**: when a timer's remaining time drops inside one tick of its
//!   wheel, the remainder is handed to the finest tier that covers it, so the
//!   final fire happens at that tier's precision.
//! - **Event-Driven**: every schedule, fire, cascade and completion is
//!   broadcast as a strongly-typed `TimerEvent`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tierclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create the engine and start its wheels.
//!     let engine = TierclockEngine::new(TierclockConfig::default());
//!     engine.start().await?;
//!
//!     // 2. Fire twice, 101ms apart. The 50ms wheel cascades the last
//!     //    millisecond of each cycle down to the 5ms wheel.
//!     engine
//!         .add_timer(Tier::BigMs, 101, 2, || println!("101ms have passed!"))
//!         .await?;
//!
//!     // 3. Run until Ctrl+C.
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Tier Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod tier;

/// A prelude module for easy importing of the most common Tierclock types.
pub mod prelude {
    pub use crate::common::TaskId;
    pub use crate::config::{BackpressurePolicy, CallbackDispatch, ServiceMode, TierclockConfig};
    pub use crate::engine::TierclockEngine;
    pub use crate::error::TimerError;
    pub use crate::events::{SystemEvent, TimerEvent};
    pub use crate::tier::{Tier, TierRange};
}
