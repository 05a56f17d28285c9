//! Contains the building blocks the engine drives.
//!
//! A [`task::Task`] is a registered timer, the [`router`] decides whether a
//! tick fires it, leaves it waiting or cascades its remainder, and a
//! [`wheel::Wheel`] holds one tier's queue and applies those decisions.

pub mod router;
pub mod task;
pub mod wheel;
