//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;
use tierclock::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{timeout, Instant};

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once). Use `RUST_LOG=tierclock=trace` to see ticks.
pub fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Inline dispatch keeps fire times exact under the paused test clock.
pub fn inline_config() -> TierclockConfig {
    TierclockConfig {
        dispatch: CallbackDispatch::Inline,
        ..Default::default()
    }
}

pub async fn started(config: TierclockConfig) -> TierclockEngine {
    init_test_tracing();
    let engine = TierclockEngine::new(config);
    engine.start().await.expect("engine starts");
    engine
}

/// A callback that reports the instant of every invocation.
pub fn recorder() -> (
    impl Fn() + Send + Sync + 'static,
    mpsc::UnboundedReceiver<Instant>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move || {
            tx.send(Instant::now()).ok();
        },
        rx,
    )
}

/// Waits for `count` invocations, giving up after `within` of (virtual) time.
pub async fn collect(
    rx: &mut mpsc::UnboundedReceiver<Instant>,
    count: usize,
    within: Duration,
) -> Vec<Instant> {
    let deadline = Instant::now() + within;
    let mut fires = Vec::with_capacity(count);
    while fires.len() < count {
        let left = deadline.saturating_duration_since(Instant::now());
        match timeout(left, rx.recv()).await {
            Ok(Some(at)) => fires.push(at),
            _ => break,
        }
    }
    fires
}

/// True if the callback fires again within `window`.
pub async fn fires_again(rx: &mut mpsc::UnboundedReceiver<Instant>, window: Duration) -> bool {
    matches!(timeout(window, rx.recv()).await, Ok(Some(_)))
}

/// Drains every event currently buffered.
pub fn drain(rx: &mut broadcast::Receiver<TimerEvent>) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn millis_between(from: Instant, to: Instant) -> i64 {
    to.duration_since(from).as_millis() as i64
}
