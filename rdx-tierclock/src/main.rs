use anyhow::Result;
use colored::Colorize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tierclock::prelude::*;
use tierclock::{ENGINE_NAME, VERSION};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "tierclock.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 2. Load the engine configuration (file is optional, env overrides apply).
    let config = TierclockConfig::load(CONFIG_PATH)?;
    info!("{} v{} with {:?}", ENGINE_NAME, VERSION, config);

    // 3. Create the engine and attach listeners before anything ticks.
    let engine = TierclockEngine::new(config);
    spawn_event_listeners(&engine);

    // 4. Start the wheels and register demo timers.
    engine.start().await?;
    register_demo_timers(&engine).await;

    // 5. Run until Ctrl+C.
    engine.run().await?;

    Ok(())
}

/// Spawns tasks that print the engine's event streams.
fn spawn_event_listeners(engine: &TierclockEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            println!("{} {:?}", "[SYSTEM]".cyan(), event);
        }
    });

    let mut timer_rx = engine.subscribe_timer_events();
    tokio::spawn(async move {
        loop {
            match timer_rx.recv().await {
                Ok(event @ TimerEvent::TaskFired { .. }) => {
                    println!("{} {:?}", "[FIRE]".green().bold(), event)
                }
                Ok(event @ TimerEvent::TaskCascaded { .. }) => {
                    println!("{} {:?}", "[CASCADE]".yellow(), event)
                }
                Ok(event @ TimerEvent::CallbackPanicked { .. }) => {
                    println!("{} {:?}", "[PANIC]".red().bold(), event)
                }
                Ok(event @ TimerEvent::TaskRejected { .. }) => {
                    println!("{} {:?}", "[REJECT]".red(), event)
                }
                Ok(event) => println!("{} {:?}", "[TIMER]".dimmed(), event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Timer event listener lagged.");
                }
                Err(_) => break,
            }
        }
    });
}

/// Registers one timer per interesting path through the wheels.
async fn register_demo_timers(engine: &TierclockEngine) {
    let shared_counter = Arc::new(AtomicU32::new(0));

    // --- A fast timer that never cascades ---
    let counter = shared_counter.clone();
    let fast = engine
        .add_timer(Tier::SmallMs, 50, 10, move || {
            let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
            info!("[50ms TIMER] Counter is now: {}", current);
        })
        .await;

    // --- A timer that cascades from the 50ms wheel into the 5ms wheel ---
    let cascading = engine
        .add_timer(Tier::BigMs, 101, 2, || info!("[101ms TIMER] fired"))
        .await;

    // --- A timer that cascades twice: 1s -> 50ms -> 5ms ---
    let seconds = engine
        .add_timer(Tier::Second, 2_101, 2, || info!("[2.101s TIMER] fired"))
        .await;

    // --- Rejected: below the finest tier's minimum, never fires ---
    let rejected = engine
        .add_timer(Tier::SmallMs, 4, 1, || info!("[UNREACHABLE] this never prints"))
        .await;

    for (label, result) in [
        ("fast", fast),
        ("cascading", cascading),
        ("seconds", seconds),
        ("rejected", rejected),
    ] {
        match result {
            Ok(id) => info!("Registered {} timer as {}", label, id),
            Err(err) => warn!("Timer '{}' not scheduled: {}", label, err),
        }
    }
}
