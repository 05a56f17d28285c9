//! End-to-end timing scenarios, run against tokio's paused clock so that
//! second- and minute-scale wheels complete in virtual time.

mod common;

use common::*;
use std::time::Duration;
use tierclock::prelude::*;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn finest_tier_fires_a_thousand_times_in_five_seconds() {
    let engine = started(inline_config()).await;
    let (callback, mut fires_rx) = recorder();
    let t0 = Instant::now();

    engine.add_timer(Tier::SmallMs, 5, 1000, callback).await.unwrap();

    let fires = collect(&mut fires_rx, 1000, Duration::from_secs(10)).await;
    assert_eq!(fires.len(), 1000);
    let elapsed = millis_between(t0, *fires.last().unwrap());
    assert!((5000..=5005).contains(&elapsed), "took {elapsed}ms");
    for pair in fires.windows(2) {
        assert!(millis_between(pair[0], pair[1]) >= 5);
    }

    assert!(!fires_again(&mut fires_rx, Duration::from_millis(100)).await);
    assert_eq!(engine.pending(Tier::SmallMs).await, 0);
}

#[tokio::test(start_paused = true)]
async fn fifty_ms_timer_cascades_into_the_finest_tier() {
    let engine = started(inline_config()).await;
    let mut events = engine.subscribe_timer_events();
    let (callback, mut fires_rx) = recorder();
    let t0 = Instant::now();

    let id = engine.add_timer(Tier::BigMs, 101, 2, callback).await.unwrap();

    let fires = collect(&mut fires_rx, 2, Duration::from_secs(2)).await;
    assert_eq!(fires.len(), 2);
    assert!((millis_between(t0, fires[0]) - 101).abs() <= 5);
    assert!((millis_between(t0, fires[1]) - 202).abs() <= 5);
    assert!(!fires_again(&mut fires_rx, Duration::from_millis(500)).await);

    let events = drain(&mut events);
    let cascades = events
        .iter()
        .filter(|e| {
            matches!(e, TimerEvent::TaskCascaded { id: c, from: Tier::BigMs, to: Tier::SmallMs, remaining: 1 } if *c == id)
        })
        .count();
    assert_eq!(cascades, 2);
    assert!(events.iter().all(|e| !matches!(
        e,
        TimerEvent::TaskFired { tier, .. } if *tier != Tier::SmallMs
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        TimerEvent::TaskCompleted { id: c, tier: Tier::BigMs } if *c == id
    )));
    assert_eq!(engine.pending(Tier::BigMs).await, 0);
    assert_eq!(engine.pending(Tier::SmallMs).await, 0);
}

#[tokio::test(start_paused = true)]
async fn interval_below_finest_minimum_never_fires() {
    let engine = started(inline_config()).await;
    let mut events = engine.subscribe_timer_events();
    let (callback, mut fires_rx) = recorder();

    let result = engine.add_timer(Tier::SmallMs, 4, 1, callback).await;
    assert_eq!(
        result,
        Err(TimerError::IntervalOutOfRange {
            tier: Tier::SmallMs,
            interval: 4,
            min: 5,
            max: 100
        })
    );

    // The rejected callback was dropped with its sender.
    assert!(!fires_again(&mut fires_rx, Duration::from_secs(5)).await);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [TimerEvent::TaskRejected { tier_id: 1, interval: 4, reason: "interval_out_of_range" }]
    ));
    for tier in Tier::ALL {
        assert_eq!(engine.pending(tier).await, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn final_fire_lands_within_one_finest_tick() {
    // Several timers share wheels here, so let all of them progress at once.
    let engine = started(TierclockConfig {
        service_mode: ServiceMode::AllDue,
        ..inline_config()
    })
    .await;
    let cases = [
        (Tier::SmallMs, 37),
        (Tier::BigMs, 999),
        (Tier::Second, 2_101),
        (Tier::Second, 60_000),
        (Tier::Minute, 66_060),
        (Tier::Day, 3_600_007),
    ];

    let t0 = Instant::now();
    let mut receivers = Vec::new();
    for (tier, interval) in cases {
        let (callback, rx) = recorder();
        engine.add_timer(tier, interval, 1, callback).await.unwrap();
        receivers.push((tier, interval, rx));
    }

    for (tier, interval, mut rx) in receivers {
        let fires = collect(&mut rx, 1, Duration::from_secs(2 * 3600)).await;
        assert_eq!(fires.len(), 1, "{tier}/{interval}ms never fired");
        let error = millis_between(t0, fires[0]) - interval;
        assert!(
            error.abs() <= Tier::FINEST.scale(),
            "{tier}/{interval}ms fired {error}ms off"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn multiple_of_scale_fires_exactly_runs_times() {
    let engine = started(inline_config()).await;
    let mut events = engine.subscribe_timer_events();
    let (callback, mut fires_rx) = recorder();
    let t0 = Instant::now();

    engine.add_timer(Tier::Second, 2_000, 3, callback).await.unwrap();

    let fires = collect(&mut fires_rx, 3, Duration::from_secs(10)).await;
    let offsets: Vec<i64> = fires.iter().map(|at| millis_between(t0, *at)).collect();
    assert_eq!(offsets, vec![2_000, 4_000, 6_000]);
    assert!(!fires_again(&mut fires_rx, Duration::from_secs(5)).await);
    assert!(drain(&mut events)
        .iter()
        .all(|e| !matches!(e, TimerEvent::TaskCascaded { .. })));
}

#[tokio::test(start_paused = true)]
async fn single_shot_cascade_fires_once_on_destination() {
    let engine = started(inline_config()).await;
    let mut events = engine.subscribe_timer_events();
    let (callback, mut fires_rx) = recorder();

    // 50ms ticks leave 20ms after the second tick: one hop to the 5ms wheel.
    let id = engine.add_timer(Tier::BigMs, 120, 1, callback).await.unwrap();

    assert_eq!(collect(&mut fires_rx, 1, Duration::from_secs(1)).await.len(), 1);
    assert!(!fires_again(&mut fires_rx, Duration::from_secs(1)).await);
    assert_eq!(engine.pending(Tier::BigMs).await, 0);

    let events = drain(&mut events);
    let fired: Vec<Tier> = events
        .iter()
        .filter_map(|e| match e {
            TimerEvent::TaskFired { id: f, tier, .. } if *f == id => Some(*tier),
            _ => None,
        })
        .collect();
    assert_eq!(fired, vec![Tier::SmallMs]);
    assert!(events.iter().any(|e| matches!(
        e,
        TimerEvent::TaskCascaded { from: Tier::BigMs, to: Tier::SmallMs, remaining: 20, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn head_only_servicing_blocks_trailing_tasks() {
    let engine = started(inline_config()).await;
    let (first, mut first_rx) = recorder();
    let (second, mut second_rx) = recorder();
    let t0 = Instant::now();

    engine.add_timer(Tier::SmallMs, 20, 1, first).await.unwrap();
    engine.add_timer(Tier::SmallMs, 5, 1, second).await.unwrap();

    let first_at = collect(&mut first_rx, 1, Duration::from_secs(1)).await[0];
    let second_at = collect(&mut second_rx, 1, Duration::from_secs(1)).await[0];
    assert_eq!(millis_between(t0, first_at), 20);
    assert_eq!(millis_between(t0, second_at), 25);
}

#[tokio::test(start_paused = true)]
async fn all_due_servicing_lets_every_task_progress() {
    let engine = started(TierclockConfig {
        service_mode: ServiceMode::AllDue,
        ..inline_config()
    })
    .await;
    let (first, mut first_rx) = recorder();
    let (second, mut second_rx) = recorder();
    let t0 = Instant::now();

    engine.add_timer(Tier::SmallMs, 20, 1, first).await.unwrap();
    engine.add_timer(Tier::SmallMs, 5, 1, second).await.unwrap();

    let second_at = collect(&mut second_rx, 1, Duration::from_secs(1)).await[0];
    let first_at = collect(&mut first_rx, 1, Duration::from_secs(1)).await[0];
    assert_eq!(millis_between(t0, second_at), 5);
    assert_eq!(millis_between(t0, first_at), 20);
}
