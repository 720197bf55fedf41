#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use sheetgate_core::OperationKind;
use sheetgate_regulator::{config, OperationCatalog, RateLimiterPool};
use tokio::time::Instant;

// Paused-clock timers fire on millisecond ticks.
const TICK: Duration = Duration::from_millis(1);

fn pool_from(yaml: &str) -> Arc<RateLimiterPool> {
    let cfg = config::load_from_str(yaml).expect("config");
    Arc::new(RateLimiterPool::new(
        Arc::new(OperationCatalog::from_config(&cfg)),
        cfg.limiter.min_rate_per_sec,
    ))
}

#[tokio::test(start_paused = true)]
async fn admissions_are_spaced_by_window_over_permits() {
    let pool = pool_from(
        "version: 1\noperations:\n  get_sheet: { window_ms: 1000, permits: 5 }\n",
    );

    let tasks = (0..12).map(|_| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.acquire("acme", OperationKind::GetSheet).await;
            Instant::now()
        })
    });
    let mut times: Vec<Instant> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    times.sort();

    let spacing = Duration::from_millis(200);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] + TICK >= spacing, "{:?}", pair[1] - pair[0]);
    }
    // No more than `permits` admissions in any rolling window.
    for i in 0..times.len() - 5 {
        assert!(times[i + 5] - times[i] + TICK >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn distinct_keys_do_not_block_each_other() {
    let pool = pool_from("version: 1\noperations:\n  get_sheet: { window_ms: 1000, permits: 1 }\n");

    // Queue ten seconds' worth of admissions on one key.
    let busy = pool.limiter("acme", OperationKind::GetSheet);
    for _ in 0..10 {
        let _ = busy.reserve();
    }

    assert_eq!(pool.acquire("globex", OperationKind::GetSheet).await, Duration::ZERO);
    assert_eq!(pool.acquire("acme", OperationKind::ListSheets).await, Duration::ZERO);

    let waited = pool.acquire("acme", OperationKind::GetSheet).await;
    assert!(waited + TICK >= Duration::from_secs(10), "{waited:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_use_creates_exactly_one_limiter() {
    let pool = Arc::new(RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 0.1));
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let tasks = (0..16).map(|_| {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            pool.limiter("acme", OperationKind::AddRows)
        })
    });
    let limiters: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(pool.len(), 1);
    for l in &limiters {
        assert!(Arc::ptr_eq(l, &limiters[0]));
    }
}

#[tokio::test]
async fn damping_only_goes_down_and_respects_floor() {
    let pool = RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 0.1);
    let kind = OperationKind::AddRows; // 300 / 60s

    assert_eq!(pool.adjust_rate("acme", kind, 1000.0), 5.0);
    assert_eq!(pool.adjust_rate("acme", kind, 0.5), 0.5);
    assert_eq!(pool.adjust_rate("acme", kind, 2.0), 0.5);
    assert_eq!(pool.adjust_rate("acme", kind, 0.001), 0.1);
    assert_eq!(pool.adjust_rate("acme", kind, f64::NAN), 0.1);
    assert_eq!(pool.current_rate("acme", kind), Some(0.1));

    // Damping is per key.
    assert_eq!(pool.current_rate("globex", kind), None);
    assert_eq!(pool.adjust_rate("acme", OperationKind::UpdateRows, 100.0), 5.0);
    assert_eq!(pool.limiter("acme", kind).ceiling(), 5.0);
}

#[tokio::test(start_paused = true)]
async fn damped_rate_widens_spacing() {
    let pool = RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 0.1);
    let pacer = pool.limiter("acme", OperationKind::AddRows);

    let a = pacer.reserve();
    pacer.damp(0.5);
    let b = pacer.reserve();
    let c = pacer.reserve();

    assert!(b - a + TICK >= Duration::from_millis(200));
    assert!(b - a <= Duration::from_millis(200) + TICK);
    assert!(c - b + TICK >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn abandoned_waits_do_not_hold_slots() {
    let pool = RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 0.1);
    let kind = OperationKind::SearchSheet; // 30 / 60s, 2s spacing

    assert_eq!(pool.acquire("acme", kind).await, Duration::ZERO);
    for _ in 0..20 {
        let gave_up =
            tokio::time::timeout(Duration::from_millis(10), pool.acquire("acme", kind)).await;
        assert!(gave_up.is_err());
    }

    let waited = pool.acquire("acme", kind).await;
    assert!(waited <= Duration::from_secs(2), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn abandoned_head_hands_over_to_next_waiter() {
    let pool = Arc::new(RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 0.1));
    let kind = OperationKind::SearchSheet;
    let start = Instant::now();
    pool.acquire("acme", kind).await;

    let head = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.acquire("acme", kind).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let next = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.acquire("acme", kind).await;
            Instant::now()
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    head.abort();

    let admitted_at = next.await.unwrap();
    assert!(admitted_at - start + TICK >= Duration::from_secs(2));
    assert!(admitted_at - start <= Duration::from_secs(2) + TICK);
}

#[tokio::test(start_paused = true)]
async fn floor_never_lifts_a_key_above_its_rule() {
    let pool = RateLimiterPool::new(Arc::new(OperationCatalog::builtin()), 5.0);
    let pacer = pool.limiter("acme", OperationKind::SearchSheet);

    assert_eq!(pacer.rate(), 0.5);
    assert_eq!(pacer.ceiling(), 0.5);
    assert_eq!(pacer.damp(0.01), 0.5);
}
