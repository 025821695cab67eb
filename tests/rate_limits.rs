mod common;

use chrono::{Duration, Utc};
use common::at;
use health_router::rate::{
    window_end, window_start, KindQuota, QuotaDecision, QuotaPolicy, RateLimiter, WindowLimits,
};
use async_trait::async_trait;
use health_router::errors::StoreError;
use health_router::store::{KeyValueStore, MemoryStore, OrderedWriter};
use health_router::types::{RequestKind, WindowKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn tight_budget_policy() -> QuotaPolicy {
    let mut policy = QuotaPolicy::default();
    policy.monthly_budget = 1.0;
    policy.critical_reserve = 0.9;
    for quota in policy.kinds.values_mut() {
        quota.cost = 0.25;
    }
    policy
}

#[tokio::test]
async fn hourly_limit_blocks_the_next_quick_dispatch() {
    let limiter = RateLimiter::new(QuotaPolicy::default());
    let now = at(2026, 3, 10, 10, 15);
    for _ in 0..20 {
        assert_eq!(
            limiter.check_and_record_at(RequestKind::Quick, now).await,
            QuotaDecision::Allowed
        );
    }
    assert_eq!(
        limiter.check_and_record_at(RequestKind::Quick, now).await,
        QuotaDecision::RateLimited {
            reset_at: at(2026, 3, 10, 11, 0),
            window: WindowKind::Hour,
        }
    );
    assert_eq!(limiter.count_at(RequestKind::Quick, WindowKind::Hour, now), 20);
    assert_eq!(limiter.remaining_at(RequestKind::Quick, now), 0);

    // Other kinds keep their own counters.
    assert!(limiter
        .check_and_record_at(RequestKind::Daily, now)
        .await
        .is_allowed());
}

#[tokio::test]
async fn counters_reset_lazily_at_the_window_boundary() {
    let limiter = RateLimiter::new(QuotaPolicy::default());
    let now = at(2026, 3, 10, 10, 59);
    for _ in 0..20 {
        limiter.check_and_record_at(RequestKind::Quick, now).await;
    }
    assert!(!limiter.peek_at(RequestKind::Quick, now).is_allowed());

    let next_hour = at(2026, 3, 10, 11, 0);
    assert_eq!(limiter.count_at(RequestKind::Quick, WindowKind::Hour, next_hour), 0);
    assert_eq!(limiter.count_at(RequestKind::Quick, WindowKind::Day, next_hour), 20);
    assert!(limiter
        .check_and_record_at(RequestKind::Quick, next_hour)
        .await
        .is_allowed());
}

#[tokio::test]
async fn daily_limit_applies_after_hourly() {
    let limiter = RateLimiter::new(QuotaPolicy::default());
    let start = at(2026, 3, 10, 0, 30);
    // Weekly analysis: 2 per hour, 3 per day.
    for hour in 0..2 {
        let now = start + Duration::hours(hour);
        assert!(limiter
            .check_and_record_at(RequestKind::Weekly, now)
            .await
            .is_allowed());
    }
    let now = start + Duration::hours(2);
    assert!(limiter
        .check_and_record_at(RequestKind::Weekly, now)
        .await
        .is_allowed());
    let later = start + Duration::hours(3);
    assert_eq!(
        limiter.check_and_record_at(RequestKind::Weekly, later).await,
        QuotaDecision::RateLimited {
            reset_at: at(2026, 3, 11, 0, 0),
            window: WindowKind::Day,
        }
    );
}

#[tokio::test]
async fn budget_reserve_leaves_room_for_critical_only() {
    let limiter = RateLimiter::new(tight_budget_policy());
    let now = at(2026, 3, 10, 9, 0);
    for _ in 0..3 {
        assert!(limiter
            .check_and_record_at(RequestKind::Daily, now)
            .await
            .is_allowed());
    }
    assert_eq!(
        limiter.check_and_record_at(RequestKind::Daily, now).await,
        QuotaDecision::CriticalOnly
    );
    assert!(limiter
        .check_and_record_at(RequestKind::Critical, now)
        .await
        .is_allowed());
    assert_eq!(limiter.remaining_budget_at(now), 0.0);
    assert_eq!(
        limiter.check_and_record_at(RequestKind::Critical, now).await,
        QuotaDecision::BudgetExceeded {
            reset_at: at(2026, 4, 1, 0, 0),
        }
    );

    // A new billing month clears the spend.
    let next_month = at(2026, 4, 1, 0, 5);
    assert_eq!(limiter.budget_fraction_at(next_month), 1.0);
    assert!(limiter
        .check_and_record_at(RequestKind::Daily, next_month)
        .await
        .is_allowed());
}

#[tokio::test]
async fn denied_dispatches_do_not_count() {
    let limiter = RateLimiter::new(tight_budget_policy());
    let now = at(2026, 3, 10, 9, 0);
    for _ in 0..4 {
        limiter.check_and_record_at(RequestKind::Daily, now).await;
    }
    assert_eq!(limiter.count_at(RequestKind::Daily, WindowKind::Hour, now), 3);
    assert_eq!(limiter.spend_at(now), 0.75);
}

#[tokio::test]
async fn concurrent_dispatches_never_exceed_the_limit() {
    let mut policy = QuotaPolicy::default();
    policy.kinds.insert(
        RequestKind::Comprehensive,
        KindQuota {
            limits: WindowLimits::new(5, 50, 50, 50),
            cost: 0.1,
        },
    );
    let limiter = Arc::new(RateLimiter::new(policy));
    let now = at(2026, 3, 10, 9, 0);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter
                .check_and_record_at(RequestKind::Comprehensive, now)
                .await
                .is_allowed()
        }));
    }
    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 5);
    assert_eq!(
        limiter.count_at(RequestKind::Comprehensive, WindowKind::Hour, now),
        5
    );
}

#[tokio::test]
async fn state_survives_a_restart_through_the_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let now = Utc::now();

    let first = RateLimiter::with_store(QuotaPolicy::default(), store.clone()).await;
    for _ in 0..3 {
        first.check_and_record_at(RequestKind::Daily, now).await;
    }
    assert!(store.get("rate_limiter.state").await.unwrap().is_some());

    let second = RateLimiter::with_store(QuotaPolicy::default(), store).await;
    assert_eq!(second.count_at(RequestKind::Daily, WindowKind::Day, now), 3);
    assert!((second.spend_at(now) - 0.09).abs() < 1e-9);
}

/// Holds the first write back so a later snapshot is ready before it lands.
struct SlowFirstWrite {
    inner: MemoryStore,
    writes: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for SlowFirstWrite {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        self.inner.set(key, value).await
    }
}

#[tokio::test]
async fn a_slow_earlier_write_never_replaces_newer_state() {
    let store = Arc::new(SlowFirstWrite {
        inner: MemoryStore::new(),
        writes: AtomicUsize::new(0),
    });
    let now = Utc::now();
    let limiter = RateLimiter::with_store(QuotaPolicy::default(), store.clone()).await;

    let (a, b) = tokio::join!(
        limiter.check_and_record_at(RequestKind::Daily, now),
        limiter.check_and_record_at(RequestKind::Daily, now),
    );
    assert!(a.is_allowed() && b.is_allowed());

    let restarted = RateLimiter::with_store(QuotaPolicy::default(), store).await;
    assert_eq!(restarted.count_at(RequestKind::Daily, WindowKind::Day, now), 2);
}

#[tokio::test]
async fn ordered_writer_drops_stale_tickets() {
    let store = MemoryStore::new();
    let writer = OrderedWriter::new();
    let older = writer.ticket();
    let newer = writer.ticket();

    assert!(writer.write(&store, "k", newer, b"new".to_vec()).await.unwrap());
    assert!(!writer.write(&store, "k", older, b"old".to_vec()).await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));
}

#[tokio::test]
async fn unreadable_state_starts_fresh() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store
        .set("rate_limiter.state", b"not json".to_vec())
        .await
        .unwrap();
    let limiter = RateLimiter::with_store(QuotaPolicy::default(), store).await;
    assert_eq!(limiter.spend_at(Utc::now()), 0.0);
}

#[test]
fn windows_align_to_the_wall_clock() {
    // 2026-03-12 is a Thursday.
    let now = at(2026, 3, 12, 14, 37);
    assert_eq!(window_start(WindowKind::Hour, now), at(2026, 3, 12, 14, 0));
    assert_eq!(window_start(WindowKind::Day, now), at(2026, 3, 12, 0, 0));
    assert_eq!(window_start(WindowKind::Week, now), at(2026, 3, 9, 0, 0));
    assert_eq!(window_start(WindowKind::Month, now), at(2026, 3, 1, 0, 0));
    assert_eq!(window_end(WindowKind::Week, now), at(2026, 3, 16, 0, 0));

    let december = at(2026, 12, 20, 8, 0);
    assert_eq!(window_end(WindowKind::Month, december), at(2027, 1, 1, 0, 0));
}
