use crate::store::{KeyValueStore, OrderedWriter};
use crate::types::{RequestKind, WindowKind};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const STATE_KEY: &str = "rate_limiter.state";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowLimits {
    pub hourly: u32,
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

impl WindowLimits {
    pub const fn new(hourly: u32, daily: u32, weekly: u32, monthly: u32) -> Self {
        Self {
            hourly,
            daily,
            weekly,
            monthly,
        }
    }

    pub fn limit(&self, window: WindowKind) -> u32 {
        match window {
            WindowKind::Hour => self.hourly,
            WindowKind::Day => self.daily,
            WindowKind::Week => self.weekly,
            WindowKind::Month => self.monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KindQuota {
    pub limits: WindowLimits,
    /// Cost charged against the budget per dispatch.
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaPolicy {
    pub kinds: BTreeMap<RequestKind, KindQuota>,
    pub monthly_budget: f64,
    /// Fraction of the budget after which only `critical` requests may use AI.
    #[serde(default = "default_critical_reserve")]
    pub critical_reserve: f64,
}

fn default_critical_reserve() -> f64 {
    0.9
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        let kinds = [
            (RequestKind::Quick, WindowLimits::new(20, 100, 500, 1500), 0.01),
            (RequestKind::Daily, WindowLimits::new(5, 10, 50, 200), 0.03),
            (RequestKind::Comprehensive, WindowLimits::new(3, 10, 30, 100), 0.10),
            (RequestKind::Weekly, WindowLimits::new(2, 3, 7, 20), 0.08),
            (RequestKind::Critical, WindowLimits::new(50, 200, 1000, 3000), 0.05),
            (RequestKind::UserRequested, WindowLimits::new(10, 50, 200, 600), 0.05),
        ]
        .into_iter()
        .map(|(kind, limits, cost)| (kind, KindQuota { limits, cost }))
        .collect();
        Self {
            kinds,
            monthly_budget: 10.0,
            critical_reserve: default_critical_reserve(),
        }
    }
}

impl QuotaPolicy {
    pub fn quota(&self, kind: RequestKind) -> KindQuota {
        self.kinds.get(&kind).copied().unwrap_or(KindQuota {
            limits: WindowLimits::new(0, 0, 0, 0),
            cost: 0.0,
        })
    }

    pub fn cost(&self, kind: RequestKind) -> f64 {
        self.quota(kind).cost
    }
}

/// Outcome of a proposed AI dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaDecision {
    Allowed,
    RateLimited {
        reset_at: DateTime<Utc>,
        window: WindowKind,
    },
    BudgetExceeded {
        reset_at: DateTime<Utc>,
    },
    CriticalOnly,
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed)
    }
}

const WINDOWS: [WindowKind; 4] = [
    WindowKind::Hour,
    WindowKind::Day,
    WindowKind::Week,
    WindowKind::Month,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct WindowCounter {
    start: DateTime<Utc>,
    count: u32,
}

impl WindowCounter {
    /// Lazily zero the counter once `now` has crossed into a later window.
    fn roll(&mut self, window: WindowKind, now: DateTime<Utc>) {
        let current = window_start(window, now);
        if current > self.start {
            self.start = current;
            self.count = 0;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct KindCounters {
    windows: BTreeMap<WindowKind, WindowCounter>,
}

impl KindCounters {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            windows: WINDOWS
                .iter()
                .map(|w| {
                    (
                        *w,
                        WindowCounter {
                            start: window_start(*w, now),
                            count: 0,
                        },
                    )
                })
                .collect(),
        }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        for window in WINDOWS {
            self.windows
                .entry(window)
                .or_insert(WindowCounter {
                    start: window_start(window, now),
                    count: 0,
                })
                .roll(window, now);
        }
    }

    fn count(&self, window: WindowKind) -> u32 {
        self.windows.get(&window).map(|c| c.count).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimiterState {
    counters: HashMap<RequestKind, KindCounters>,
    spend: f64,
    period_start: DateTime<Utc>,
}

impl LimiterState {
    /// The billing period is adopted on the first roll.
    fn new() -> Self {
        Self {
            counters: HashMap::new(),
            spend: 0.0,
            period_start: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        let period = window_start(WindowKind::Month, now);
        if period > self.period_start {
            self.period_start = period;
            self.spend = 0.0;
        }
        for counters in self.counters.values_mut() {
            counters.roll(now);
        }
    }

    fn counters(&mut self, kind: RequestKind, now: DateTime<Utc>) -> &mut KindCounters {
        self.counters
            .entry(kind)
            .or_insert_with(|| KindCounters::new(now))
    }
}

/// Per-kind windowed quotas plus a monthly budget, behind one lock so that
/// check-and-record is atomic across concurrent requests.
pub struct RateLimiter {
    policy: QuotaPolicy,
    state: Mutex<LimiterState>,
    store: Option<Arc<dyn KeyValueStore>>,
    writer: OrderedWriter,
}

impl RateLimiter {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LimiterState::new()),
            store: None,
            writer: OrderedWriter::new(),
        }
    }

    /// Limiter whose counters survive restarts through `store`. Unreadable
    /// state is logged and replaced with fresh counters.
    pub async fn with_store(policy: QuotaPolicy, store: Arc<dyn KeyValueStore>) -> Self {
        let state = match store.get(STATE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<LimiterState>(&bytes) {
                Ok(state) => {
                    tracing::info!(spend = state.spend, "restored rate limiter state");
                    state
                }
                Err(err) => {
                    tracing::warn!("discarding unreadable rate limiter state: {err}");
                    LimiterState::new()
                }
            },
            Ok(None) => LimiterState::new(),
            Err(err) => {
                tracing::warn!("rate limiter state unavailable: {err}");
                LimiterState::new()
            }
        };
        Self {
            policy,
            state: Mutex::new(state),
            store: Some(store),
            writer: OrderedWriter::new(),
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub async fn check_and_record(&self, kind: RequestKind) -> QuotaDecision {
        self.check_and_record_at(kind, Utc::now()).await
    }

    /// Check every window bottom-up, then the budget, then the critical
    /// reserve. Counters and spend are only incremented when allowed.
    pub async fn check_and_record_at(&self, kind: RequestKind, now: DateTime<Utc>) -> QuotaDecision {
        let (decision, snapshot) = {
            let mut state = self.state.lock();
            state.roll(now);
            let decision = evaluate(&self.policy, &mut state, kind, now);
            if decision.is_allowed() {
                let cost = self.policy.cost(kind);
                let counters = state.counters(kind, now);
                for counter in counters.windows.values_mut() {
                    counter.count = counter.count.saturating_add(1);
                }
                state.spend += cost;
            }
            let snapshot = if decision.is_allowed() && self.store.is_some() {
                serde_json::to_vec(&*state)
                    .ok()
                    .map(|bytes| (self.writer.ticket(), bytes))
            } else {
                None
            };
            (decision, snapshot)
        };

        match &decision {
            QuotaDecision::Allowed => tracing::debug!(kind = kind.as_str(), "ai dispatch recorded"),
            other => tracing::info!(kind = kind.as_str(), decision = ?other, "ai dispatch denied"),
        }

        if let (Some(store), Some((ticket, bytes))) = (self.store.as_ref(), snapshot) {
            match self.writer.write(store.as_ref(), STATE_KEY, ticket, bytes).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(ticket, "newer rate limiter state already stored"),
                Err(err) => tracing::warn!("failed to persist rate limiter state: {err}"),
            }
        }
        decision
    }

    /// Same evaluation as [`check_and_record_at`](Self::check_and_record_at)
    /// without touching the counters.
    pub fn peek_at(&self, kind: RequestKind, now: DateTime<Utc>) -> QuotaDecision {
        let mut state = self.state.lock().clone();
        state.roll(now);
        evaluate(&self.policy, &mut state, kind, now)
    }

    pub fn peek(&self, kind: RequestKind) -> QuotaDecision {
        self.peek_at(kind, Utc::now())
    }

    /// Remaining budget share in `[0, 1]`.
    pub fn budget_fraction_at(&self, now: DateTime<Utc>) -> f64 {
        if self.policy.monthly_budget <= 0.0 {
            return 0.0;
        }
        let spend = self.spend_at(now);
        ((self.policy.monthly_budget - spend) / self.policy.monthly_budget).clamp(0.0, 1.0)
    }

    pub fn spend_at(&self, now: DateTime<Utc>) -> f64 {
        let mut state = self.state.lock();
        state.roll(now);
        state.spend
    }

    pub fn count_at(&self, kind: RequestKind, window: WindowKind, now: DateTime<Utc>) -> u32 {
        let mut state = self.state.lock();
        state.roll(now);
        state.counters.get(&kind).map(|c| c.count(window)).unwrap_or(0)
    }

    /// Dispatches left for `kind` before its tightest window fills.
    pub fn remaining_at(&self, kind: RequestKind, now: DateTime<Utc>) -> u32 {
        let limits = self.policy.quota(kind).limits;
        let mut state = self.state.lock();
        state.roll(now);
        let counters = state.counters.get(&kind);
        WINDOWS
            .iter()
            .map(|window| {
                let used = counters.map(|c| c.count(*window)).unwrap_or(0);
                limits.limit(*window).saturating_sub(used)
            })
            .min()
            .unwrap_or(0)
    }

    pub fn remaining_budget_at(&self, now: DateTime<Utc>) -> f64 {
        (self.policy.monthly_budget - self.spend_at(now)).max(0.0)
    }

    /// Next wall-clock boundary at which any counter resets.
    pub fn next_reset_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        window_end(WindowKind::Hour, now)
    }
}

fn evaluate(
    policy: &QuotaPolicy,
    state: &mut LimiterState,
    kind: RequestKind,
    now: DateTime<Utc>,
) -> QuotaDecision {
    let quota = policy.quota(kind);
    let counters = state.counters(kind, now);
    for window in WINDOWS {
        if counters.count(window) >= quota.limits.limit(window) {
            return QuotaDecision::RateLimited {
                reset_at: window_end(window, now),
                window,
            };
        }
    }

    let projected = state.spend + quota.cost;
    if projected > policy.monthly_budget {
        return QuotaDecision::BudgetExceeded {
            reset_at: window_end(WindowKind::Month, now),
        };
    }
    if kind != RequestKind::Critical && projected > policy.monthly_budget * policy.critical_reserve
    {
        return QuotaDecision::CriticalOnly;
    }
    QuotaDecision::Allowed
}

fn midnight(date: NaiveDate, fallback: DateTime<Utc>) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(fallback)
}

/// Wall-clock aligned (UTC) start of the window containing `now`. Weeks start
/// on Monday.
pub fn window_start(window: WindowKind, now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    match window {
        WindowKind::Hour => date
            .and_hms_opt(now.hour(), 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now),
        WindowKind::Day => midnight(date, now),
        WindowKind::Week => {
            let offset = now.weekday().num_days_from_monday() as i64;
            midnight(date - Duration::days(offset), now)
        }
        WindowKind::Month => midnight(date.with_day(1).unwrap_or(date), now),
    }
}

pub fn window_end(window: WindowKind, now: DateTime<Utc>) -> DateTime<Utc> {
    let start = window_start(window, now);
    match window {
        WindowKind::Hour => start + Duration::hours(1),
        WindowKind::Day => start + Duration::days(1),
        WindowKind::Week => start + Duration::days(7),
        WindowKind::Month => {
            let date = start.date_naive();
            let next = if date.month() == 12 {
                NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
            };
            next.map(|d| midnight(d, start)).unwrap_or(start + Duration::days(31))
        }
    }
}
