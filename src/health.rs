use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Blended error rate above which the AI service is treated as offline.
pub const OFFLINE_ERROR_RATE: f32 = 0.5;

/// How long an endpoint stays offline without new samples before one call is
/// let through again.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AiEndpoint {
    Analyze,
    QuickAnalyze,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStats {
    pub p50_ms: f32,
    pub p95_ms: f32,
    pub err_rate: f32,
    pub calls: u64,
    pub last_update: DateTime<Utc>,
}

impl Default for EndpointStats {
    fn default() -> Self {
        Self {
            p50_ms: 1500.0,
            p95_ms: 4000.0,
            err_rate: 0.0,
            calls: 0,
            last_update: Utc::now(),
        }
    }
}

/// Rolling latency and failure view of the remote AI service. An offline
/// endpoint goes half-open once `cooldown` passes with no new samples; the
/// next recorded call then decides whether it comes back.
#[derive(Clone)]
pub struct ServiceHealth {
    inner: Arc<DashMap<AiEndpoint, EndpointStats>>,
    cooldown: Duration,
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            cooldown: DEFAULT_RETRY_COOLDOWN,
        }
    }
}

impl ServiceHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn snapshot(&self, endpoint: AiEndpoint) -> EndpointStats {
        self.inner
            .get(&endpoint)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn record(&self, endpoint: AiEndpoint, elapsed: Duration, success: bool) {
        self.record_at(endpoint, elapsed, success, Utc::now());
    }

    pub fn record_at(
        &self,
        endpoint: AiEndpoint,
        elapsed: Duration,
        success: bool,
        now: DateTime<Utc>,
    ) {
        let mut entry = self.inner.entry(endpoint).or_default();
        let latency = elapsed.as_millis() as f32;
        if success {
            entry.p50_ms = blend(entry.p50_ms, latency, 0.2);
            entry.p95_ms = blend(entry.p95_ms, latency * 1.3, 0.1);
        }
        let err = if success { 0.0 } else { 1.0 };
        entry.err_rate = blend(entry.err_rate, err, 0.25);
        entry.calls += 1;
        entry.last_update = now;
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline_at(Utc::now())
    }

    pub fn is_offline_at(&self, now: DateTime<Utc>) -> bool {
        let cooldown = chrono::Duration::from_std(self.cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        self.inner.iter().any(|entry| {
            entry.err_rate > OFFLINE_ERROR_RATE && now - entry.last_update < cooldown
        })
    }

    pub fn expected_latency_ms(&self, endpoint: AiEndpoint) -> u64 {
        self.snapshot(endpoint).p50_ms.round().max(0.0) as u64
    }
}

fn blend(prev: f32, new: f32, alpha: f32) -> f32 {
    prev + (new - prev) * alpha.clamp(0.0, 1.0)
}
