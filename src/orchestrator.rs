//! Request lifecycle: cache check, routing, execution with fallback,
//! caching, and bounded history.

use crate::ai::{AiAnalysisClient, HttpAiClient};
use crate::analyzer::LocalAnalyzer;
use crate::cache::{Fingerprint, ResultCache};
use crate::config::{OrchestratorConfig, DEFAULT_HISTORY_LIMIT};
use crate::decision::{DecisionContext, DecisionEngine};
use crate::errors::{AiClientError, AnalysisError};
use crate::health::{AiEndpoint, ServiceHealth};
use crate::rate::{QuotaDecision, RateLimiter};
use crate::store::{FileStore, HealthDataSource, KeyValueStore, ProfileStore};
use crate::types::*;
use arc_swap::ArcSwapOption;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;
const MAX_AGE: u32 = 130;

#[derive(Debug, Default)]
struct OrchestratorMetrics {
    by_kind: DashMap<RequestKind, u64>,
    by_method: DashMap<AnalysisMethod, u64>,
    cache_hits: AtomicU64,
    ai_fallbacks: AtomicU64,
}

impl OrchestratorMetrics {
    fn count_request(&self, kind: RequestKind) {
        self.by_kind
            .entry(kind)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn count_method(&self, method: AnalysisMethod) {
        self.by_method
            .entry(method)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }
}

pub struct Orchestrator {
    analyzer: LocalAnalyzer,
    decision: DecisionEngine,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    ai: Option<Arc<dyn AiAnalysisClient>>,
    ai_health: ServiceHealth,
    history: Mutex<VecDeque<Arc<AnalysisResult>>>,
    history_limit: usize,
    last_result: ArcSwapOption<AnalysisResult>,
    events: broadcast::Sender<ProgressEvent>,
    metrics: OrchestratorMetrics,
    in_flight: AtomicUsize,
}

impl Orchestrator {
    pub fn new(
        limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
        ai: Option<Arc<dyn AiAnalysisClient>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            analyzer: LocalAnalyzer::new(),
            decision: DecisionEngine::new(),
            limiter,
            cache,
            ai,
            ai_health: ServiceHealth::new(),
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
            last_result: ArcSwapOption::empty(),
            events,
            metrics: OrchestratorMetrics::default(),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_decision_engine(mut self, engine: DecisionEngine) -> Self {
        self.decision = engine;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_ai_health(mut self, health: ServiceHealth) -> Self {
        self.ai_health = health;
        self
    }

    /// Wire up the service from configuration. A configured state directory
    /// backs both the rate limiter and the result cache.
    pub async fn bootstrap(cfg: &OrchestratorConfig) -> Result<Self, AnalysisError> {
        let store: Option<Arc<dyn KeyValueStore>> = match &cfg.state_dir {
            Some(dir) => match FileStore::open(dir).await {
                Ok(store) => {
                    tracing::info!(dir = ?dir, "persisting state to file store");
                    Some(Arc::new(store))
                }
                Err(err) => {
                    tracing::warn!(dir = ?dir, "state dir unusable, state stays in memory: {err}");
                    None
                }
            },
            None => None,
        };

        let (limiter, cache) = match store {
            Some(store) => (
                RateLimiter::with_store(cfg.quota.clone(), store.clone()).await,
                ResultCache::with_store(cfg.cache_capacity, cfg.cache_ttl_ms, store).await,
            ),
            None => (
                RateLimiter::new(cfg.quota.clone()),
                ResultCache::new(cfg.cache_capacity, cfg.cache_ttl_ms),
            ),
        };

        let ai: Option<Arc<dyn AiAnalysisClient>> = match &cfg.ai {
            Some(ai_cfg) => {
                let client = HttpAiClient::new(ai_cfg.clone())
                    .map_err(|err| AnalysisError::Internal(err.to_string()))?;
                Some(Arc::new(client))
            }
            None => None,
        };

        Ok(Self::new(Arc::new(limiter), Arc::new(cache), ai)
            .with_history_limit(cfg.history_limit))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn ai_health(&self) -> &ServiceHealth {
        &self.ai_health
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Serve a request from cache or run it along the routed path. Only
    /// malformed or empty input is an error; AI trouble degrades to local.
    pub async fn request_analysis(
        &self,
        req: AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        validate_request(&req)?;
        let started = Instant::now();
        let _guard = InFlight::enter(&self.in_flight);
        let request_id = Uuid::new_v4().to_string();
        let mut lifecycle = Lifecycle::new(&self.events, &request_id, req.kind);
        self.metrics.count_request(req.kind);

        let fingerprint = Fingerprint::derive(&req);
        if let Some(hit) = self.cache.lookup(&fingerprint, req.snapshot.captured_at).await {
            lifecycle.enter(AnalysisPhase::CacheChecked { hit: true });
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.metrics.count_method(hit.method);
            tracing::debug!(
                kind = req.kind.as_str(),
                result_id = %hit.id,
                "served analysis from cache"
            );
            self.last_result.store(Some(Arc::new(hit.clone())));
            lifecycle.enter(AnalysisPhase::Completed { method: hit.method });
            return Ok(hit);
        }
        lifecycle.enter(AnalysisPhase::CacheChecked { hit: false });

        lifecycle.enter(AnalysisPhase::Deciding);
        let (ctx, denial) = self.decision_context(req.kind);
        let mut decision = self.decision.decide(&req, &ctx);
        let mut fallback = None;
        if decision.is_local() && !req.force_local && !ctx.offline {
            if let Some(denial) = &denial {
                let (reason, why) = quota_fallback(denial);
                decision = RoutingDecision::local(reason, decision_confidence(&decision));
                fallback = why;
            }
        }
        tracing::debug!(
            request_id = %request_id,
            kind = req.kind.as_str(),
            route = decision.route_name(),
            "routing decision"
        );

        let previous = self.previous_local();
        let mut outcome = match decision {
            RoutingDecision::Local { .. } => self.run_local(
                &req,
                decision,
                previous.as_ref(),
                AnalysisMethod::Local,
                &mut lifecycle,
            ),
            RoutingDecision::Ai { .. } => {
                self.run_ai(&req, decision, previous.as_ref(), &mut lifecycle)
                    .await
            }
            RoutingDecision::Hybrid { .. } => {
                self.run_hybrid(&req, decision, previous, &mut lifecycle)
                    .await
            }
        };
        if outcome.metrics.fallback_reason.is_none() {
            outcome.metrics.fallback_reason = fallback;
        }
        outcome.metrics.total_ms = started.elapsed().as_millis() as u64;

        let result = Arc::new(outcome.into_result(request_id.clone(), &req));
        if is_cacheable(&result) {
            lifecycle.enter(AnalysisPhase::Caching);
            self.cache
                .insert(fingerprint, result.clone(), req.snapshot.captured_at)
                .await;
        }
        self.record(result.clone());
        lifecycle.enter(AnalysisPhase::Completed {
            method: result.method,
        });
        tracing::info!(
            request_id = %request_id,
            kind = req.kind.as_str(),
            method = result.method.as_str(),
            total_ms = result.metrics.total_ms,
            "analysis completed"
        );
        Ok((*result).clone())
    }

    /// Local-only analysis that skips the cache and the decision engine.
    pub async fn quick_health_check(
        &self,
        snapshot: HealthSnapshot,
        profile: UserProfile,
    ) -> Result<AnalysisResult, AnalysisError> {
        let req = AnalysisRequest::new(snapshot, profile, RequestKind::Quick);
        validate_request(&req)?;
        let started = Instant::now();
        let _guard = InFlight::enter(&self.in_flight);
        let request_id = Uuid::new_v4().to_string();
        let mut lifecycle = Lifecycle::new(&self.events, &request_id, req.kind);
        self.metrics.count_request(req.kind);

        let previous = self.previous_local();
        let decision = RoutingDecision::local(LocalReason::QuickCheck, 1.0);
        let mut outcome = self.run_local(
            &req,
            decision,
            previous.as_ref(),
            AnalysisMethod::Local,
            &mut lifecycle,
        );
        outcome.metrics.total_ms = started.elapsed().as_millis() as u64;

        let result = Arc::new(outcome.into_result(request_id.clone(), &req));
        self.record(result.clone());
        lifecycle.enter(AnalysisPhase::Completed {
            method: result.method,
        });
        Ok((*result).clone())
    }

    /// Pull the snapshot and profile from their collaborators, then analyze.
    pub async fn analyze_from_sources(
        &self,
        kind: RequestKind,
        language: &str,
        source: &dyn HealthDataSource,
        profiles: &dyn ProfileStore,
    ) -> Result<AnalysisResult, AnalysisError> {
        let snapshot = source.snapshot().await?;
        let profile = profiles.profile().await?;
        let req = AnalysisRequest::new(snapshot, profile, kind).with_language(language);
        self.request_analysis(req).await
    }

    pub fn get_capabilities(&self) -> Capabilities {
        let now = Utc::now();
        let ai_available = !self.is_offline() && self.limiter.remaining_budget_at(now) > 0.0;
        let per_kind = RequestKind::ALL
            .iter()
            .map(|kind| (*kind, self.limiter.remaining_at(*kind, now)))
            .collect();
        Capabilities {
            ai_available,
            local_available: true,
            hybrid_available: ai_available,
            remaining_quota: RemainingQuota {
                per_kind,
                remaining_budget: self.limiter.remaining_budget_at(now),
            },
            next_reset_time: self.limiter.next_reset_at(now),
        }
    }

    pub fn history(&self) -> Vec<Arc<AnalysisResult>> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn last_result(&self) -> Option<Arc<AnalysisResult>> {
        self.last_result.load_full()
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            in_flight: self.in_flight.load(Ordering::SeqCst),
            last_result_id: self.last_result.load().as_ref().map(|r| r.id.clone()),
            history_len: self.history.lock().len(),
        }
    }

    pub fn stats(&self) -> OrchestratorStats {
        let total_requests: u64 = self.metrics.by_kind.iter().map(|e| *e.value()).sum();
        let cache_hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        OrchestratorStats {
            total_requests,
            cache_hits,
            cache_hit_ratio: if total_requests == 0 {
                0.0
            } else {
                cache_hits as f32 / total_requests as f32
            },
            ai_fallbacks: self.metrics.ai_fallbacks.load(Ordering::Relaxed),
            by_kind: self
                .metrics
                .by_kind
                .iter()
                .map(|e| (e.key().as_str().to_string(), *e.value()))
                .collect::<HashMap<_, _>>(),
            by_method: self
                .metrics
                .by_method
                .iter()
                .map(|e| (e.key().as_str().to_string(), *e.value()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn is_offline(&self) -> bool {
        self.ai.is_none() || self.ai_health.is_offline()
    }

    /// Runtime inputs for the decision engine, plus the quota denial that
    /// zeroed the budget, if any.
    fn decision_context(&self, kind: RequestKind) -> (DecisionContext, Option<QuotaDecision>) {
        let now = Utc::now();
        let peek = self.limiter.peek_at(kind, now);
        let (budget_available, denial) = if peek.is_allowed() {
            (self.limiter.budget_fraction_at(now), None)
        } else {
            (0.0, Some(peek))
        };
        let endpoint = endpoint_for(kind);
        let ctx = DecisionContext {
            budget_available,
            offline: self.is_offline(),
            estimated_cost: self.limiter.policy().cost(kind),
            estimated_latency_ms: self.ai_health.expected_latency_ms(endpoint),
        };
        (ctx, denial)
    }

    fn previous_local(&self) -> Option<LocalInsights> {
        self.history
            .lock()
            .iter()
            .rev()
            .find_map(|result| result.local.clone())
    }

    fn record(&self, result: Arc<AnalysisResult>) {
        self.metrics.count_method(result.method);
        {
            let mut history = self.history.lock();
            history.push_back(result.clone());
            while history.len() > self.history_limit {
                history.pop_front();
            }
        }
        self.last_result.store(Some(result));
    }

    fn run_local(
        &self,
        req: &AnalysisRequest,
        decision: RoutingDecision,
        previous: Option<&LocalInsights>,
        path: AnalysisMethod,
        lifecycle: &mut Lifecycle<'_>,
    ) -> Outcome {
        lifecycle.enter(AnalysisPhase::Executing { path });
        let started = Instant::now();
        let local = self.analyzer.analyze(&req.snapshot, &req.profile, previous);
        Outcome {
            method: path,
            overall_score: Some(local.overall_score),
            local: Some(local),
            ai: None,
            decision,
            combination: None,
            metrics: PerformanceMetrics {
                local_ms: Some(started.elapsed().as_millis() as u64),
                ..PerformanceMetrics::default()
            },
        }
    }

    /// Claim quota for an AI dispatch. A denial reroutes the request to the
    /// local path.
    async fn claim_quota(&self, kind: RequestKind) -> Result<(), (LocalReason, Option<FallbackReason>)> {
        match self.limiter.check_and_record(kind).await {
            QuotaDecision::Allowed => Ok(()),
            denied => Err(quota_fallback(&denied)),
        }
    }

    async fn run_ai(
        &self,
        req: &AnalysisRequest,
        decision: RoutingDecision,
        previous: Option<&LocalInsights>,
        lifecycle: &mut Lifecycle<'_>,
    ) -> Outcome {
        if let Err((reason, why)) = self.claim_quota(req.kind).await {
            return self.reroute_local(req, reason, why, previous, lifecycle);
        }

        lifecycle.enter(AnalysisPhase::Executing {
            path: AnalysisMethod::Ai,
        });
        let cost = self.limiter.policy().cost(req.kind);
        let (result, elapsed) = call_ai(self.ai.clone(), self.ai_health.clone(), req).await;
        match result {
            Ok(payload) => Outcome {
                method: AnalysisMethod::Ai,
                overall_score: payload.score(),
                local: None,
                ai: Some(payload),
                decision,
                combination: None,
                metrics: PerformanceMetrics {
                    ai_ms: Some(elapsed.as_millis() as u64),
                    estimated_cost: cost,
                    ..PerformanceMetrics::default()
                },
            },
            Err(err) => {
                self.metrics.ai_fallbacks.fetch_add(1, Ordering::Relaxed);
                let reason = FallbackReason::AiFailed {
                    retriable: err.is_retriable(),
                    error: err.to_string(),
                };
                tracing::warn!(
                    kind = req.kind.as_str(),
                    error = %err,
                    "ai analysis failed, falling back to local"
                );
                lifecycle.enter(AnalysisPhase::FallingBack {
                    reason: reason.clone(),
                });
                let mut outcome = self.run_local(
                    req,
                    decision,
                    previous,
                    AnalysisMethod::LocalFallback,
                    lifecycle,
                );
                outcome.metrics.ai_ms = Some(elapsed.as_millis() as u64);
                outcome.metrics.estimated_cost = cost;
                outcome.metrics.fallback_reason = Some(reason);
                outcome
            }
        }
    }

    /// Local and AI branches run as separate tasks. Dropping the request
    /// future drops the join set, which aborts whichever branch is pending.
    async fn run_hybrid(
        &self,
        req: &AnalysisRequest,
        decision: RoutingDecision,
        previous: Option<LocalInsights>,
        lifecycle: &mut Lifecycle<'_>,
    ) -> Outcome {
        if let Err((reason, why)) = self.claim_quota(req.kind).await {
            return self.reroute_local(req, reason, why, previous.as_ref(), lifecycle);
        }

        lifecycle.enter(AnalysisPhase::Executing {
            path: AnalysisMethod::Hybrid,
        });
        let mut branches = JoinSet::new();
        {
            let analyzer = self.analyzer.clone();
            let snapshot = req.snapshot.clone();
            let profile = req.profile.clone();
            let previous = previous.clone();
            branches.spawn(async move {
                let started = Instant::now();
                let local = analyzer.analyze(&snapshot, &profile, previous.as_ref());
                Branch::Local(local, started.elapsed())
            });
        }
        {
            let ai = self.ai.clone();
            let health = self.ai_health.clone();
            let req = req.clone();
            branches.spawn(async move {
                let (result, elapsed) = call_ai(ai, health, &req).await;
                Branch::Ai(result, elapsed)
            });
        }

        let mut local = None;
        let mut local_ms = None;
        let mut ai = None;
        let mut ai_ms = None;
        let mut failure = None;
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(Branch::Local(insights, elapsed)) => {
                    local = Some(insights);
                    local_ms = Some(elapsed.as_millis() as u64);
                }
                Ok(Branch::Ai(Ok(payload), elapsed)) => {
                    ai = Some(payload);
                    ai_ms = Some(elapsed.as_millis() as u64);
                }
                Ok(Branch::Ai(Err(err), elapsed)) => {
                    ai_ms = Some(elapsed.as_millis() as u64);
                    failure = Some(err);
                }
                Err(err) => {
                    tracing::warn!("hybrid branch did not complete: {err}");
                }
            }
        }

        // Local analysis is deterministic; redo it if its task died.
        let local = local.unwrap_or_else(|| {
            self.analyzer
                .analyze(&req.snapshot, &req.profile, previous.as_ref())
        });
        if ai.is_none() && failure.is_none() {
            failure = Some(AiClientError::Unavailable("ai branch aborted".into()));
        }
        let fallback_reason = failure.map(|err| {
            self.metrics.ai_fallbacks.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                kind = req.kind.as_str(),
                error = %err,
                "ai branch of hybrid analysis failed"
            );
            FallbackReason::AiFailed {
                retriable: err.is_retriable(),
                error: err.to_string(),
            }
        });

        let strategy = match &decision {
            RoutingDecision::Hybrid { strategy, .. } => *strategy,
            _ => HybridStrategy::Sequential,
        };
        let combination = strategy.combination();
        let (local, ai, overall_score) = combine(combination, local, ai);

        Outcome {
            method: AnalysisMethod::Hybrid,
            overall_score,
            local,
            ai,
            decision,
            combination: Some(combination),
            metrics: PerformanceMetrics {
                local_ms,
                ai_ms,
                estimated_cost: self.limiter.policy().cost(req.kind),
                fallback_reason,
                ..PerformanceMetrics::default()
            },
        }
    }

    fn reroute_local(
        &self,
        req: &AnalysisRequest,
        reason: LocalReason,
        why: Option<FallbackReason>,
        previous: Option<&LocalInsights>,
        lifecycle: &mut Lifecycle<'_>,
    ) -> Outcome {
        tracing::info!(
            kind = req.kind.as_str(),
            reason = ?reason,
            "ai dispatch denied by quota, routing local"
        );
        if let Some(why) = &why {
            lifecycle.enter(AnalysisPhase::FallingBack { reason: why.clone() });
        }
        let decision = RoutingDecision::local(reason, 1.0);
        let mut outcome =
            self.run_local(req, decision, previous, AnalysisMethod::Local, lifecycle);
        outcome.metrics.fallback_reason = why;
        outcome
    }
}

enum Branch {
    Local(LocalInsights, Duration),
    Ai(Result<AiPayload, AiClientError>, Duration),
}

struct Outcome {
    method: AnalysisMethod,
    local: Option<LocalInsights>,
    ai: Option<AiPayload>,
    decision: RoutingDecision,
    combination: Option<CombinationStrategy>,
    overall_score: Option<f64>,
    metrics: PerformanceMetrics,
}

impl Outcome {
    fn into_result(self, id: String, req: &AnalysisRequest) -> AnalysisResult {
        AnalysisResult {
            id,
            kind: req.kind,
            method: self.method,
            local: self.local,
            ai: self.ai,
            decision: self.decision,
            combination: self.combination,
            overall_score: self.overall_score,
            metrics: self.metrics,
            generated_at: Utc::now(),
            language: req.language.clone(),
        }
    }
}

fn endpoint_for(kind: RequestKind) -> AiEndpoint {
    match kind {
        RequestKind::Quick => AiEndpoint::QuickAnalyze,
        _ => AiEndpoint::Analyze,
    }
}

async fn call_ai(
    client: Option<Arc<dyn AiAnalysisClient>>,
    health: ServiceHealth,
    req: &AnalysisRequest,
) -> (Result<AiPayload, AiClientError>, Duration) {
    let Some(client) = client else {
        return (
            Err(AiClientError::Unavailable("no ai client configured".into())),
            Duration::ZERO,
        );
    };
    let payload = AiAnalysisRequest::from_request(req);
    let endpoint = endpoint_for(req.kind);
    let started = Instant::now();
    let result = match endpoint {
        AiEndpoint::QuickAnalyze => client.quick_analyze(&payload).await.map(AiPayload::Quick),
        AiEndpoint::Analyze => client.analyze(&payload).await.map(AiPayload::Full),
    };
    let elapsed = started.elapsed();
    health.record(endpoint, elapsed, result.is_ok());
    (result, elapsed)
}

/// Merge the hybrid branches into (local, ai, overall score).
fn combine(
    strategy: CombinationStrategy,
    local: LocalInsights,
    ai: Option<AiPayload>,
) -> (Option<LocalInsights>, Option<AiPayload>, Option<f64>) {
    let local_score = local.overall_score;
    let ai_score = ai.as_ref().and_then(AiPayload::score);
    match strategy {
        CombinationStrategy::AiFallbackLocal => match ai {
            Some(payload) => (None, Some(payload), ai_score.or(Some(local_score))),
            None => (Some(local), None, Some(local_score)),
        },
        CombinationStrategy::LocalFallbackAi => (Some(local), ai, Some(local_score)),
        CombinationStrategy::BestOfBoth => {
            let score = match ai_score {
                Some(ai_score) => (local_score + ai_score) / 2.0,
                None => local_score,
            };
            (Some(local), ai, Some(score))
        }
    }
}

fn quota_fallback(denial: &QuotaDecision) -> (LocalReason, Option<FallbackReason>) {
    match denial {
        QuotaDecision::Allowed => (LocalReason::BudgetConstrained, None),
        QuotaDecision::RateLimited { reset_at, window } => (
            LocalReason::RateLimited,
            Some(FallbackReason::RateLimited {
                window: *window,
                reset_at: *reset_at,
            }),
        ),
        QuotaDecision::BudgetExceeded { reset_at } => (
            LocalReason::BudgetConstrained,
            Some(FallbackReason::BudgetExceeded {
                reset_at: *reset_at,
            }),
        ),
        QuotaDecision::CriticalOnly => (
            LocalReason::BudgetConstrained,
            Some(FallbackReason::CriticalOnly),
        ),
    }
}

fn decision_confidence(decision: &RoutingDecision) -> f64 {
    match decision {
        RoutingDecision::Local { confidence, .. } | RoutingDecision::Ai { confidence, .. } => {
            *confidence
        }
        RoutingDecision::Hybrid {
            combined_accuracy, ..
        } => *combined_accuracy,
    }
}

/// Results produced while the AI service was failing are not reused.
fn is_cacheable(result: &AnalysisResult) -> bool {
    result.method != AnalysisMethod::LocalFallback
        && !matches!(
            result.metrics.fallback_reason,
            Some(FallbackReason::AiFailed { .. })
        )
}

fn language_tag() -> Result<&'static Regex, AnalysisError> {
    static TAG: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$"))
        .as_ref()
        .map_err(|err| AnalysisError::Internal(format!("language tag pattern: {err}")))
}

pub fn validate_request(req: &AnalysisRequest) -> Result<(), AnalysisError> {
    if !language_tag()?.is_match(&req.language) {
        return Err(AnalysisError::InvalidRequest(format!(
            "unsupported language tag '{}'",
            req.language
        )));
    }
    if let Some(age) = req.profile.age {
        if age > MAX_AGE {
            return Err(AnalysisError::InvalidRequest(format!(
                "age {age} outside 0..={MAX_AGE}"
            )));
        }
    }
    let readings = req.snapshot.readings();
    if let Some((name, value)) = readings
        .iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
    {
        return Err(AnalysisError::InvalidRequest(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    if req.snapshot.metrics_present() == 0 {
        return Err(AnalysisError::InsufficientData(
            "snapshot carries no measurable health metrics".into(),
        ));
    }
    Ok(())
}

/// Counts a request as in flight until dropped, including on cancellation.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-request phase tracker. Phases only move forward and each transition
/// is published to subscribers.
struct Lifecycle<'a> {
    events: &'a broadcast::Sender<ProgressEvent>,
    request_id: &'a str,
    kind: RequestKind,
    rank: u8,
}

impl<'a> Lifecycle<'a> {
    fn new(
        events: &'a broadcast::Sender<ProgressEvent>,
        request_id: &'a str,
        kind: RequestKind,
    ) -> Self {
        Self {
            events,
            request_id,
            kind,
            rank: 0,
        }
    }

    fn enter(&mut self, phase: AnalysisPhase) {
        let rank = phase_rank(&phase);
        debug_assert!(rank >= self.rank, "phase {phase:?} entered out of order");
        self.rank = rank;
        // No subscribers is fine.
        let _ = self.events.send(ProgressEvent {
            request_id: self.request_id.to_string(),
            kind: self.kind,
            phase,
        });
    }
}

fn phase_rank(phase: &AnalysisPhase) -> u8 {
    match phase {
        AnalysisPhase::CacheChecked { .. } => 1,
        AnalysisPhase::Deciding => 2,
        AnalysisPhase::Executing { .. } | AnalysisPhase::FallingBack { .. } => 3,
        AnalysisPhase::Caching => 4,
        AnalysisPhase::Completed { .. } => 5,
    }
}
