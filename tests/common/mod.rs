#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use health_router::ai::AiAnalysisClient;
use health_router::cache::ResultCache;
use health_router::errors::AiClientError;
use health_router::orchestrator::Orchestrator;
use health_router::rate::{QuotaPolicy, RateLimiter};
use health_router::types::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Healthy adult with every metric reported.
pub fn full_snapshot(captured_at: DateTime<Utc>) -> HealthSnapshot {
    HealthSnapshot {
        captured_at,
        vitals: VitalSigns {
            resting_heart_rate: Some(62.0),
            heart_rate_variability: Some(55.0),
            systolic_bp: Some(118.0),
            diastolic_bp: Some(76.0),
            oxygen_saturation: Some(98.0),
            respiratory_rate: Some(14.0),
        },
        sleep: SleepData {
            duration_hours: Some(7.5),
            efficiency: Some(90.0),
            deep_sleep_pct: Some(18.0),
            rem_sleep_pct: Some(22.0),
        },
        activity: ActivityData {
            steps: Some(11_000.0),
            exercise_minutes: Some(35.0),
            active_calories: Some(520.0),
        },
        body: BodyMeasurements {
            weight_kg: Some(75.0),
            height_cm: Some(180.0),
            bmi: None,
            body_fat_pct: Some(18.0),
        },
        nutrition: NutritionData {
            calories: Some(2_300.0),
            sodium_mg: Some(1_800.0),
            fiber_g: Some(28.0),
            sugar_g: Some(30.0),
            water_liters: Some(2.2),
        },
    }
}

/// Six of the twelve metrics: heart rate, HRV, blood pressure, sleep
/// duration, sleep efficiency, steps.
pub fn partial_snapshot(captured_at: DateTime<Utc>) -> HealthSnapshot {
    let mut snapshot = HealthSnapshot::empty(captured_at);
    snapshot.vitals.resting_heart_rate = Some(62.0);
    snapshot.vitals.heart_rate_variability = Some(55.0);
    snapshot.vitals.systolic_bp = Some(118.0);
    snapshot.vitals.diastolic_bp = Some(76.0);
    snapshot.sleep.duration_hours = Some(7.5);
    snapshot.sleep.efficiency = Some(90.0);
    snapshot.activity.steps = Some(11_000.0);
    snapshot
}

pub fn steps_only(captured_at: DateTime<Utc>, steps: f64) -> HealthSnapshot {
    let mut snapshot = HealthSnapshot::empty(captured_at);
    snapshot.activity.steps = Some(steps);
    snapshot
}

pub fn active_profile() -> UserProfile {
    UserProfile {
        age: Some(40),
        gender: Gender::Male,
        goals: vec![HealthGoal::Fitness, HealthGoal::HeartHealth],
        exercise_frequency: Some(ExerciseFrequency::Active),
        chronic_conditions: Vec::new(),
        privacy: PrivacyLevel::Standard,
    }
}

pub fn ai_insights(score: f64) -> AiInsights {
    AiInsights {
        summary: "Overall healthy with room to improve sleep consistency".into(),
        overall_score: Some(score),
        insights: vec![AiInsight {
            category: Some(HealthCategory::Sleep),
            title: "Sleep timing".into(),
            detail: "Bedtime varies by more than an hour across the week".into(),
            confidence: 0.8,
        }],
        recommendations: vec!["Keep a consistent bedtime".into()],
        model: Some("scripted".into()),
    }
}

/// In-process AI double. Pops scripted replies in order, then repeats the
/// fallback reply.
pub struct ScriptedAi {
    replies: Mutex<VecDeque<Result<AiInsights, AiClientError>>>,
    fallback: Result<AiInsights, AiClientError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedAi {
    pub fn succeeding(score: f64) -> Self {
        Self::always(Ok(ai_insights(score)))
    }

    pub fn failing(err: AiClientError) -> Self {
        Self::always(Err(err))
    }

    pub fn always(reply: Result<AiInsights, AiClientError>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then(self, reply: Result<AiInsights, AiClientError>) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<AiInsights, AiClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.replies.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl AiAnalysisClient for ScriptedAi {
    async fn analyze(&self, _req: &AiAnalysisRequest) -> Result<AiInsights, AiClientError> {
        self.next().await
    }

    async fn quick_analyze(
        &self,
        _req: &AiAnalysisRequest,
    ) -> Result<QuickAiInsights, AiClientError> {
        self.next().await.map(|insights| QuickAiInsights {
            summary: insights.summary,
            score: insights.overall_score,
            highlights: insights.recommendations,
        })
    }
}

pub fn orchestrator_with(ai: Option<Arc<ScriptedAi>>) -> Orchestrator {
    orchestrator_with_policy(ai, QuotaPolicy::default())
}

pub fn orchestrator_with_policy(ai: Option<Arc<ScriptedAi>>, policy: QuotaPolicy) -> Orchestrator {
    let limiter = Arc::new(RateLimiter::new(policy));
    let cache = Arc::new(ResultCache::new(50, 60 * 60 * 1000));
    let ai = ai.map(|client| client as Arc<dyn AiAnalysisClient>);
    Orchestrator::new(limiter, cache, ai)
}

pub fn sample_result(id: &str, generated_at: DateTime<Utc>) -> AnalysisResult {
    AnalysisResult {
        id: id.to_string(),
        kind: RequestKind::Daily,
        method: AnalysisMethod::Local,
        local: None,
        ai: None,
        decision: RoutingDecision::local(LocalReason::Offline, 0.9),
        combination: None,
        overall_score: Some(82.0),
        metrics: PerformanceMetrics::default(),
        generated_at,
        language: "en".into(),
    }
}
