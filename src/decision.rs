use crate::types::*;

/// Inputs the engine cannot derive from the request itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    /// Remaining share of AI budget/quota for this request kind, in `[0, 1]`.
    pub budget_available: f64,
    pub offline: bool,
    pub estimated_cost: f64,
    pub estimated_latency_ms: u64,
}

impl Default for DecisionContext {
    fn default() -> Self {
        Self {
            budget_available: 1.0,
            offline: false,
            estimated_cost: 0.0,
            estimated_latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub complexity: f64,
    pub engagement: f64,
    pub criticality: f64,
    pub time_sensitivity: f64,
    pub budget: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            complexity: 0.30,
            engagement: 0.20,
            criticality: 0.25,
            time_sensitivity: 0.15,
            budget: 0.10,
        }
    }
}

const AI_THRESHOLD: f64 = 0.7;
const HYBRID_THRESHOLD: f64 = 0.4;
const MIN_BUDGET: f64 = 0.1;
const LOW_BUDGET: f64 = 0.3;
const PARALLEL_BUDGET: f64 = 0.7;
const CRITICAL_HEALTH: f64 = 0.7;
const LOCAL_BASE_CAPABILITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteScores {
    pub ai: f64,
    pub local: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    weights: ScoreWeights,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Resolve a request to exactly one route. Pure in its inputs and
    /// recomputed for every request.
    pub fn decide(&self, req: &AnalysisRequest, ctx: &DecisionContext) -> RoutingDecision {
        if req.force_local {
            return RoutingDecision::local(LocalReason::UserPreference, 1.0);
        }
        let factors = compute_factors(req, ctx);
        self.resolve(&factors, ctx)
    }

    pub fn scores(&self, factors: &DecisionFactors) -> RouteScores {
        let w = &self.weights;
        let mut ai = w.complexity * factors.data_complexity
            + w.engagement * factors.user_engagement
            + w.criticality * factors.health_criticality
            + w.time_sensitivity * factors.time_sensitivity
            + w.budget * factors.budget_available;
        if factors.privacy_required {
            ai *= 0.5;
        }

        let mut local = LOCAL_BASE_CAPABILITY;
        if matches!(
            factors.complexity,
            DataComplexity::Simple | DataComplexity::Moderate
        ) {
            local += 0.2;
        }
        if matches!(
            factors.sensitivity,
            TimeSensitivity::RealTime | TimeSensitivity::Immediate
        ) {
            local += 0.15;
        }
        if factors.privacy_required {
            local += 0.3;
        }
        if factors.budget_available < LOW_BUDGET {
            local += 0.2;
        }

        RouteScores {
            ai: ai.clamp(0.0, 1.0),
            local: local.min(1.0),
        }
    }

    pub fn resolve(&self, factors: &DecisionFactors, ctx: &DecisionContext) -> RoutingDecision {
        let scores = self.scores(factors);

        if factors.offline {
            return RoutingDecision::local(LocalReason::Offline, scores.local);
        }
        if factors.budget_available < MIN_BUDGET {
            return RoutingDecision::local(LocalReason::BudgetConstrained, scores.local);
        }

        if scores.ai >= AI_THRESHOLD {
            let reason = if factors.health_criticality > CRITICAL_HEALTH {
                AiReason::CriticalHealth
            } else if factors.complexity >= DataComplexity::Complex {
                AiReason::HighComplexity
            } else if factors.engagement >= UserEngagement::High {
                AiReason::UserPreference
            } else {
                AiReason::ComprehensiveAnalysis
            };
            return RoutingDecision::Ai {
                reason,
                confidence: scores.ai,
                estimated_cost: ctx.estimated_cost,
                estimated_latency_ms: ctx.estimated_latency_ms,
            };
        }

        if scores.ai >= HYBRID_THRESHOLD {
            let strategy = if factors.sensitivity == TimeSensitivity::RealTime {
                HybridStrategy::LocalFirst
            } else if factors.complexity == DataComplexity::VeryComplex {
                HybridStrategy::AiEnhanced
            } else if factors.budget_available > PARALLEL_BUDGET {
                HybridStrategy::Parallel
            } else {
                HybridStrategy::Sequential
            };
            return RoutingDecision::Hybrid {
                strategy,
                local_components: local_components(),
                ai_components: ai_components(factors),
                combined_accuracy: (0.5 * (scores.ai + scores.local) + 0.1).min(0.95),
            };
        }

        let reason = if factors.budget_available < LOW_BUDGET {
            LocalReason::BudgetConstraints
        } else if matches!(
            factors.sensitivity,
            TimeSensitivity::RealTime | TimeSensitivity::Immediate
        ) {
            LocalReason::FastResponseNeeded
        } else if factors.privacy_required {
            LocalReason::PrivacyPreferred
        } else if factors.complexity == DataComplexity::Simple {
            LocalReason::SimpleMetrics
        } else {
            LocalReason::BasicAnalysisOnly
        };
        RoutingDecision::local(reason, scores.local)
    }
}

fn local_components() -> Vec<AnalysisGoal> {
    vec![
        AnalysisGoal::VitalSigns,
        AnalysisGoal::SleepPatterns,
        AnalysisGoal::ActivityLevels,
        AnalysisGoal::BodyComposition,
    ]
}

fn ai_components(factors: &DecisionFactors) -> Vec<AnalysisGoal> {
    let mut components = vec![AnalysisGoal::Recommendations];
    if factors.complexity >= DataComplexity::Complex {
        components.push(AnalysisGoal::TrendAnalysis);
    }
    if factors.health_criticality > 0.4 {
        components.push(AnalysisGoal::RiskAssessment);
    }
    components
}

/// Derive routing inputs from the request plus runtime context.
pub fn compute_factors(req: &AnalysisRequest, ctx: &DecisionContext) -> DecisionFactors {
    let data_complexity = data_complexity_score(req);
    let complexity = match data_complexity {
        v if v < 0.3 => DataComplexity::Simple,
        v if v < 0.55 => DataComplexity::Moderate,
        v if v < 0.8 => DataComplexity::Complex,
        _ => DataComplexity::VeryComplex,
    };
    let engagement = user_engagement(req);
    let sensitivity = time_sensitivity(req.kind);

    DecisionFactors {
        complexity,
        data_complexity,
        engagement,
        user_engagement: match engagement {
            UserEngagement::Low => 0.25,
            UserEngagement::Medium => 0.5,
            UserEngagement::High => 0.75,
            UserEngagement::Critical => 1.0,
        },
        sensitivity,
        time_sensitivity: match sensitivity {
            TimeSensitivity::Routine => 0.2,
            TimeSensitivity::Moderate => 0.5,
            TimeSensitivity::Immediate => 0.8,
            TimeSensitivity::RealTime => 1.0,
        },
        health_criticality: health_criticality(req),
        budget_available: ctx.budget_available.clamp(0.0, 1.0),
        privacy_required: req.profile.privacy == PrivacyLevel::Strict,
        offline: ctx.offline,
    }
}

fn data_complexity_score(req: &AnalysisRequest) -> f64 {
    let richness = req.snapshot.data_completeness();
    let tier_bonus = match req.kind.complexity() {
        ComplexityTier::Low => 0.0,
        ComplexityTier::Medium => 0.15,
        ComplexityTier::High => 0.3,
    };
    let conditions = (req.profile.chronic_conditions.len() as f64 * 0.1).min(0.3);
    (0.7 * richness + tier_bonus + conditions).clamp(0.0, 1.0)
}

fn user_engagement(req: &AnalysisRequest) -> UserEngagement {
    match req.kind {
        RequestKind::Critical => return UserEngagement::Critical,
        RequestKind::UserRequested => return UserEngagement::High,
        _ => {}
    }
    let active = matches!(
        req.profile.exercise_frequency,
        Some(ExerciseFrequency::Active) | Some(ExerciseFrequency::VeryActive)
    );
    match (req.profile.goals.len(), active) {
        (n, true) if n >= 2 => UserEngagement::High,
        (n, _) if n >= 2 => UserEngagement::Medium,
        (_, true) => UserEngagement::Medium,
        _ => UserEngagement::Low,
    }
}

fn time_sensitivity(kind: RequestKind) -> TimeSensitivity {
    match kind {
        RequestKind::Quick => TimeSensitivity::RealTime,
        RequestKind::Critical => TimeSensitivity::Immediate,
        RequestKind::Daily | RequestKind::UserRequested => TimeSensitivity::Moderate,
        RequestKind::Comprehensive | RequestKind::Weekly => TimeSensitivity::Routine,
    }
}

/// How urgently the readings call for deeper analysis, in `[0, 1]`.
pub fn health_criticality(req: &AnalysisRequest) -> f64 {
    let vitals = &req.snapshot.vitals;
    let mut score: f64 = 0.0;

    if let Some(rhr) = vitals.resting_heart_rate {
        if !(40.0..=120.0).contains(&rhr) {
            score = score.max(0.9);
        } else if !(50.0..=100.0).contains(&rhr) {
            score = score.max(0.6);
        }
    }
    if let Some(sys) = vitals.systolic_bp {
        if sys > 180.0 {
            score = score.max(1.0);
        } else if sys >= 140.0 {
            score = score.max(0.7);
        } else if sys >= 130.0 {
            score = score.max(0.4);
        }
    }
    if let Some(dia) = vitals.diastolic_bp {
        if dia > 120.0 {
            score = score.max(1.0);
        } else if dia >= 90.0 {
            score = score.max(0.7);
        }
    }
    if let Some(spo2) = vitals.oxygen_saturation {
        if spo2 < 90.0 {
            score = score.max(1.0);
        } else if spo2 < 94.0 {
            score = score.max(0.6);
        }
    }
    if let Some(rr) = vitals.respiratory_rate {
        if !(10.0..=24.0).contains(&rr) {
            score = score.max(0.6);
        }
    }
    if let Some(hours) = req.snapshot.sleep.duration_hours {
        if hours < 5.0 {
            score = score.max(0.4);
        }
    }

    score += (req.profile.chronic_conditions.len() as f64 * 0.1).min(0.3);
    if req.kind == RequestKind::Critical {
        score = score.max(0.8);
    }
    score.clamp(0.0, 1.0)
}
