use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of metric evaluators that feed the local analysis. Data completeness
/// is the fraction of these with input present.
pub const EXPECTED_METRICS: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VitalSigns {
    pub resting_heart_rate: Option<f64>,
    pub heart_rate_variability: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub respiratory_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SleepData {
    pub duration_hours: Option<f64>,
    /// Percentage of time in bed spent asleep.
    pub efficiency: Option<f64>,
    pub deep_sleep_pct: Option<f64>,
    pub rem_sleep_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ActivityData {
    pub steps: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub active_calories: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BodyMeasurements {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub bmi: Option<f64>,
    pub body_fat_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NutritionData {
    pub calories: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub water_liters: Option<f64>,
}

impl NutritionData {
    /// True when none of the fields the nutrition evaluator reads are set.
    /// Calorie intake alone is carried for the AI payload but not assessed.
    pub fn is_empty(&self) -> bool {
        self.sodium_mg.is_none()
            && self.fiber_g.is_none()
            && self.sugar_g.is_none()
            && self.water_liters.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSnapshot {
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub vitals: VitalSigns,
    #[serde(default)]
    pub sleep: SleepData,
    #[serde(default)]
    pub activity: ActivityData,
    #[serde(default)]
    pub body: BodyMeasurements,
    #[serde(default)]
    pub nutrition: NutritionData,
}

impl HealthSnapshot {
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            vitals: VitalSigns::default(),
            sleep: SleepData::default(),
            activity: ActivityData::default(),
            body: BodyMeasurements::default(),
            nutrition: NutritionData::default(),
        }
    }

    /// Explicit BMI if reported, otherwise derived from weight and height.
    pub fn bmi(&self) -> Option<f64> {
        self.body.bmi.or_else(|| match (self.body.weight_kg, self.body.height_cm) {
            (Some(weight), Some(height)) if height > 0.0 => {
                let meters = height / 100.0;
                Some(weight / (meters * meters))
            }
            _ => None,
        })
    }

    pub fn metrics_present(&self) -> usize {
        let blood_pressure = self.vitals.systolic_bp.is_some() || self.vitals.diastolic_bp.is_some();
        let stages = self.sleep.deep_sleep_pct.is_some() || self.sleep.rem_sleep_pct.is_some();
        [
            self.vitals.resting_heart_rate.is_some(),
            self.vitals.heart_rate_variability.is_some(),
            blood_pressure,
            self.sleep.duration_hours.is_some(),
            self.sleep.efficiency.is_some(),
            stages,
            self.activity.steps.is_some(),
            self.activity.exercise_minutes.is_some(),
            self.activity.active_calories.is_some(),
            self.bmi().is_some(),
            self.body.body_fat_pct.is_some(),
            !self.nutrition.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn data_completeness(&self) -> f64 {
        self.metrics_present() as f64 / EXPECTED_METRICS as f64
    }

    /// Every numeric reading in the snapshot, paired with its field name.
    pub fn readings(&self) -> Vec<(&'static str, f64)> {
        let fields = [
            ("resting_heart_rate", self.vitals.resting_heart_rate),
            ("heart_rate_variability", self.vitals.heart_rate_variability),
            ("systolic_bp", self.vitals.systolic_bp),
            ("diastolic_bp", self.vitals.diastolic_bp),
            ("oxygen_saturation", self.vitals.oxygen_saturation),
            ("respiratory_rate", self.vitals.respiratory_rate),
            ("sleep_duration_hours", self.sleep.duration_hours),
            ("sleep_efficiency", self.sleep.efficiency),
            ("deep_sleep_pct", self.sleep.deep_sleep_pct),
            ("rem_sleep_pct", self.sleep.rem_sleep_pct),
            ("steps", self.activity.steps),
            ("exercise_minutes", self.activity.exercise_minutes),
            ("active_calories", self.activity.active_calories),
            ("weight_kg", self.body.weight_kg),
            ("height_cm", self.body.height_cm),
            ("bmi", self.body.bmi),
            ("body_fat_pct", self.body.body_fat_pct),
            ("calories", self.nutrition.calories),
            ("sodium_mg", self.nutrition.sodium_mg),
            ("fiber_g", self.nutrition.fiber_g),
            ("sugar_g", self.nutrition.sugar_g),
            ("water_liters", self.nutrition.water_liters),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthGoal {
    WeightLoss,
    Fitness,
    BetterSleep,
    StressReduction,
    HeartHealth,
    Longevity,
    GeneralWellness,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseFrequency {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    Standard,
    Enhanced,
    /// Keep analysis on-device whenever the routing permits it.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserProfile {
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub goals: Vec<HealthGoal>,
    pub exercise_frequency: Option<ExerciseFrequency>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub privacy: PrivacyLevel,
}

impl UserProfile {
    pub const EXPECTED_FIELDS: usize = 4;

    pub fn completeness(&self) -> f64 {
        let present = [
            self.age.is_some(),
            self.gender != Gender::Unspecified,
            !self.goals.is_empty(),
            self.exercise_frequency.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        present as f64 / Self::EXPECTED_FIELDS as f64
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisGoal {
    VitalSigns,
    SleepPatterns,
    ActivityLevels,
    Nutrition,
    BodyComposition,
    RiskAssessment,
    Recommendations,
    TrendAnalysis,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Quick,
    Daily,
    Comprehensive,
    Weekly,
    Critical,
    UserRequested,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        RequestKind::Quick,
        RequestKind::Daily,
        RequestKind::Comprehensive,
        RequestKind::Weekly,
        RequestKind::Critical,
        RequestKind::UserRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Quick => "quick",
            RequestKind::Daily => "daily",
            RequestKind::Comprehensive => "comprehensive",
            RequestKind::Weekly => "weekly",
            RequestKind::Critical => "critical",
            RequestKind::UserRequested => "user_requested",
        }
    }

    pub fn complexity(&self) -> ComplexityTier {
        match self {
            RequestKind::Quick => ComplexityTier::Low,
            RequestKind::Daily | RequestKind::UserRequested => ComplexityTier::Medium,
            RequestKind::Comprehensive | RequestKind::Weekly | RequestKind::Critical => {
                ComplexityTier::High
            }
        }
    }

    pub fn goals(&self) -> &'static [AnalysisGoal] {
        use AnalysisGoal::*;
        match self {
            RequestKind::Quick => &[VitalSigns],
            RequestKind::Daily => &[VitalSigns, SleepPatterns, ActivityLevels],
            RequestKind::Comprehensive => &[
                VitalSigns,
                SleepPatterns,
                ActivityLevels,
                Nutrition,
                BodyComposition,
                RiskAssessment,
                Recommendations,
                TrendAnalysis,
            ],
            RequestKind::Weekly => &[TrendAnalysis, SleepPatterns, ActivityLevels, Nutrition],
            RequestKind::Critical => &[VitalSigns, RiskAssessment],
            RequestKind::UserRequested => {
                &[VitalSigns, SleepPatterns, ActivityLevels, Recommendations]
            }
        }
    }
}

fn default_language() -> String {
    "en".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub snapshot: HealthSnapshot,
    #[serde(default)]
    pub profile: UserProfile,
    pub kind: RequestKind,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub force_local: bool,
}

impl AnalysisRequest {
    pub fn new(snapshot: HealthSnapshot, profile: UserProfile, kind: RequestKind) -> Self {
        Self {
            snapshot,
            profile,
            kind,
            language: default_language(),
            force_local: false,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn force_local(mut self) -> Self {
        self.force_local = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Findings and insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    RestingHeartRate,
    HeartRateVariability,
    BloodPressure,
    SleepDuration,
    SleepEfficiency,
    SleepStages,
    Steps,
    ExerciseMinutes,
    ActiveCalories,
    Bmi,
    BodyFat,
    Nutrition,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Normal,
    Warning,
    Concerning,
    Excellent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

impl ReferenceRange {
    pub fn new(low: f64, high: f64, unit: &str) -> Self {
        Self {
            low,
            high,
            unit: unit.to_string(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub metric: Metric,
    pub kind: FindingKind,
    pub severity: Severity,
    pub description: String,
    pub value: f64,
    pub reference: ReferenceRange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthCategory {
    Cardiovascular,
    Sleep,
    Activity,
    Metabolic,
}

impl HealthCategory {
    /// Fixed priority order, also used to break score ties.
    pub const PRIORITY_ORDER: [HealthCategory; 4] = [
        HealthCategory::Cardiovascular,
        HealthCategory::Sleep,
        HealthCategory::Activity,
        HealthCategory::Metabolic,
    ];

    pub fn weight(&self) -> f64 {
        match self {
            HealthCategory::Cardiovascular => 0.30,
            HealthCategory::Sleep => 0.25,
            HealthCategory::Activity => 0.25,
            HealthCategory::Metabolic => 0.20,
        }
    }

    pub fn metrics(&self) -> [Metric; 3] {
        match self {
            HealthCategory::Cardiovascular => [
                Metric::RestingHeartRate,
                Metric::HeartRateVariability,
                Metric::BloodPressure,
            ],
            HealthCategory::Sleep => [
                Metric::SleepDuration,
                Metric::SleepEfficiency,
                Metric::SleepStages,
            ],
            HealthCategory::Activity => [
                Metric::Steps,
                Metric::ExerciseMinutes,
                Metric::ActiveCalories,
            ],
            HealthCategory::Metabolic => [Metric::Bmi, Metric::BodyFat, Metric::Nutrition],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Moderate,
    High,
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub category: HealthCategory,
    pub severity: RiskSeverity,
    pub description: String,
    pub remediation: Vec<String>,
    /// Suggested follow-up window in days.
    pub follow_up_days: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "unit", content = "amount", rename_all = "snake_case")]
pub enum TimeHorizon {
    Today,
    Days(u32),
    Weeks(u32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTerm {
    Immediate,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub category: HealthCategory,
    pub term: RecommendationTerm,
    pub priority: PriorityTier,
    pub horizon: TimeHorizon,
    pub title: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryInsight {
    pub category: HealthCategory,
    pub score: f64,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub risk_factors: Vec<RiskFactor>,
    pub trend: Trend,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalInsights {
    pub overall_score: f64,
    pub categories: Vec<CategoryInsight>,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<Recommendation>,
    pub priority_category: HealthCategory,
    pub confidence: f64,
    pub data_completeness: f64,
    pub profile_completeness: f64,
}

impl LocalInsights {
    pub fn category(&self, category: HealthCategory) -> Option<&CategoryInsight> {
        self.categories.iter().find(|insight| insight.category == category)
    }
}

// ---------------------------------------------------------------------------
// Remote AI payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysisRequest {
    pub health_data: HealthSnapshot,
    pub user_profile: UserProfile,
    pub goals: Vec<AnalysisGoal>,
    pub language: String,
}

impl AiAnalysisRequest {
    pub fn from_request(req: &AnalysisRequest) -> Self {
        Self {
            health_data: req.snapshot.clone(),
            user_profile: req.profile.clone(),
            goals: req.kind.goals().to_vec(),
            language: req.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsight {
    #[serde(default)]
    pub category: Option<HealthCategory>,
    pub title: String,
    pub detail: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsights {
    pub summary: String,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub insights: Vec<AiInsight>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickAiInsights {
    pub summary: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiPayload {
    Full(AiInsights),
    Quick(QuickAiInsights),
}

impl AiPayload {
    pub fn score(&self) -> Option<f64> {
        match self {
            AiPayload::Full(insights) => insights.overall_score,
            AiPayload::Quick(quick) => quick.score,
        }
        .map(|score| score.clamp(0.0, 100.0))
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DataComplexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UserEngagement {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TimeSensitivity {
    Routine,
    Moderate,
    Immediate,
    RealTime,
}

/// Normalized routing inputs. Built once per request and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionFactors {
    pub complexity: DataComplexity,
    pub data_complexity: f64,
    pub engagement: UserEngagement,
    pub user_engagement: f64,
    pub sensitivity: TimeSensitivity,
    pub time_sensitivity: f64,
    pub health_criticality: f64,
    pub budget_available: f64,
    pub privacy_required: bool,
    pub offline: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LocalReason {
    UserPreference,
    Offline,
    BudgetConstrained,
    RateLimited,
    BudgetConstraints,
    FastResponseNeeded,
    PrivacyPreferred,
    SimpleMetrics,
    BasicAnalysisOnly,
    QuickCheck,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AiReason {
    CriticalHealth,
    HighComplexity,
    UserPreference,
    ComprehensiveAnalysis,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HybridStrategy {
    LocalFirst,
    AiEnhanced,
    Parallel,
    Sequential,
}

/// How the two halves of a hybrid run are reconciled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CombinationStrategy {
    AiFallbackLocal,
    LocalFallbackAi,
    BestOfBoth,
}

impl HybridStrategy {
    pub fn combination(&self) -> CombinationStrategy {
        match self {
            HybridStrategy::AiEnhanced => CombinationStrategy::AiFallbackLocal,
            HybridStrategy::LocalFirst | HybridStrategy::Sequential => {
                CombinationStrategy::LocalFallbackAi
            }
            HybridStrategy::Parallel => CombinationStrategy::BestOfBoth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum RoutingDecision {
    Local {
        reason: LocalReason,
        confidence: f64,
    },
    Ai {
        reason: AiReason,
        confidence: f64,
        estimated_cost: f64,
        estimated_latency_ms: u64,
    },
    Hybrid {
        strategy: HybridStrategy,
        local_components: Vec<AnalysisGoal>,
        ai_components: Vec<AnalysisGoal>,
        combined_accuracy: f64,
    },
}

impl RoutingDecision {
    pub fn local(reason: LocalReason, confidence: f64) -> Self {
        RoutingDecision::Local { reason, confidence }
    }

    pub fn route_name(&self) -> &'static str {
        match self {
            RoutingDecision::Local { .. } => "local",
            RoutingDecision::Ai { .. } => "ai",
            RoutingDecision::Hybrid { .. } => "hybrid",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, RoutingDecision::Local { .. })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Local,
    Ai,
    Hybrid,
    LocalFallback,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Local => "local",
            AnalysisMethod::Ai => "ai",
            AnalysisMethod::Hybrid => "hybrid",
            AnalysisMethod::LocalFallback => "local_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hour,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    Offline,
    RateLimited {
        window: WindowKind,
        reset_at: DateTime<Utc>,
    },
    BudgetExceeded {
        reset_at: DateTime<Utc>,
    },
    CriticalOnly,
    AiFailed {
        error: String,
        retriable: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceMetrics {
    pub total_ms: u64,
    pub local_ms: Option<u64>,
    pub ai_ms: Option<u64>,
    pub cache_hit: bool,
    pub estimated_cost: f64,
    pub fallback_reason: Option<FallbackReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub id: String,
    pub kind: RequestKind,
    pub method: AnalysisMethod,
    pub local: Option<LocalInsights>,
    pub ai: Option<AiPayload>,
    pub decision: RoutingDecision,
    pub combination: Option<CombinationStrategy>,
    pub overall_score: Option<f64>,
    pub metrics: PerformanceMetrics,
    pub generated_at: DateTime<Utc>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemainingQuota {
    pub per_kind: BTreeMap<RequestKind, u32>,
    pub remaining_budget: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capabilities {
    pub ai_available: bool,
    pub local_available: bool,
    pub hybrid_available: bool,
    pub remaining_quota: RemainingQuota,
    pub next_reset_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AnalysisPhase {
    CacheChecked { hit: bool },
    Deciding,
    Executing { path: AnalysisMethod },
    FallingBack { reason: FallbackReason },
    Caching,
    Completed { method: AnalysisMethod },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub request_id: String,
    pub kind: RequestKind,
    #[serde(flatten)]
    pub phase: AnalysisPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_hit_ratio: f32,
    pub ai_fallbacks: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_method: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrchestratorStatus {
    pub in_flight: usize,
    pub last_result_id: Option<String>,
    pub history_len: usize,
}
