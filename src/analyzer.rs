//! Rule-based local analysis built on the guideline evaluators.

use crate::guidelines::{self, Evaluation, NutritionInput, DEFAULT_AGE};
use crate::types::*;

/// Category score reported when none of a category's metrics were measured.
pub const NEUTRAL_CATEGORY_SCORE: f64 = 70.0;

/// Score delta below which a category trend counts as stable.
const TREND_TOLERANCE: f64 = 5.0;

const SHORT_TERM_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Default)]
pub struct LocalAnalyzer;

impl LocalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze one snapshot. `previous` is the last local result, if any, and
    /// only feeds the per-category trend.
    pub fn analyze(
        &self,
        snapshot: &HealthSnapshot,
        profile: &UserProfile,
        previous: Option<&LocalInsights>,
    ) -> LocalInsights {
        let age = profile.age.unwrap_or(DEFAULT_AGE);
        let gender = profile.gender;

        let evaluations = evaluate_all(snapshot, age, gender);
        let risk_factors = assess_risks(snapshot, age, gender);

        let mut categories: Vec<CategoryInsight> = HealthCategory::PRIORITY_ORDER
            .iter()
            .map(|category| {
                let parts: Vec<&Evaluation> = evaluations
                    .iter()
                    .filter(|(metric_category, _)| metric_category == category)
                    .map(|(_, evaluation)| evaluation)
                    .collect();
                fold_category(*category, &parts, previous)
            })
            .collect();

        let priority_category = priority_category(&categories);
        let recommendations = build_recommendations(&categories, priority_category, &risk_factors);

        for insight in categories.iter_mut() {
            insight.recommendations = recommendations
                .iter()
                .filter(|rec| rec.category == insight.category)
                .cloned()
                .collect();
            insight.risk_factors = risk_factors
                .iter()
                .filter(|risk| risk.category == insight.category)
                .cloned()
                .collect();
        }

        let data_completeness = snapshot.data_completeness();
        let profile_completeness = profile.completeness();

        LocalInsights {
            overall_score: overall_score(&categories),
            categories,
            risk_factors,
            recommendations,
            priority_category,
            confidence: (data_completeness + profile_completeness) / 2.0,
            data_completeness,
            profile_completeness,
        }
    }
}

/// Fixed convex combination of the four category scores.
pub fn overall_score(categories: &[CategoryInsight]) -> f64 {
    categories
        .iter()
        .map(|insight| insight.category.weight() * insight.score)
        .sum::<f64>()
        .clamp(0.0, 100.0)
}

fn evaluate_all(
    snapshot: &HealthSnapshot,
    age: u32,
    gender: Gender,
) -> Vec<(HealthCategory, Evaluation)> {
    let vitals = &snapshot.vitals;
    let sleep = &snapshot.sleep;
    let activity = &snapshot.activity;
    let nutrition = &snapshot.nutrition;
    vec![
        (
            HealthCategory::Cardiovascular,
            guidelines::resting_heart_rate(vitals.resting_heart_rate, age, gender),
        ),
        (
            HealthCategory::Cardiovascular,
            guidelines::heart_rate_variability(vitals.heart_rate_variability, age, gender),
        ),
        (
            HealthCategory::Cardiovascular,
            guidelines::blood_pressure(vitals.systolic_bp, vitals.diastolic_bp, age),
        ),
        (
            HealthCategory::Sleep,
            guidelines::sleep_duration(sleep.duration_hours, age),
        ),
        (
            HealthCategory::Sleep,
            guidelines::sleep_efficiency(sleep.efficiency),
        ),
        (
            HealthCategory::Sleep,
            guidelines::sleep_stages(sleep.deep_sleep_pct, sleep.rem_sleep_pct, age),
        ),
        (
            HealthCategory::Activity,
            guidelines::step_count(activity.steps, age),
        ),
        (
            HealthCategory::Activity,
            guidelines::exercise_minutes(activity.exercise_minutes, age),
        ),
        (
            HealthCategory::Activity,
            guidelines::caloric_expenditure(activity.active_calories, age, gender),
        ),
        (
            HealthCategory::Metabolic,
            guidelines::bmi(snapshot.bmi(), age),
        ),
        (
            HealthCategory::Metabolic,
            guidelines::body_fat(snapshot.body.body_fat_pct, age, gender),
        ),
        (
            HealthCategory::Metabolic,
            guidelines::nutrition(NutritionInput {
                sodium_mg: nutrition.sodium_mg,
                fiber_g: nutrition.fiber_g,
                sugar_g: nutrition.sugar_g,
                water_liters: nutrition.water_liters,
            }),
        ),
    ]
}

/// Minimum-score fold: one severe finding caps the whole category.
fn fold_category(
    category: HealthCategory,
    parts: &[&Evaluation],
    previous: Option<&LocalInsights>,
) -> CategoryInsight {
    let assessed: Vec<&&Evaluation> = parts.iter().filter(|e| !e.is_absent()).collect();
    let score = if assessed.is_empty() {
        NEUTRAL_CATEGORY_SCORE
    } else {
        assessed
            .iter()
            .map(|e| e.score)
            .fold(f64::INFINITY, f64::min)
            .clamp(0.0, 100.0)
    };
    let findings = assessed
        .iter()
        .flat_map(|e| e.findings.iter().cloned())
        .collect();
    let trend = previous
        .and_then(|prev| prev.category(category))
        .map(|prev| trend_between(prev.score, score))
        .unwrap_or(Trend::Unknown);

    CategoryInsight {
        category,
        score,
        findings,
        recommendations: Vec::new(),
        risk_factors: Vec::new(),
        trend,
        confidence: assessed.len() as f64 / category.metrics().len() as f64,
    }
}

fn trend_between(previous: f64, current: f64) -> Trend {
    let delta = current - previous;
    if delta.abs() <= TREND_TOLERANCE {
        Trend::Stable
    } else if delta > 0.0 {
        Trend::Improving
    } else {
        Trend::Declining
    }
}

fn is_measured(insight: &CategoryInsight) -> bool {
    insight.confidence > 0.0
}

/// Lowest-scoring measured category; ties resolve in
/// [`HealthCategory::PRIORITY_ORDER`]. With nothing measured the first
/// category in that order wins.
pub fn priority_category(categories: &[CategoryInsight]) -> HealthCategory {
    let any_measured = categories.iter().any(is_measured);
    let mut best: Option<&CategoryInsight> = None;
    for category in HealthCategory::PRIORITY_ORDER {
        if let Some(insight) = categories
            .iter()
            .find(|c| c.category == category && (!any_measured || is_measured(c)))
        {
            match best {
                Some(current) if current.score <= insight.score => {}
                _ => best = Some(insight),
            }
        }
    }
    best.map(|insight| insight.category)
        .unwrap_or(HealthCategory::Cardiovascular)
}

/// Cross-metric risk patterns.
pub fn assess_risks(snapshot: &HealthSnapshot, age: u32, gender: Gender) -> Vec<RiskFactor> {
    let mut risks = Vec::new();

    let rhr_range = guidelines::resting_hr_range(age, gender);
    let step_ratio = snapshot
        .activity
        .steps
        .map(|steps| steps / guidelines::step_target(age));
    let exercise_low = snapshot
        .activity
        .exercise_minutes
        .map(|minutes| minutes < guidelines::thresholds::DAILY_EXERCISE_MINUTES * 0.5);
    let low_activity = step_ratio.map(|ratio| ratio < 0.7).unwrap_or(false)
        || exercise_low.unwrap_or(false);

    if let Some(rhr) = snapshot.vitals.resting_heart_rate {
        if rhr > rhr_range.high && low_activity {
            let severe = rhr > guidelines::thresholds::RHR_TACHYCARDIA_BPM
                && step_ratio.map(|ratio| ratio < 0.5).unwrap_or(false);
            risks.push(RiskFactor {
                category: HealthCategory::Cardiovascular,
                severity: if severe {
                    RiskSeverity::Severe
                } else {
                    RiskSeverity::High
                },
                description: format!(
                    "Elevated resting heart rate ({rhr:.0} bpm) combined with low daily activity"
                ),
                remediation: vec![
                    "Add a 20 minute brisk walk on at least five days this week".into(),
                    "Track resting heart rate each morning before getting up".into(),
                    "Discuss persistent readings above 100 bpm with a clinician".into(),
                ],
                follow_up_days: if severe { 7 } else { 14 },
            });
        }
    }

    let (systolic, diastolic) = (snapshot.vitals.systolic_bp, snapshot.vitals.diastolic_bp);
    let crisis = systolic.map(|s| s > guidelines::thresholds::SYSTOLIC_CRISIS).unwrap_or(false)
        || diastolic.map(|d| d > guidelines::thresholds::DIASTOLIC_CRISIS).unwrap_or(false);
    let stage2 = systolic.map(|s| s >= guidelines::thresholds::SYSTOLIC_STAGE2).unwrap_or(false)
        || diastolic.map(|d| d >= guidelines::thresholds::DIASTOLIC_STAGE2).unwrap_or(false);
    if crisis || stage2 {
        risks.push(RiskFactor {
            category: HealthCategory::Cardiovascular,
            severity: if crisis {
                RiskSeverity::Severe
            } else {
                RiskSeverity::High
            },
            description: "Blood pressure in the hypertensive range".into(),
            remediation: vec![
                "Re-measure seated after five minutes of rest".into(),
                "Limit sodium and alcohol intake".into(),
                "Arrange a blood pressure review with a clinician".into(),
            ],
            follow_up_days: if crisis { 1 } else { 7 },
        });
    }

    if let Some(bmi) = snapshot.bmi() {
        if bmi >= guidelines::thresholds::BMI_OBESE {
            let severe = bmi >= guidelines::thresholds::BMI_SEVERELY_OBESE;
            risks.push(RiskFactor {
                category: HealthCategory::Metabolic,
                severity: if severe {
                    RiskSeverity::Severe
                } else {
                    RiskSeverity::High
                },
                description: format!("BMI of {bmi:.1} is associated with elevated metabolic risk"),
                remediation: vec![
                    "Aim for a gradual loss of 0.5 kg per week".into(),
                    "Replace sugary drinks with water".into(),
                    "Ask about a metabolic panel at your next check-up".into(),
                ],
                follow_up_days: 30,
            });

            if let Some(sodium) = snapshot.nutrition.sodium_mg {
                if sodium > guidelines::thresholds::SODIUM_LIMIT_MG {
                    risks.push(RiskFactor {
                        category: HealthCategory::Metabolic,
                        severity: if severe {
                            RiskSeverity::Severe
                        } else {
                            RiskSeverity::High
                        },
                        description: format!(
                            "High sodium intake ({sodium:.0} mg) alongside a BMI of {bmi:.1}"
                        ),
                        remediation: vec![
                            "Keep sodium under 2,300 mg per day".into(),
                            "Choose fresh over processed foods".into(),
                            "Monitor blood pressure weekly".into(),
                        ],
                        follow_up_days: 21,
                    });
                }
            }
        }
    }

    if let Some(hours) = snapshot.sleep.duration_hours {
        if hours < guidelines::thresholds::SLEEP_DEPRIVATION_HOURS {
            risks.push(RiskFactor {
                category: HealthCategory::Sleep,
                severity: if hours < 5.0 {
                    RiskSeverity::High
                } else {
                    RiskSeverity::Moderate
                },
                description: format!("Chronic sleep deprivation ({hours:.1} hours per night)"),
                remediation: vec![
                    "Set a fixed bedtime that allows at least seven hours".into(),
                    "Avoid screens for an hour before bed".into(),
                    "Cut caffeine after early afternoon".into(),
                ],
                follow_up_days: 14,
            });
        }
    }

    let hrv_low = snapshot
        .vitals
        .heart_rate_variability
        .map(|hrv| hrv < guidelines::expected_hrv(age) * 0.7)
        .unwrap_or(false);
    let sleep_poor = snapshot
        .sleep
        .efficiency
        .map(|eff| eff < 75.0)
        .unwrap_or(false);
    if hrv_low && sleep_poor {
        risks.push(RiskFactor {
            category: HealthCategory::Sleep,
            severity: RiskSeverity::Moderate,
            description: "Low HRV with poor sleep efficiency suggests incomplete recovery".into(),
            remediation: vec![
                "Schedule two lighter training days this week".into(),
                "Practice ten minutes of slow breathing before sleep".into(),
            ],
            follow_up_days: 10,
        });
    }

    risks
}

fn score_priority(score: f64) -> PriorityTier {
    if score < 50.0 {
        PriorityTier::High
    } else if score < 70.0 {
        PriorityTier::Medium
    } else {
        PriorityTier::Low
    }
}

fn risk_priority(severity: RiskSeverity) -> PriorityTier {
    match severity {
        RiskSeverity::Severe => PriorityTier::Urgent,
        RiskSeverity::High => PriorityTier::High,
        RiskSeverity::Moderate => PriorityTier::Medium,
        RiskSeverity::Low => PriorityTier::Low,
    }
}

fn immediate_steps(category: HealthCategory) -> (String, Vec<String>) {
    match category {
        HealthCategory::Cardiovascular => (
            "Give your heart an easy day".into(),
            vec![
                "Take a 10 minute walk after your next meal".into(),
                "Drink water instead of caffeinated drinks today".into(),
                "Spend five minutes on slow, deep breathing".into(),
            ],
        ),
        HealthCategory::Sleep => (
            "Protect tonight's sleep".into(),
            vec![
                "Go to bed 30 minutes earlier tonight".into(),
                "Keep the bedroom dark and cool".into(),
                "Skip caffeine for the rest of the day".into(),
            ],
        ),
        HealthCategory::Activity => (
            "Move more today".into(),
            vec![
                "Add a 15 minute walk before the end of the day".into(),
                "Stand up and move for two minutes every hour".into(),
            ],
        ),
        HealthCategory::Metabolic => (
            "Make one better food choice today".into(),
            vec![
                "Fill half of your next plate with vegetables".into(),
                "Swap one processed snack for fruit or nuts".into(),
                "Drink a glass of water before each meal".into(),
            ],
        ),
    }
}

fn short_term_steps(category: HealthCategory) -> (String, Vec<String>) {
    match category {
        HealthCategory::Cardiovascular => (
            "Build a steady cardio routine".into(),
            vec![
                "Schedule three 30 minute moderate sessions this week".into(),
                "Log resting heart rate every morning".into(),
            ],
        ),
        HealthCategory::Sleep => (
            "Stabilize your sleep schedule".into(),
            vec![
                "Keep the same wake time every day, weekends included".into(),
                "Start a 30 minute wind-down routine".into(),
            ],
        ),
        HealthCategory::Activity => (
            "Raise your daily activity baseline".into(),
            vec![
                "Add 1,000 steps to your daily average each week".into(),
                "Book two strength sessions this week".into(),
            ],
        ),
        HealthCategory::Metabolic => (
            "Rebalance your weekly nutrition".into(),
            vec![
                "Plan meals for the week ahead".into(),
                "Keep sodium under 2,300 mg per day".into(),
                "Reach 25 g of fiber on most days".into(),
            ],
        ),
    }
}

/// Immediate action for the priority category, short-term plans for weak
/// measured categories, and one long-term item per active risk factor.
pub fn build_recommendations(
    categories: &[CategoryInsight],
    priority: HealthCategory,
    risks: &[RiskFactor],
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if let Some(insight) = categories.iter().find(|c| c.category == priority) {
        let (title, steps) = immediate_steps(priority);
        out.push(Recommendation {
            category: priority,
            term: RecommendationTerm::Immediate,
            priority: score_priority(insight.score),
            horizon: TimeHorizon::Today,
            title,
            steps,
        });
    }

    for category in HealthCategory::PRIORITY_ORDER {
        let Some(insight) = categories.iter().find(|c| c.category == category) else {
            continue;
        };
        if is_measured(insight) && insight.score < SHORT_TERM_THRESHOLD {
            let (title, steps) = short_term_steps(category);
            out.push(Recommendation {
                category,
                term: RecommendationTerm::ShortTerm,
                priority: score_priority(insight.score),
                horizon: TimeHorizon::Weeks(2),
                title,
                steps,
            });
        }
    }

    for risk in risks {
        out.push(Recommendation {
            category: risk.category,
            term: RecommendationTerm::LongTerm,
            priority: risk_priority(risk.severity),
            horizon: TimeHorizon::Days(risk.follow_up_days),
            title: format!("Address: {}", risk.description),
            steps: risk.remediation.clone(),
        });
    }

    out
}
