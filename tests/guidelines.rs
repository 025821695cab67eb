mod common;

use common::{at, steps_only};
use health_router::analyzer::LocalAnalyzer;
use health_router::guidelines::{self, NutritionInput};
use health_router::types::*;

#[test]
fn elevated_resting_heart_rate_is_a_warning_for_a_forty_year_old_man() {
    let eval = guidelines::resting_heart_rate(Some(95.0), 40, Gender::Male);
    assert_eq!(eval.findings.len(), 1);
    assert_eq!(eval.findings[0].kind, FindingKind::Warning);
    assert!(eval.score <= 70.0, "score was {}", eval.score);
    assert!(eval.findings[0].value > eval.findings[0].reference.high);
}

#[test]
fn resting_heart_rate_ceiling_narrows_with_age() {
    let young = guidelines::resting_hr_range(30, Gender::Male);
    let older = guidelines::resting_hr_range(70, Gender::Male);
    let female = guidelines::resting_hr_range(30, Gender::Female);
    assert!(older.high < young.high);
    assert!(female.high > young.high);
    assert_eq!(young.low, older.low);
}

#[test]
fn three_thousand_steps_is_concerning_at_thirty() {
    let eval = guidelines::step_count(Some(3_000.0), 30);
    assert_eq!(eval.findings[0].kind, FindingKind::Concerning);
    assert_eq!(eval.score, 50.0);
}

#[test]
fn step_target_steps_down_with_age() {
    assert_eq!(guidelines::step_target(30), 10_000.0);
    assert_eq!(guidelines::step_target(50), 8_000.0);
    assert_eq!(guidelines::step_target(65), 7_000.0);

    // 7,500 steps misses the 10k target but clears the 65+ one.
    let young = guidelines::step_count(Some(7_500.0), 30);
    let senior = guidelines::step_count(Some(7_500.0), 70);
    assert_eq!(young.findings[0].kind, FindingKind::Warning);
    assert_eq!(senior.findings[0].kind, FindingKind::Normal);
}

#[test]
fn obese_bmi_is_concerning_and_raises_a_high_risk() {
    let eval = guidelines::bmi(Some(32.0), 45);
    assert_eq!(eval.findings[0].kind, FindingKind::Concerning);
    assert_eq!(eval.score, 50.0);

    let mut snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    snapshot.body.bmi = Some(32.0);
    let profile = UserProfile {
        age: Some(45),
        ..UserProfile::default()
    };
    let insights = LocalAnalyzer::new().analyze(&snapshot, &profile, None);
    let metabolic = insights.category(HealthCategory::Metabolic).unwrap();
    assert_eq!(metabolic.score, 50.0);
    assert!(insights
        .risk_factors
        .iter()
        .any(|risk| risk.category == HealthCategory::Metabolic
            && risk.severity == RiskSeverity::High));
}

#[test]
fn absent_metrics_produce_no_findings() {
    let evaluations = [
        guidelines::resting_heart_rate(None, 40, Gender::Female),
        guidelines::heart_rate_variability(None, 40, Gender::Female),
        guidelines::blood_pressure(None, None, 40),
        guidelines::sleep_duration(None, 40),
        guidelines::sleep_efficiency(None),
        guidelines::sleep_stages(None, None, 40),
        guidelines::step_count(None, 40),
        guidelines::exercise_minutes(None, 40),
        guidelines::caloric_expenditure(None, 40, Gender::Female),
        guidelines::bmi(None, 40),
        guidelines::body_fat(None, 40, Gender::Female),
        guidelines::nutrition(NutritionInput::default()),
    ];
    for eval in evaluations {
        assert!(eval.is_absent());
        assert_eq!(eval.score, guidelines::ABSENT_SCORE);
    }
}

#[test]
fn blood_pressure_bands() {
    let normal = guidelines::blood_pressure(Some(115.0), Some(75.0), 40);
    let stage2 = guidelines::blood_pressure(Some(145.0), Some(85.0), 40);
    let crisis = guidelines::blood_pressure(Some(185.0), Some(100.0), 40);
    assert_eq!(normal.findings[0].kind, FindingKind::Normal);
    assert_eq!(stage2.findings[0].kind, FindingKind::Concerning);
    assert!(crisis.score < stage2.score);

    // Older adults get headroom before stage 1.
    let borderline_young = guidelines::blood_pressure(Some(132.0), Some(75.0), 40);
    let borderline_old = guidelines::blood_pressure(Some(132.0), Some(75.0), 70);
    assert_eq!(borderline_young.findings[0].kind, FindingKind::Warning);
    assert!(borderline_old.score > borderline_young.score);
}

#[test]
fn short_sleep_below_six_hours_is_concerning() {
    let eval = guidelines::sleep_duration(Some(5.5), 35);
    assert_eq!(eval.findings[0].kind, FindingKind::Concerning);
    assert_eq!(eval.score, 50.0);

    let fine = guidelines::sleep_duration(Some(8.0), 35);
    assert_eq!(fine.findings[0].kind, FindingKind::Normal);
}

#[test]
fn nutrition_takes_the_worst_nutrient() {
    let eval = guidelines::nutrition(NutritionInput {
        sodium_mg: Some(4_000.0),
        fiber_g: Some(30.0),
        sugar_g: Some(20.0),
        water_liters: Some(2.0),
    });
    assert_eq!(eval.findings.len(), 4);
    assert_eq!(eval.score, 50.0);
}

#[test]
fn scores_stay_within_bounds_for_extreme_inputs() {
    let snapshot = steps_only(at(2026, 3, 10, 8, 0), 250_000.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    for category in &insights.categories {
        assert!((0.0..=100.0).contains(&category.score));
    }
    assert!((0.0..=100.0).contains(&insights.overall_score));
}
