mod common;

use common::{active_profile, at, full_snapshot, steps_only};
use health_router::analyzer::{LocalAnalyzer, NEUTRAL_CATEGORY_SCORE};
use health_router::types::*;

fn score_of(insights: &LocalInsights, category: HealthCategory) -> f64 {
    insights.category(category).unwrap().score
}

#[test]
fn overall_score_is_the_fixed_weighted_combination() {
    let mut snapshot = full_snapshot(at(2026, 3, 10, 8, 0));
    snapshot.vitals.resting_heart_rate = Some(95.0);
    snapshot.sleep.duration_hours = Some(6.5);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &active_profile(), None);

    let expected = 0.30 * score_of(&insights, HealthCategory::Cardiovascular)
        + 0.25 * score_of(&insights, HealthCategory::Sleep)
        + 0.25 * score_of(&insights, HealthCategory::Activity)
        + 0.20 * score_of(&insights, HealthCategory::Metabolic);
    assert!((insights.overall_score - expected).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&insights.overall_score));
}

#[test]
fn one_bad_reading_caps_the_category() {
    let mut snapshot = full_snapshot(at(2026, 3, 10, 8, 0));
    snapshot.vitals.resting_heart_rate = Some(95.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &active_profile(), None);
    let cardio = insights.category(HealthCategory::Cardiovascular).unwrap();
    assert_eq!(cardio.score, 65.0);
    assert_eq!(cardio.findings.len(), 3);
    assert_eq!(cardio.confidence, 1.0);
}

#[test]
fn unmeasured_categories_are_neutral() {
    let snapshot = steps_only(at(2026, 3, 10, 8, 0), 12_500.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    let sleep = insights.category(HealthCategory::Sleep).unwrap();
    assert_eq!(sleep.score, NEUTRAL_CATEGORY_SCORE);
    assert!(sleep.findings.is_empty());
    assert_eq!(sleep.confidence, 0.0);
    assert_eq!(score_of(&insights, HealthCategory::Activity), 100.0);
}

#[test]
fn unmeasured_categories_do_not_drive_recommendations() {
    let snapshot = steps_only(at(2026, 3, 10, 8, 0), 12_500.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    assert_eq!(insights.priority_category, HealthCategory::Activity);
    assert_eq!(score_of(&insights, HealthCategory::Activity), 100.0);

    let immediate: Vec<_> = insights
        .recommendations
        .iter()
        .filter(|rec| rec.term == RecommendationTerm::Immediate)
        .collect();
    assert_eq!(immediate.len(), 1);
    assert_eq!(immediate[0].category, HealthCategory::Activity);
    assert_eq!(immediate[0].horizon, TimeHorizon::Today);
    assert!(insights
        .recommendations
        .iter()
        .all(|rec| rec.term != RecommendationTerm::ShortTerm));
}

#[test]
fn priority_falls_back_to_category_order_without_data() {
    let snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    assert_eq!(insights.priority_category, HealthCategory::Cardiovascular);
    assert!(insights
        .recommendations
        .iter()
        .all(|rec| rec.term != RecommendationTerm::ShortTerm));
}

#[test]
fn lowest_category_becomes_priority() {
    let mut snapshot = full_snapshot(at(2026, 3, 10, 8, 0));
    snapshot.activity.steps = Some(2_000.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &active_profile(), None);
    assert_eq!(insights.priority_category, HealthCategory::Activity);
    assert!(insights.recommendations.iter().any(|rec| {
        rec.category == HealthCategory::Activity
            && rec.term == RecommendationTerm::ShortTerm
            && rec.horizon == TimeHorizon::Weeks(2)
    }));
}

#[test]
fn urgent_priority_only_comes_from_severe_risks() {
    let mut snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    snapshot.body.bmi = Some(32.0);
    let profile = UserProfile {
        age: Some(45),
        ..UserProfile::default()
    };
    let high = LocalAnalyzer::new().analyze(&snapshot, &profile, None);
    assert!(high
        .recommendations
        .iter()
        .all(|rec| rec.priority != PriorityTier::Urgent));

    snapshot.body.bmi = Some(42.0);
    let severe = LocalAnalyzer::new().analyze(&snapshot, &profile, None);
    let urgent: Vec<_> = severe
        .recommendations
        .iter()
        .filter(|rec| rec.priority == PriorityTier::Urgent)
        .collect();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].term, RecommendationTerm::LongTerm);
    assert_eq!(urgent[0].horizon, TimeHorizon::Days(30));
}

#[test]
fn obesity_with_high_sodium_adds_a_second_risk() {
    let mut snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    snapshot.body.bmi = Some(33.0);
    snapshot.nutrition.sodium_mg = Some(3_000.0);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    let metabolic_risks = insights
        .risk_factors
        .iter()
        .filter(|risk| risk.category == HealthCategory::Metabolic)
        .count();
    assert_eq!(metabolic_risks, 2);
    let long_term = insights
        .recommendations
        .iter()
        .filter(|rec| rec.term == RecommendationTerm::LongTerm)
        .count();
    assert_eq!(long_term, insights.risk_factors.len());
}

#[test]
fn elevated_heart_rate_with_low_activity_is_a_risk() {
    let mut snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    snapshot.vitals.resting_heart_rate = Some(92.0);
    snapshot.activity.steps = Some(4_000.0);
    let profile = UserProfile {
        age: Some(40),
        gender: Gender::Male,
        ..UserProfile::default()
    };
    let insights = LocalAnalyzer::new().analyze(&snapshot, &profile, None);
    let risk = insights
        .risk_factors
        .iter()
        .find(|risk| risk.category == HealthCategory::Cardiovascular)
        .expect("cardiovascular risk");
    assert_eq!(risk.severity, RiskSeverity::High);
    assert!(!risk.remediation.is_empty());
}

#[test]
fn short_sleep_is_flagged_as_deprivation() {
    let mut snapshot = HealthSnapshot::empty(at(2026, 3, 10, 8, 0));
    snapshot.sleep.duration_hours = Some(5.5);
    let insights = LocalAnalyzer::new().analyze(&snapshot, &UserProfile::default(), None);
    let risk = insights
        .risk_factors
        .iter()
        .find(|risk| risk.category == HealthCategory::Sleep)
        .expect("sleep risk");
    assert_eq!(risk.severity, RiskSeverity::Moderate);
}

#[test]
fn confidence_averages_data_and_profile_completeness() {
    let snapshot = steps_only(at(2026, 3, 10, 8, 0), 9_000.0);
    let profile = UserProfile {
        age: Some(30),
        gender: Gender::Female,
        ..UserProfile::default()
    };
    let insights = LocalAnalyzer::new().analyze(&snapshot, &profile, None);
    assert!((insights.data_completeness - 1.0 / 12.0).abs() < 1e-9);
    assert_eq!(insights.profile_completeness, 0.5);
    let expected = (1.0 / 12.0 + 0.5) / 2.0;
    assert!((insights.confidence - expected).abs() < 1e-9);
}

#[test]
fn trend_compares_against_previous_result() {
    let analyzer = LocalAnalyzer::new();
    let profile = active_profile();

    let mut before = full_snapshot(at(2026, 3, 9, 8, 0));
    before.activity.steps = Some(3_000.0);
    let previous = analyzer.analyze(&before, &profile, None);
    assert!(previous
        .categories
        .iter()
        .all(|category| category.trend == Trend::Unknown));

    let after = full_snapshot(at(2026, 3, 10, 8, 0));
    let current = analyzer.analyze(&after, &profile, Some(&previous));
    let activity = current.category(HealthCategory::Activity).unwrap();
    assert_eq!(activity.trend, Trend::Improving);
    let sleep = current.category(HealthCategory::Sleep).unwrap();
    assert_eq!(sleep.trend, Trend::Stable);
}
