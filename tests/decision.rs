mod common;

use common::{active_profile, at, full_snapshot, partial_snapshot, steps_only};
use health_router::decision::{compute_factors, health_criticality, DecisionContext, DecisionEngine};
use health_router::types::*;

fn ctx(budget_available: f64, offline: bool) -> DecisionContext {
    DecisionContext {
        budget_available,
        offline,
        estimated_cost: 0.05,
        estimated_latency_ms: 1_500,
    }
}

fn request(snapshot: HealthSnapshot, kind: RequestKind) -> AnalysisRequest {
    AnalysisRequest::new(snapshot, active_profile(), kind)
}

#[test]
fn force_local_always_wins() {
    let engine = DecisionEngine::new();
    let now = at(2026, 3, 10, 8, 0);
    for kind in RequestKind::ALL {
        for (budget, offline) in [(1.0, false), (0.0, false), (1.0, true)] {
            let req = request(full_snapshot(now), kind).force_local();
            let decision = engine.decide(&req, &ctx(budget, offline));
            assert_eq!(
                decision,
                RoutingDecision::Local {
                    reason: LocalReason::UserPreference,
                    confidence: 1.0,
                }
            );
        }
    }
}

#[test]
fn offline_or_exhausted_budget_routes_local() {
    let engine = DecisionEngine::new();
    let req = request(full_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Critical);

    match engine.decide(&req, &ctx(1.0, true)) {
        RoutingDecision::Local { reason, .. } => assert_eq!(reason, LocalReason::Offline),
        other => panic!("expected local, got {other:?}"),
    }
    match engine.decide(&req, &ctx(0.05, false)) {
        RoutingDecision::Local { reason, .. } => {
            assert_eq!(reason, LocalReason::BudgetConstrained)
        }
        other => panic!("expected local, got {other:?}"),
    }
}

#[test]
fn critical_requests_route_to_ai() {
    let engine = DecisionEngine::new();
    let req = request(full_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Critical);
    match engine.decide(&req, &ctx(1.0, false)) {
        RoutingDecision::Ai {
            reason,
            confidence,
            estimated_cost,
            estimated_latency_ms,
        } => {
            assert_eq!(reason, AiReason::CriticalHealth);
            assert!(confidence >= 0.7);
            assert_eq!(estimated_cost, 0.05);
            assert_eq!(estimated_latency_ms, 1_500);
        }
        other => panic!("expected ai, got {other:?}"),
    }
}

#[test]
fn rich_daily_data_goes_hybrid_ai_enhanced() {
    let engine = DecisionEngine::new();
    let req = request(full_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Daily);
    match engine.decide(&req, &ctx(1.0, false)) {
        RoutingDecision::Hybrid {
            strategy,
            local_components,
            ai_components,
            combined_accuracy,
        } => {
            assert_eq!(strategy, HybridStrategy::AiEnhanced);
            assert!(!local_components.is_empty());
            assert!(ai_components.contains(&AnalysisGoal::Recommendations));
            assert!(combined_accuracy <= 0.95);
        }
        other => panic!("expected hybrid, got {other:?}"),
    }
}

#[test]
fn hybrid_strategy_depends_on_budget() {
    let engine = DecisionEngine::new();
    let req = request(partial_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Daily);
    let strategy = |budget| match engine.decide(&req, &ctx(budget, false)) {
        RoutingDecision::Hybrid { strategy, .. } => strategy,
        other => panic!("expected hybrid, got {other:?}"),
    };
    assert_eq!(strategy(1.0), HybridStrategy::Parallel);
    assert_eq!(strategy(0.5), HybridStrategy::Sequential);
}

#[test]
fn sparse_quick_checks_stay_local() {
    let engine = DecisionEngine::new();
    let req = AnalysisRequest::new(
        steps_only(at(2026, 3, 10, 8, 0), 8_000.0),
        UserProfile::default(),
        RequestKind::Quick,
    );
    match engine.decide(&req, &ctx(1.0, false)) {
        RoutingDecision::Local { reason, confidence } => {
            assert_eq!(reason, LocalReason::FastResponseNeeded);
            assert_eq!(confidence, 1.0);
        }
        other => panic!("expected local, got {other:?}"),
    }
}

#[test]
fn strict_privacy_halves_the_ai_score() {
    let engine = DecisionEngine::new();
    let mut req = request(full_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Daily);
    let open = engine.scores(&compute_factors(&req, &ctx(1.0, false)));
    req.profile.privacy = PrivacyLevel::Strict;
    let strict = engine.scores(&compute_factors(&req, &ctx(1.0, false)));
    assert!((strict.ai - open.ai / 2.0).abs() < 1e-9);
    assert!(strict.local >= open.local);
    assert!(engine.decide(&req, &ctx(1.0, false)).is_local());
}

#[test]
fn factors_are_normalized() {
    let req = request(full_snapshot(at(2026, 3, 10, 8, 0)), RequestKind::Comprehensive);
    let factors = compute_factors(&req, &ctx(3.0, false));
    assert_eq!(factors.budget_available, 1.0);
    for value in [
        factors.data_complexity,
        factors.user_engagement,
        factors.time_sensitivity,
        factors.health_criticality,
    ] {
        assert!((0.0..=1.0).contains(&value));
    }
    assert_eq!(factors.complexity, DataComplexity::VeryComplex);
}

#[test]
fn dangerous_vitals_raise_criticality() {
    let now = at(2026, 3, 10, 8, 0);
    let calm = request(full_snapshot(now), RequestKind::Daily);
    assert_eq!(health_criticality(&calm), 0.0);

    let mut crisis = full_snapshot(now);
    crisis.vitals.systolic_bp = Some(190.0);
    assert_eq!(health_criticality(&request(crisis, RequestKind::Daily)), 1.0);

    let mut low_oxygen = full_snapshot(now);
    low_oxygen.vitals.oxygen_saturation = Some(92.0);
    assert!(health_criticality(&request(low_oxygen, RequestKind::Daily)) >= 0.6);
}
