//! Merge behavior of the aggregation engine on realistic per-provider results.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::fixtures::{gcp_costs, gcp_resources};
use opsyield::assert_float_eq;
use opsyield::core::models::{
    AnalysisResult, Confidence, CostDriver, DailyTrendPoint, HighCostResource, ResultKind,
};
use opsyield::core::orchestrator::{MAX_HIGH_COST, build_result};
use opsyield::core::AggregationEngine;
use opsyield::core::aggregation::MAX_MERGED_COST_DRIVERS;
use opsyield::test_utils::{make_test_cost, make_test_resource_with, make_test_result};

fn engine() -> AggregationEngine {
    AggregationEngine::new()
}

fn gcp_result() -> Arc<AnalysisResult> {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap();
    Arc::new(build_result("gcp", 30, &gcp_costs(), gcp_resources(), now))
}

fn aws_result(total: f64, risk: f64) -> Arc<AnalysisResult> {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap();
    let costs = vec![make_test_cost("aws", "AmazonEC2", total, "2026-03-02")];
    let resources = vec![make_test_resource_with("i-0abc", "aws", "running", 20.0)];
    let mut result = build_result("aws", 30, &costs, resources, now);
    result.executive_summary.risk_score = Some(risk);
    Arc::new(result)
}

#[test]
fn no_inputs_give_canonical_empty() {
    let merged = engine().merge(&[]);
    assert_eq!(merged.meta.provider, "none");
    assert_eq!(merged.meta.kind, ResultKind::Empty);
    assert_float_eq!(merged.summary.total_cost, 0.0);
    assert_eq!(merged.summary.currency, "USD");
    assert!(merged.resources.is_empty());
    assert!(merged.forecast.is_none());
}

#[test]
fn one_input_is_returned_untouched() {
    let only = gcp_result();
    let merged = engine().merge(std::slice::from_ref(&only));
    assert!(Arc::ptr_eq(&only, &merged));
    assert_eq!(merged.meta.kind, ResultKind::Single);
}

#[test]
fn totals_add_across_providers() {
    let a = Arc::new(make_test_result("gcp", 100.0));
    let b = Arc::new(make_test_result("aws", 200.0));
    let merged = engine().merge(&[Arc::clone(&a), Arc::clone(&b)]);

    assert_float_eq!(merged.summary.total_cost, 300.0);
    assert_eq!(merged.summary.providers, vec!["gcp", "aws"]);
    assert_eq!(merged.executive_summary.provider_count, Some(2));

    // Inputs are left alone.
    assert_float_eq!(a.summary.total_cost, 100.0);
    assert!(a.daily_trends.iter().all(|p| p.provider.is_none()));
}

#[test]
fn merged_lists_and_histogram() {
    let merged = engine().merge(&[gcp_result(), aws_result(100.0, 0.0)]);

    assert_eq!(merged.resources.len(), 4);
    assert_eq!(merged.summary.resource_count, 4);
    assert_eq!(merged.resource_types.get("compute_instance"), Some(&3));
    assert_eq!(merged.resource_types.get("compute_disk"), Some(&1));
    assert_eq!(merged.running_count, 2);

    // gcp vm-batch is the only waste; 60% of it is the realistic saving.
    assert_float_eq!(merged.summary.total_waste, 12.0);
    assert_eq!(merged.summary.savings_potential, Some(7.2));
}

#[test]
fn trends_sorted_by_date_and_tagged() {
    let merged = engine().merge(&[gcp_result(), aws_result(100.0, 0.0)]);

    assert!(
        merged
            .daily_trends
            .windows(2)
            .all(|w| w[0].date <= w[1].date)
    );
    // Same-day points keep request order.
    let day2: Vec<_> = merged
        .daily_trends
        .iter()
        .filter(|p| p.date == "2026-03-02")
        .map(|p| p.provider.as_deref())
        .collect();
    assert_eq!(day2, vec![Some("gcp"), Some("aws")]);
}

#[test]
fn cost_drivers_capped_and_descending() {
    let many = |provider: &str, offset: u32| {
        let mut r = make_test_result(provider, 0.0);
        r.cost_drivers = (0..15)
            .map(|i| CostDriver {
                service: format!("{provider}-svc-{i}"),
                cost: f64::from(i + offset),
            })
            .collect();
        Arc::new(r)
    };
    let merged = engine().merge(&[many("gcp", 0), many("aws", 100)]);

    assert_eq!(merged.cost_drivers.len(), MAX_MERGED_COST_DRIVERS);
    assert_eq!(merged.cost_drivers[0].service, "aws-svc-14");
    assert!(
        merged
            .cost_drivers
            .windows(2)
            .all(|w| w[0].cost >= w[1].cost)
    );
}

#[test]
fn high_cost_resources_capped() {
    let many = |provider: &str| {
        let mut r = make_test_result(provider, 0.0);
        r.high_cost_resources = (0..15)
            .map(|i| HighCostResource {
                id: format!("{provider}-{i}"),
                name: format!("{provider}-{i}"),
                kind: "compute_instance".to_string(),
                cost_30d: 11.0 + f64::from(i),
            })
            .collect();
        Arc::new(r)
    };
    let merged = engine().merge(&[many("gcp"), many("azure")]);
    assert_eq!(merged.high_cost_resources.len(), MAX_HIGH_COST);
    assert_float_eq!(merged.high_cost_resources[0].cost_30d, 25.0);
}

#[test]
fn risk_is_mean_of_reported_scores() {
    let unscored = {
        let mut r = make_test_result("azure", 1.0);
        r.executive_summary.risk_score = None;
        Arc::new(r)
    };
    let merged = engine().merge(&[aws_result(10.0, 2.0), aws_result(10.0, 5.0), unscored]);
    assert_eq!(merged.executive_summary.risk_score, Some(3.5));
}

#[test]
fn forecast_sums_sources_with_low_confidence() {
    let merged = engine().merge(&[gcp_result(), aws_result(100.0, 0.0)]);
    let forecast = merged.forecast.as_ref().unwrap();

    // gcp: 50/day for 30 days, aws: 100/day for 30 days.
    assert_float_eq!(forecast.predicted_additional_spend, 4_500.0);
    assert_eq!(forecast.confidence, Confidence::Low);
    assert_eq!(forecast.source_forecasts, Some(2));
}

#[test]
fn anomalies_tagged_with_source() {
    let mut spiky = make_test_result("gcp", 0.0);
    spiky.daily_trends = (1..=7)
        .map(|d| DailyTrendPoint {
            date: format!("2026-03-0{d}"),
            amount: if d == 5 { 200.0 } else { 10.0 },
            provider: None,
        })
        .collect();
    spiky.anomalies = opsyield::core::insights::detect_anomalies(&spiky.daily_trends);
    assert_eq!(spiky.anomalies.len(), 1);

    let merged = engine().merge(&[Arc::new(spiky), aws_result(1.0, 0.0)]);
    assert_eq!(merged.anomalies.len(), 1);
    assert_eq!(merged.anomalies[0].provider.as_deref(), Some("gcp"));
    assert_eq!(merged.executive_summary.anomaly_count, 1);
}

#[test]
fn confident_inputs_still_merge_to_low() {
    let confident = |provider: &str, date: &str| {
        let mut r = make_test_result(provider, 10.0);
        r.daily_trends = vec![DailyTrendPoint {
            date: date.to_string(),
            amount: 10.0,
            provider: None,
        }];
        r.forecast = Some(opsyield::core::models::Forecast {
            predicted_additional_spend: 300.0,
            confidence: Confidence::High,
            source_forecasts: None,
        });
        Arc::new(r)
    };
    let merged = engine().merge(&[
        confident("gcp", "2026-01-03"),
        confident("aws", "2026-01-01"),
    ]);

    let forecast = merged.forecast.as_ref().unwrap();
    assert_eq!(forecast.confidence, Confidence::Low);
    assert_float_eq!(forecast.predicted_additional_spend, 600.0);

    let dates: Vec<_> = merged.daily_trends.iter().map(|p| p.date.as_str()).collect();
    assert_eq!(dates, vec!["2026-01-01", "2026-01-03"]);
}
