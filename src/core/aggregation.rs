//! Cross-provider merge of analysis results.
//!
//! Concatenated lists keep the order of the input slice, which is the order
//! the providers were requested in, not the order their fetches finished.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::core::models::{
    AnalysisMeta, AnalysisResult, Confidence, ExecutiveSummary, Forecast, ResultKind, Summary,
};
use crate::core::orchestrator::MAX_HIGH_COST;
use crate::util::format::round_to;

/// Maximum cost drivers after a merge.
pub const MAX_MERGED_COST_DRIVERS: usize = 20;

/// Share of total waste reported as realistic savings.
pub const SAVINGS_RATIO: f64 = 0.6;

/// Currency reported when there are no amounts to label.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Currency label for totals summed across different currencies.
pub const MIXED_CURRENCY: &str = "MIXED";

/// Merges per-provider results into one cross-cloud view.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merge `results` into a new result.
    ///
    /// No inputs yield the canonical empty result. A single input is returned
    /// as the same allocation. Inputs are never modified.
    #[must_use]
    pub fn merge(&self, results: &[Arc<AnalysisResult>]) -> Arc<AnalysisResult> {
        match results {
            [] => Arc::new(AnalysisResult::empty()),
            [only] => Arc::clone(only),
            many => Arc::new(merge_many(many)),
        }
    }
}

fn merge_many(results: &[Arc<AnalysisResult>]) -> AnalysisResult {
    tracing::info!(source_count = results.len(), "Aggregating results");

    let mut merged = AnalysisResult::empty();
    let mut providers = Vec::with_capacity(results.len());
    let mut total_cost = 0.0;
    let mut total_waste = 0.0;
    let mut resource_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut risk_scores = Vec::new();
    let mut predicted = 0.0;
    let mut source_forecasts = 0;

    for result in results {
        let provider = result.meta.provider.clone();

        total_cost += result.summary.total_cost;
        total_waste += result.summary.total_waste;

        merged.resources.extend(result.resources.iter().cloned());
        merged.anomalies.extend(result.anomalies.iter().cloned().map(|mut a| {
            a.provider = Some(provider.clone());
            a
        }));
        merged.daily_trends.extend(result.daily_trends.iter().cloned().map(|mut p| {
            p.provider = Some(provider.clone());
            p
        }));
        merged.cost_drivers.extend(result.cost_drivers.iter().cloned());
        merged
            .high_cost_resources
            .extend(result.high_cost_resources.iter().cloned());
        merged.optimizations.extend(result.optimizations.iter().cloned());
        merged.idle_resources.extend(result.idle_resources.iter().cloned());
        merged.waste_findings.extend(result.waste_findings.iter().cloned());
        merged
            .governance_issues
            .extend(result.governance_issues.iter().cloned());

        for (kind, count) in &result.resource_types {
            *resource_types.entry(kind.clone()).or_default() += count;
        }
        merged.running_count += result.running_count;

        if let Some(score) = result.executive_summary.risk_score {
            risk_scores.push(score);
        }
        if let Some(forecast) = &result.forecast {
            predicted += forecast.predicted_additional_spend;
            source_forecasts += 1;
        }

        providers.push(provider);
    }

    // Stable sorts: ties keep input order.
    merged.daily_trends.sort_by(|a, b| a.date.cmp(&b.date));
    merged.cost_drivers.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    merged.cost_drivers.truncate(MAX_MERGED_COST_DRIVERS);
    merged
        .high_cost_resources
        .sort_by(|a, b| b.cost_30d.total_cmp(&a.cost_30d));
    merged.high_cost_resources.truncate(MAX_HIGH_COST);
    merged
        .optimizations
        .sort_by(|a, b| b.potential_savings.total_cmp(&a.potential_savings));
    merged.resource_types = resource_types;

    merged.forecast = Some(Forecast {
        predicted_additional_spend: round_to(predicted, 2),
        confidence: Confidence::Low,
        source_forecasts: Some(source_forecasts),
    });

    #[allow(clippy::cast_precision_loss)]
    let risk_score = if risk_scores.is_empty() {
        0.0
    } else {
        round_to(risk_scores.iter().sum::<f64>() / risk_scores.len() as f64, 1)
    };

    let first_period = results[0].meta.period_days;
    let period_days = results
        .iter()
        .all(|r| r.meta.period_days == first_period)
        .then_some(first_period)
        .flatten();

    let currency = shared_currency(
        &providers.join(","),
        results.iter().map(|r| r.summary.currency.as_str()),
    );
    let total_cost = round_to(total_cost, 2);
    let total_waste = round_to(total_waste, 2);

    merged.executive_summary = ExecutiveSummary {
        risk_score: Some(risk_score),
        headline: format!("Multi-cloud analysis across {}", providers.join(", ")),
        anomaly_count: merged.anomalies.len(),
        active_recommendations: merged.optimizations.len(),
        provider_count: Some(providers.len()),
    };
    merged.summary = Summary {
        total_cost,
        total_waste,
        currency,
        resource_count: merged.resources.len(),
        savings_potential: Some(round_to(total_waste * SAVINGS_RATIO, 2)),
        providers: providers.clone(),
    };
    merged.meta = AnalysisMeta {
        provider: providers.join(","),
        kind: ResultKind::MultiCloudAggregate,
        period_days,
        generated_at: Some(Utc::now()),
        source_count: Some(results.len()),
    };

    tracing::info!(
        resource_count = merged.summary.resource_count,
        total_cost,
        provider_count = providers.len(),
        "Aggregation complete"
    );

    merged
}

/// The one currency every amount is in.
///
/// Amounts are never converted, so disagreeing currencies are logged and
/// labelled [`MIXED_CURRENCY`].
pub(crate) fn shared_currency<'a>(
    source: &str,
    currencies: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for currency in currencies {
        if !seen.contains(&currency) {
            seen.push(currency);
        }
    }
    match seen.as_slice() {
        [] => DEFAULT_CURRENCY.to_string(),
        [only] => (*only).to_string(),
        _ => {
            tracing::warn!(
                source,
                currencies = %seen.join(","),
                "Mixed currencies summed without conversion"
            );
            MIXED_CURRENCY.to_string()
        }
    }
}
