//! Single-provider analysis and multi-provider fan-out.
//!
//! `analyze` fetches costs and inventory for one provider concurrently and
//! derives the report. A failing fetch degrades to an empty list so a partial
//! report is always produced. `aggregate_analysis` runs `analyze` for every
//! requested provider at once, drops the ones that fail, and hands the rest to
//! the [`AggregationEngine`] in request order.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;

use crate::core::aggregation::{AggregationEngine, shared_currency};
use crate::core::insights;
use crate::core::logging::timed;
use crate::core::models::{
    AnalysisMeta, AnalysisResult, CostDriver, DailyTrendPoint, ExecutiveSummary, HighCostResource,
    IdleFinding, NormalizedCost, Optimization, OptimizationAction, Resource, ResultKind, Summary,
    WasteFinding,
};
use crate::core::provider::{ProviderParams, ProviderRegistry};
use crate::error::{OpsError, Result};
use crate::util::format::{format_cost, round_to};

/// Maximum cost drivers in a single-provider result.
pub const MAX_COST_DRIVERS: usize = 10;

/// Maximum high-cost resources in any result.
pub const MAX_HIGH_COST: usize = 20;

/// `cost_30d` above which a resource is listed as high-cost.
pub const HIGH_COST_THRESHOLD: f64 = 10.0;

/// Internal rounding precision for derived amounts.
const PRECISION: i32 = 4;

/// Dispatches analysis requests to provider adapters.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    aggregator: AggregationEngine,
}

impl Orchestrator {
    #[must_use]
    pub const fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            aggregator: AggregationEngine::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Full analysis of one provider.
    ///
    /// Cost and inventory failures are logged and replaced with empty lists.
    ///
    /// # Errors
    /// `UnknownProvider` for unregistered names; `ProviderInit` if the adapter
    /// cannot be constructed.
    pub async fn analyze(
        &self,
        provider_name: &str,
        days: u32,
        params: &ProviderParams,
    ) -> Result<AnalysisResult> {
        let name = provider_name.trim().to_ascii_lowercase();
        let adapter = self.registry.create(&name, params)?;

        timed("analyze", &name, async {
            let (costs, resources) = tokio::join!(
                recover(&name, "costs", adapter.costs(days)),
                recover(&name, "infrastructure", adapter.infrastructure()),
            );

            let result = build_result(&name, days, &costs, resources, Utc::now());
            tracing::info!(
                provider = %name,
                resource_count = result.summary.resource_count,
                total_cost = result.summary.total_cost,
                "Analysis built"
            );
            Ok(result)
        })
        .await
    }

    /// Analyze several providers concurrently and merge the successes.
    ///
    /// The provider list is validated before any adapter runs. After that,
    /// a provider whose analysis fails is logged and left out. If every
    /// provider fails the canonical empty result is returned.
    ///
    /// # Errors
    /// `EmptyProviderList` or `UnknownProvider` from validation.
    pub async fn aggregate_analysis<S: AsRef<str>>(
        &self,
        providers: &[S],
        days: u32,
        params: &ProviderParams,
    ) -> Result<Arc<AnalysisResult>> {
        self.registry.validate(providers)?;
        let label = providers
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");

        timed("aggregate_analysis", &label, async {
            let outcomes =
                join_all(providers.iter().map(|p| self.analyze(p.as_ref(), days, params))).await;

            let mut succeeded = Vec::with_capacity(outcomes.len());
            for (provider, outcome) in providers.iter().zip(outcomes) {
                match outcome {
                    Ok(result) => succeeded.push(Arc::new(result)),
                    Err(e) => {
                        let err = OpsError::AggregateProvider {
                            provider: provider.as_ref().to_string(),
                            reason: e.to_string(),
                        };
                        tracing::error!(
                            provider = provider.as_ref(),
                            error_code = err.error_code(),
                            error = %err,
                            "Provider failed during aggregate"
                        );
                    }
                }
            }

            Ok(self.aggregator.merge(&succeeded))
        })
        .await
    }
}

/// Await an adapter call, substituting an empty list on failure.
///
/// A panic inside the adapter counts as a failure of that call only.
async fn recover<T, F>(provider: &str, operation: &str, fut: F) -> Vec<T>
where
    F: Future<Output = Result<Vec<T>>>,
{
    let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(OpsError::AdapterCall {
            provider: provider.to_string(),
            operation: operation.to_string(),
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    };

    match outcome {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(
                provider,
                operation,
                error_code = e.error_code(),
                error = %e,
                "Provider call failed, using empty result"
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

// =============================================================================
// Result Construction
// =============================================================================

/// Derive a single-provider report from fetched costs and resources.
#[must_use]
pub fn build_result(
    provider: &str,
    days: u32,
    costs: &[NormalizedCost],
    resources: Vec<Resource>,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let mut daily: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_service: BTreeMap<&str, f64> = BTreeMap::new();
    let mut total_cost = 0.0;
    for cost in costs {
        *daily.entry(cost.day()).or_default() += cost.cost;
        *by_service.entry(cost.service.as_str()).or_default() += cost.cost;
        total_cost += cost.cost;
    }
    let total_cost = round_to(total_cost, PRECISION);

    let daily_trends: Vec<DailyTrendPoint> = daily
        .into_iter()
        .map(|(date, amount)| DailyTrendPoint {
            date,
            amount: round_to(amount, PRECISION),
            provider: None,
        })
        .collect();

    let mut cost_drivers: Vec<CostDriver> = by_service
        .into_iter()
        .map(|(service, cost)| CostDriver {
            service: service.to_string(),
            cost: round_to(cost, PRECISION),
        })
        .collect();
    cost_drivers.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    cost_drivers.truncate(MAX_COST_DRIVERS);

    let mut resource_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut running_count = 0;
    let mut high_cost_resources = Vec::new();
    for resource in &resources {
        *resource_types.entry(resource.type_key().to_string()).or_default() += 1;
        if resource.is_running() {
            running_count += 1;
        }
        if let Some(cost_30d) = resource.cost_30d.filter(|c| *c > HIGH_COST_THRESHOLD) {
            high_cost_resources.push(HighCostResource {
                id: resource.id.clone(),
                name: resource.name.clone(),
                kind: resource.type_key().to_string(),
                cost_30d,
            });
        }
    }
    high_cost_resources.sort_by(|a, b| b.cost_30d.total_cmp(&a.cost_30d));
    high_cost_resources.truncate(MAX_HIGH_COST);

    let findings = assess_resources(provider, &resources, now);
    let total_waste = round_to(
        findings.waste.iter().map(|w| w.cost_30d).sum::<f64>(),
        PRECISION,
    );

    let anomalies = insights::detect_anomalies(&daily_trends);
    let governance_issues = insights::untagged_spend(provider, costs);
    let forecast = insights::forecast(&daily_trends, days);
    let currency = shared_currency(provider, costs.iter().map(|c| c.currency.as_str()));

    AnalysisResult {
        meta: AnalysisMeta {
            provider: provider.to_string(),
            kind: ResultKind::Single,
            period_days: Some(days),
            generated_at: Some(now),
            source_count: None,
        },
        summary: Summary {
            total_cost,
            total_waste,
            currency,
            resource_count: resources.len(),
            providers: Vec::new(),
            savings_potential: None,
        },
        executive_summary: ExecutiveSummary {
            risk_score: Some(insights::risk_score(total_cost, total_waste)),
            headline: format!(
                "{provider} spend of {} over {days} days",
                format_cost(total_cost)
            ),
            anomaly_count: anomalies.len(),
            active_recommendations: findings.optimizations.len(),
            provider_count: None,
        },
        daily_trends,
        cost_drivers,
        resource_types,
        running_count,
        high_cost_resources,
        resources,
        idle_resources: findings.idle,
        waste_findings: findings.waste,
        anomalies,
        optimizations: findings.optimizations,
        governance_issues,
        forecast,
    }
}

#[derive(Default)]
struct Findings {
    idle: Vec<IdleFinding>,
    waste: Vec<WasteFinding>,
    optimizations: Vec<Optimization>,
}

fn assess_resources(provider: &str, resources: &[Resource], now: DateTime<Utc>) -> Findings {
    let mut findings = Findings::default();

    for resource in resources {
        let cost = resource.cost_30d.unwrap_or(0.0);
        let score = insights::idle_score(resource);
        let suggestion = insights::rightsize(resource);
        let rightsize_savings = round_to(cost * insights::RIGHTSIZE_SAVINGS_RATIO, 2);
        let idle = score >= insights::IDLE_THRESHOLD;

        if idle {
            findings.idle.push(IdleFinding {
                resource_id: resource.id.clone(),
                name: resource.name.clone(),
                provider: provider.to_string(),
                idle_score: score,
                cost_30d: cost,
                recommendations: insights::recommendations(score, suggestion, rightsize_savings),
            });
            if cost > 0.0 {
                findings.optimizations.push(Optimization {
                    resource_id: resource.id.clone(),
                    provider: provider.to_string(),
                    action: OptimizationAction::Stop,
                    description: format!("Stop idle resource {}", resource.name),
                    potential_savings: round_to(cost, 2),
                });
            }
        } else if let Some(target) = suggestion {
            findings.optimizations.push(Optimization {
                resource_id: resource.id.clone(),
                provider: provider.to_string(),
                action: OptimizationAction::Rightsize,
                description: format!("Downsize {} to {target}", resource.name),
                potential_savings: rightsize_savings,
            });
        }

        let reasons = insights::waste_reasons(resource, now);
        if !reasons.is_empty() {
            findings.waste.push(WasteFinding {
                resource_id: resource.id.clone(),
                name: resource.name.clone(),
                kind: resource.type_key().to_string(),
                provider: provider.to_string(),
                reasons,
                cost_30d: cost,
            });
        }
    }

    findings
        .optimizations
        .sort_by(|a, b| b.potential_savings.total_cmp(&a.potential_savings));
    findings
}
