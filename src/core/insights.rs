//! Per-resource heuristics and cost-series derivations.
//!
//! Everything here is a pure function over models; the orchestrator decides
//! what to keep.

use chrono::{DateTime, Utc};

use crate::core::models::{
    Anomaly, Confidence, DailyTrendPoint, Forecast, GovernanceIssue, NormalizedCost, Resource,
};
use crate::util::format::round_to;

/// Idle score at or above which a resource is reported idle.
pub const IDLE_THRESHOLD: u32 = 70;

/// CPU fraction under which a running instance counts as idle.
pub const IDLE_CPU: f64 = 0.05;

/// CPU fraction under which an instance is a rightsizing candidate.
pub const RIGHTSIZE_CPU: f64 = 0.20;

/// Temporary-looking resources older than this are flagged as waste.
pub const MAX_TEMPORARY_DAYS: i64 = 14;

/// Share of a rightsized resource's cost assumed saved.
pub const RIGHTSIZE_SAVINGS_RATIO: f64 = 0.5;

const IDLE_NAME_HINTS: &[&str] = &["test", "dev", "tmp", "temp"];
const TEMPORARY_NAME_HINTS: &[&str] = &["tmp", "temp", "test", "poc"];

const RIGHTSIZE_MAP: &[(&str, &str)] = &[
    ("e2-medium", "e2-small"),
    ("e2-small", "e2-micro"),
    ("t3.medium", "t3.small"),
    ("t3.small", "t3.micro"),
    ("Standard_B2s", "Standard_B1s"),
];

fn name_has_hint(resource: &Resource, hints: &[&str]) -> bool {
    let name = resource.name.to_lowercase();
    hints.iter().any(|h| name.contains(h))
}

// =============================================================================
// Resource Heuristics
// =============================================================================

/// Score 0-100 for how likely a resource is to be idle.
#[must_use]
pub fn idle_score(resource: &Resource) -> u32 {
    let mut score = 0;
    let cost = resource.cost_30d.unwrap_or(0.0);
    let running = resource
        .state
        .as_deref()
        .is_some_and(|s| s.to_lowercase().contains("running"));

    if resource.is_stopped() && cost > 0.0 {
        score += 50;
    }
    if resource.external_ip.as_deref().is_none_or(str::is_empty) {
        score += 20;
    }
    if running && resource.cpu_avg.is_some_and(|cpu| cpu < IDLE_CPU) {
        score += 50;
    }
    if name_has_hint(resource, IDLE_NAME_HINTS) {
        score += 20;
    }

    score.min(100)
}

/// Smaller instance type for an under-used instance, if one is known.
#[must_use]
pub fn rightsize(resource: &Resource) -> Option<&'static str> {
    let cpu = resource.cpu_avg?;
    if cpu >= RIGHTSIZE_CPU {
        return None;
    }
    let class = resource.class_type.as_deref()?;
    RIGHTSIZE_MAP
        .iter()
        .find(|(from, _)| *from == class)
        .map(|(_, to)| *to)
}

/// Reasons a resource is wasting money, empty if none.
#[must_use]
pub fn waste_reasons(resource: &Resource, now: DateTime<Utc>) -> Vec<String> {
    let mut reasons = Vec::new();
    let cost = resource.cost_30d.unwrap_or(0.0);

    if resource.is_stopped() && cost > 1.0 {
        reasons.push(format!("Stopped but incurring cost (${cost:.2})"));
    }

    if let Some(created) = resource.creation_date {
        let days_running = (now - created).num_days();
        if days_running > MAX_TEMPORARY_DAYS && name_has_hint(resource, TEMPORARY_NAME_HINTS) {
            reasons.push(format!("Temporary resource running for {days_running} days"));
        }
    }

    let reserved = resource
        .state
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("reserved"));
    if resource.kind.as_deref() == Some("ip_address") && reserved {
        reasons.push("Unattached IP address".to_string());
    }

    reasons
}

/// Human-readable advice for a scored resource.
#[must_use]
pub fn recommendations(score: u32, suggestion: Option<&str>, savings: f64) -> Vec<String> {
    let mut out = Vec::new();
    if score >= IDLE_THRESHOLD {
        out.push("Consider stopping this instance".to_string());
    }
    if let Some(target) = suggestion {
        out.push(format!(
            "Downsize to {target} to save approx ${savings:.2}/month"
        ));
    }
    out
}

// =============================================================================
// Cost Series
// =============================================================================

/// Days whose spend is more than twice the period mean and above a small floor.
///
/// Needs at least a week of points; shorter series never report anomalies.
#[must_use]
pub fn detect_anomalies(trend: &[DailyTrendPoint]) -> Vec<Anomaly> {
    if trend.len() < 7 {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = trend.iter().map(|p| p.amount).sum::<f64>() / trend.len() as f64;
    if mean <= 0.0 {
        return Vec::new();
    }

    trend
        .iter()
        .filter(|p| p.amount > mean * 2.0 && p.amount - mean > 1.0)
        .map(|p| Anomaly {
            date: p.date.clone(),
            amount: p.amount,
            expected: round_to(mean, 4),
            description: format!(
                "Spend of ${:.2} is {:.1}x the daily average",
                p.amount,
                p.amount / mean
            ),
            provider: p.provider.clone(),
        })
        .collect()
}

/// Per-service spend that carries no allocation tags, largest first.
#[must_use]
pub fn untagged_spend(provider: &str, costs: &[NormalizedCost]) -> Vec<GovernanceIssue> {
    let mut by_service: Vec<(String, f64)> = Vec::new();
    for cost in costs.iter().filter(|c| !c.is_allocated() && c.cost > 0.0) {
        match by_service.iter_mut().find(|(s, _)| *s == cost.service) {
            Some(entry) => entry.1 += cost.cost,
            None => by_service.push((cost.service.clone(), cost.cost)),
        }
    }
    by_service.sort_by(|a, b| b.1.total_cmp(&a.1));

    by_service
        .into_iter()
        .map(|(service, amount)| GovernanceIssue {
            service,
            provider: provider.to_string(),
            issue: "Spend without team or environment tags".to_string(),
            untagged_cost: round_to(amount, 4),
        })
        .collect()
}

/// Linear projection of the next `days` of spend from the daily trend.
///
/// `None` when there is no trend to project from.
#[must_use]
pub fn forecast(trend: &[DailyTrendPoint], days: u32) -> Option<Forecast> {
    if trend.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = trend.iter().map(|p| p.amount).sum::<f64>() / trend.len() as f64;
    let confidence = match trend.len() {
        n if n >= 14 => Confidence::High,
        n if n >= 7 => Confidence::Medium,
        _ => Confidence::Low,
    };
    Some(Forecast {
        predicted_additional_spend: round_to(mean * f64::from(days), 2),
        confidence,
        source_forecasts: None,
    })
}

/// Risk on a 0-10 scale from the share of spend that is waste.
#[must_use]
pub fn risk_score(total_cost: f64, total_waste: f64) -> f64 {
    if total_cost <= 0.0 {
        return 0.0;
    }
    round_to((total_waste / total_cost * 10.0).min(10.0), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vm(name: &str) -> Resource {
        Resource::new(format!("id-{name}"), name, "compute_instance", "gcp")
    }

    fn point(date: &str, amount: f64) -> DailyTrendPoint {
        DailyTrendPoint {
            date: date.to_string(),
            amount,
            provider: None,
        }
    }

    #[test]
    fn idle_score_for_stopped_test_box() {
        let mut r = vm("test-runner");
        r.state = Some("STOPPED".to_string());
        r.cost_30d = Some(12.0);
        // stopped+cost 50, no ip 20, name 20
        assert_eq!(idle_score(&r), 90);
    }

    #[test]
    fn idle_score_is_capped() {
        let mut r = vm("tmp-box");
        r.state = Some("running".to_string());
        r.cpu_avg = Some(0.01);
        r.cost_30d = Some(5.0);
        assert_eq!(idle_score(&r), 90);
        r.state = Some("stopped running".to_string());
        assert_eq!(idle_score(&r), 100);
    }

    #[test]
    fn busy_public_instance_scores_zero() {
        let mut r = vm("api");
        r.state = Some("RUNNING".to_string());
        r.external_ip = Some("34.1.2.3".to_string());
        r.cpu_avg = Some(0.6);
        assert_eq!(idle_score(&r), 0);
    }

    #[test]
    fn rightsize_requires_low_cpu_and_known_class() {
        let mut r = vm("api");
        r.class_type = Some("t3.medium".to_string());
        assert_eq!(rightsize(&r), None);
        r.cpu_avg = Some(0.1);
        assert_eq!(rightsize(&r), Some("t3.small"));
        r.cpu_avg = Some(0.25);
        assert_eq!(rightsize(&r), None);
        r.cpu_avg = Some(0.1);
        r.class_type = Some("n2-standard-8".to_string());
        assert_eq!(rightsize(&r), None);
    }

    #[test]
    fn waste_reasons_cover_all_rules() {
        let now = Utc::now();
        let mut r = vm("poc-cluster");
        r.state = Some("TERMINATED".to_string());
        r.cost_30d = Some(3.5);
        r.creation_date = Some(now - Duration::days(30));
        let reasons = waste_reasons(&r, now);
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("$3.50"));
        assert!(reasons[1].contains("30 days"));

        let mut ip = Resource::new("ip-1", "static", "ip_address", "gcp");
        ip.state = Some("RESERVED".to_string());
        assert_eq!(waste_reasons(&ip, now), vec!["Unattached IP address"]);
    }

    #[test]
    fn recommendations_include_savings() {
        let recs = recommendations(80, Some("e2-small"), 12.5);
        assert_eq!(recs.len(), 2);
        assert!(recs[1].contains("$12.50"));
        assert!(recommendations(10, None, 0.0).is_empty());
    }

    #[test]
    fn anomalies_need_a_week_of_data() {
        let short: Vec<_> = (1..=3).map(|d| point(&format!("2026-01-0{d}"), 100.0)).collect();
        assert!(detect_anomalies(&short).is_empty());

        let mut week: Vec<_> = (1..=7).map(|d| point(&format!("2026-01-0{d}"), 10.0)).collect();
        week[3].amount = 100.0;
        let anomalies = detect_anomalies(&week);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].date, "2026-01-04");
    }

    #[test]
    fn forecast_confidence_by_series_length() {
        assert!(forecast(&[], 30).is_none());
        let three: Vec<_> = (1..=3).map(|d| point(&format!("2026-01-0{d}"), 2.0)).collect();
        let f = forecast(&three, 30).unwrap();
        assert_eq!(f.confidence, Confidence::Low);
        assert!((f.predicted_additional_spend - 60.0).abs() < 1e-9);

        let two_weeks: Vec<_> = (1..=14).map(|d| point(&format!("2026-01-{d:02}"), 1.0)).collect();
        assert_eq!(forecast(&two_weeks, 7).unwrap().confidence, Confidence::High);
    }

    #[test]
    fn risk_score_is_capped_and_rounded() {
        assert!((risk_score(0.0, 5.0)).abs() < f64::EPSILON);
        assert!((risk_score(100.0, 33.0) - 3.3).abs() < 1e-9);
        assert!((risk_score(10.0, 50.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn untagged_spend_groups_by_service() {
        let ts = Utc::now();
        let mut tagged = NormalizedCost::new("aws", "EC2", 5.0, ts);
        tagged.team = Some("core".to_string());
        let costs = vec![
            NormalizedCost::new("aws", "S3", 1.0, ts),
            NormalizedCost::new("aws", "EC2", 2.0, ts),
            NormalizedCost::new("aws", "S3", 2.5, ts),
            tagged,
        ];
        let issues = untagged_spend("aws", &costs);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].service, "S3");
        assert!((issues[0].untagged_cost - 3.5).abs() < 1e-9);
    }
}
