//! Robot-mode output (JSON and Markdown).
//!
//! JSON output is wrapped in the [`RobotOutput`] envelope. Analysis results
//! pass through [`adapt_analysis_result`] first so money fields carry at most
//! two decimals.

use std::fmt::Write as _;

use serde_json::Value;

use crate::core::models::{AnalysisResult, RobotOutput, StatusSnapshot};
use crate::error::Result;
use crate::util::{format_cost, round_to};

/// Fields holding currency amounts.
const MONEY_KEYS: &[&str] = &[
    "total_cost",
    "total_waste",
    "savings_potential",
    "amount",
    "expected",
    "cost",
    "cost_30d",
    "potential_savings",
    "untagged_cost",
    "predicted_additional_spend",
];

/// Render any serializable value as JSON.
pub fn render_json<T: serde::Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Render any serializable value as pretty JSON.
pub fn render_json_pretty<T: serde::Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

fn render_envelope<T: serde::Serialize>(output: &RobotOutput<T>, pretty: bool) -> Result<String> {
    if pretty {
        render_json_pretty(output)
    } else {
        render_json(output)
    }
}

/// Plain nested JSON map of `result` with money rounded to 2 decimals.
#[must_use]
pub fn adapt_analysis_result(result: &AnalysisResult) -> Value {
    let mut value = serde_json::to_value(result).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Analysis result could not be converted to JSON");
        Value::Null
    });
    round_money(&mut value, None);
    value
}

fn round_money(value: &mut Value, key: Option<&str>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                round_money(v, Some(k.as_str()));
            }
        }
        Value::Array(items) => {
            for item in items {
                round_money(item, key);
            }
        }
        Value::Number(n) if key.is_some_and(|k| MONEY_KEYS.contains(&k)) => {
            if let Some(rounded) = n
                .as_f64()
                .filter(|_| n.is_f64())
                .and_then(|f| serde_json::Number::from_f64(round_to(f, 2)))
            {
                *n = rounded;
            }
        }
        _ => {}
    }
}

/// Render an analysis result as a JSON envelope.
pub fn render_analysis_json(result: &AnalysisResult, command: &str, pretty: bool) -> Result<String> {
    let output = RobotOutput::new(command, adapt_analysis_result(result));
    render_envelope(&output, pretty)
}

/// Render a status snapshot as a JSON envelope.
pub fn render_status_json(snapshot: &StatusSnapshot, pretty: bool) -> Result<String> {
    let output = RobotOutput::new("status", snapshot);
    render_envelope(&output, pretty)
}

/// Render an analysis result as Markdown.
pub fn render_analysis_md(result: &AnalysisResult) -> Result<String> {
    let mut out = String::new();
    let summary = &result.summary;

    match result.meta.period_days {
        Some(days) => writeln!(out, "## {} cost analysis ({days} days)\n", result.meta.provider),
        None => writeln!(out, "## {} cost analysis\n", result.meta.provider),
    }
    .ok();

    writeln!(out, "- total_cost: {:.2} {}", summary.total_cost, summary.currency).ok();
    writeln!(out, "- total_waste: {:.2}", summary.total_waste).ok();
    if let Some(savings) = summary.savings_potential {
        writeln!(out, "- savings_potential: {savings:.2}").ok();
    }
    writeln!(
        out,
        "- resources: {} (running {})",
        summary.resource_count, result.running_count
    )
    .ok();
    if let Some(risk) = result.executive_summary.risk_score {
        writeln!(out, "- risk_score: {risk:.1}").ok();
    }
    writeln!(out, "- anomalies: {}", result.anomalies.len()).ok();
    if let Some(forecast) = &result.forecast {
        writeln!(
            out,
            "- forecast: {:.2} ({} confidence)",
            forecast.predicted_additional_spend, forecast.confidence
        )
        .ok();
    }

    if !result.cost_drivers.is_empty() {
        out.push_str("\n### Cost drivers\n\n| Service | Cost |\n|---|---:|\n");
        for driver in &result.cost_drivers {
            writeln!(out, "| {} | {} |", driver.service, format_cost(driver.cost)).ok();
        }
    }

    if !result.optimizations.is_empty() {
        out.push_str("\n### Optimizations\n\n");
        for opt in &result.optimizations {
            writeln!(
                out,
                "- [{}] {} ({}): {}, saves {}",
                opt.action,
                opt.resource_id,
                opt.provider,
                opt.description,
                format_cost(opt.potential_savings)
            )
            .ok();
        }
    }

    if !result.waste_findings.is_empty() {
        out.push_str("\n### Waste\n\n");
        for finding in &result.waste_findings {
            writeln!(out, "- {}: {}", finding.name, finding.reasons.join("; ")).ok();
        }
    }

    Ok(out)
}

/// Render a status snapshot as Markdown.
pub fn render_status_md(snapshot: &StatusSnapshot) -> Result<String> {
    let mut out = String::from(
        "## Provider status\n\n| Provider | Installed | Authenticated | Account | Error |\n|---|---|---|---|---|\n",
    );
    for (name, status) in &snapshot.providers {
        writeln!(
            out,
            "| {name} | {} | {} | {} | {} |",
            yes_no(status.installed),
            yes_no(status.authenticated),
            status.account.as_deref().unwrap_or("-"),
            status.error.as_deref().unwrap_or("-"),
        )
        .ok();
    }
    writeln!(out, "\n- checked_in_ms: {}", snapshot.meta.elapsed_ms).ok();
    Ok(out)
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
