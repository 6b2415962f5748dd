//! Human-readable output using rich_rust.
//!
//! Analysis results render as a summary panel followed by optional detail
//! panels; status snapshots render one panel per provider.

use crate::core::models::{AnalysisResult, ProviderStatus, ResultKind, StatusSnapshot};
use crate::error::Result;
use crate::util::{format_cost, format_count};
use rich_rust::prelude::*;
use rich_rust::{Color, ColorSystem, Segment, Style};

/// Rows shown per detail panel.
const DETAIL_ROWS: usize = 5;

const PANEL_WIDTH: usize = 72;

type Line = Vec<Segment<'static>>;

/// Convert segments to a string, with ANSI codes unless `no_color`.
fn segments_to_string(segments: &[Segment], no_color: bool) -> String {
    segments
        .iter()
        .map(|seg| match (&seg.style, no_color) {
            (Some(style), false) => style.render(&seg.text, ColorSystem::TrueColor),
            _ => seg.text.to_string(),
        })
        .collect()
}

/// Style with a named foreground color; plain when the name does not parse.
fn colored(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |color| Style::new().color(color))
}

fn label(text: &str) -> Segment<'static> {
    Segment::styled(format!("{text}: "), Style::new().bold())
}

fn field(name: &str, value: String) -> Line {
    vec![label(name), Segment::plain(value)]
}

fn panel(title: &str, accent: &str, lines: Vec<Line>, no_color: bool) -> String {
    let title = if no_color {
        Text::new(title)
    } else {
        Text::styled(title, colored(accent).bold())
    };

    let mut panel = Panel::new(lines).title(title).padding((0, 1));
    if !no_color {
        panel = panel.border_style(colored(accent));
    }

    let mut out = segments_to_string(&panel.render(PANEL_WIDTH), no_color);
    out.push('\n');
    out
}

// =============================================================================
// Analysis
// =============================================================================

/// Render an analysis result for human consumption.
pub fn render_analysis(result: &AnalysisResult, no_color: bool) -> Result<String> {
    let mut output = render_summary(result, no_color);

    if !result.cost_drivers.is_empty() {
        let lines = result
            .cost_drivers
            .iter()
            .take(DETAIL_ROWS)
            .map(|driver| {
                vec![
                    Segment::plain(format!("{:<40}", driver.service)),
                    Segment::styled(format_cost(driver.cost), colored("yellow")),
                ]
            })
            .collect();
        output.push_str(&panel("Top cost drivers", "yellow", lines, no_color));
    }

    if !result.optimizations.is_empty() {
        let lines = result
            .optimizations
            .iter()
            .take(DETAIL_ROWS)
            .map(|opt| {
                vec![
                    Segment::styled(format!("[{}] ", opt.action), colored("green").bold()),
                    Segment::plain(format!("{} ({}) ", opt.resource_id, opt.provider)),
                    Segment::styled(
                        format!("saves {}", format_cost(opt.potential_savings)),
                        colored("green"),
                    ),
                ]
            })
            .collect();
        output.push_str(&panel("Optimizations", "green", lines, no_color));
    }

    if !result.waste_findings.is_empty() || !result.anomalies.is_empty() {
        let mut lines: Vec<Line> = result
            .waste_findings
            .iter()
            .take(DETAIL_ROWS)
            .map(|finding| {
                vec![
                    Segment::styled(format!("{}: ", finding.name), Style::new().bold()),
                    Segment::plain(finding.reasons.join("; ")),
                ]
            })
            .collect();
        lines.extend(result.anomalies.iter().take(DETAIL_ROWS).map(|anomaly| {
            vec![
                Segment::styled(format!("{} ", anomaly.date), colored("red")),
                Segment::plain(anomaly.description.clone()),
            ]
        }));
        output.push_str(&panel("Findings", "red", lines, no_color));
    }

    Ok(output)
}

fn render_summary(result: &AnalysisResult, no_color: bool) -> String {
    let summary = &result.summary;
    let mut lines: Vec<Line> = Vec::new();

    if !result.executive_summary.headline.is_empty() {
        lines.push(vec![Segment::styled(
            result.executive_summary.headline.clone(),
            Style::new().italic(),
        )]);
    }

    lines.push(vec![
        label("Total cost"),
        Segment::styled(format_cost(summary.total_cost), colored("cyan").bold()),
        Segment::plain(format!(" {}", summary.currency)),
    ]);
    lines.push(field("Waste", format_cost(summary.total_waste)));
    if let Some(savings) = summary.savings_potential {
        lines.push(field("Savings potential", format_cost(savings)));
    }
    lines.push(field(
        "Resources",
        format!(
            "{} ({} running)",
            format_count(summary.resource_count),
            format_count(result.running_count)
        ),
    ));
    if let Some(risk) = result.executive_summary.risk_score {
        let accent = if risk >= 5.0 { "red" } else { "green" };
        lines.push(vec![
            label("Risk score"),
            Segment::styled(format!("{risk:.1}/10"), colored(accent)),
        ]);
    }
    if let Some(forecast) = &result.forecast {
        lines.push(field(
            "Forecast",
            format!(
                "{} ({} confidence)",
                format_cost(forecast.predicted_additional_spend),
                forecast.confidence
            ),
        ));
    }

    let title = match (result.meta.kind, result.meta.period_days) {
        (ResultKind::Empty, _) => "No provider data".to_string(),
        (_, Some(days)) => format!("{} · last {days} days", result.meta.provider),
        (_, None) => result.meta.provider.clone(),
    };
    panel(&title, "cyan", lines, no_color)
}

// =============================================================================
// Status
// =============================================================================

/// Render a status snapshot for human consumption.
pub fn render_status(snapshot: &StatusSnapshot, no_color: bool) -> Result<String> {
    let mut output = String::new();
    for (name, status) in &snapshot.providers {
        output.push_str(&render_provider_status(name, status, no_color));
    }

    let footer = Segment::styled(
        format!("Checked in {} ms", snapshot.meta.elapsed_ms),
        Style::new().dim(),
    );
    output.push_str(&segments_to_string(&[footer], no_color));
    output.push('\n');
    Ok(output)
}

fn render_provider_status(name: &str, status: &ProviderStatus, no_color: bool) -> String {
    let mut lines: Vec<Line> = vec![
        check_line("Installed", status.installed),
        check_line("Authenticated", status.authenticated),
    ];
    if let Some(account) = &status.account {
        lines.push(field("Account", account.clone()));
    }
    if !status.subscriptions.is_empty() {
        lines.push(field(
            "Subscriptions",
            format_count(status.subscriptions.len()),
        ));
    }
    if let Some(error) = &status.error {
        lines.push(vec![
            label("Error"),
            Segment::styled(error.clone(), colored("red")),
        ]);
    }

    let accent = if status.authenticated { "green" } else { "red" };
    panel(name, accent, lines, no_color)
}

fn check_line(name: &str, ok: bool) -> Line {
    let (mark, accent) = if ok { ("✓", "green") } else { ("✗", "red") };
    vec![label(name), Segment::styled(mark, colored(accent))]
}
