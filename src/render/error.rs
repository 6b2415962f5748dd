//! Error rendering.
//!
//! Human output gets a panel with fix suggestions when stderr is a terminal,
//! a two-line plain message otherwise. JSON and Markdown output get a
//! structured error object.

use crate::cli::args::OutputFormat;
use crate::error::{FixSuggestion, OpsError};
use rich_rust::prelude::*;
use rich_rust::{Color, ColorSystem, Segment, Style};

/// Render an error for `format`.
#[must_use]
pub fn render_error(error: &OpsError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Md => render_error_json(error, true),
        OutputFormat::Human => {
            if !no_color && crate::util::env::stderr_is_tty() {
                render_rich(error)
            } else {
                render_simple(error)
            }
        }
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &OpsError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Rich Terminal Rendering
// =============================================================================

fn render_rich(error: &OpsError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines: Vec<Vec<Segment<'static>>> = vec![
        vec![
            Segment::styled(error.to_string(), colored("red").bold()),
            Segment::styled(format!(" [{}]", error.error_code()), Style::new().dim()),
        ],
        Vec::new(),
    ];

    if !suggestions.is_empty() {
        lines.push(vec![Segment::styled("How to fix:", colored("cyan").bold())]);
        lines.extend(suggestion_lines(&suggestions));
    }

    if let Some(first) = suggestions.first() {
        if !first.context.is_empty() {
            lines.push(Vec::new());
            lines.push(vec![Segment::styled("Why this happened:", Style::new().bold())]);
            lines.push(vec![Segment::plain(format!("  {}", first.context))]);
        }
        if let Some(prevention) = &first.prevention {
            lines.push(Vec::new());
            lines.push(vec![Segment::styled("Prevention:", colored("green").bold())]);
            lines.push(vec![Segment::plain(format!("  {prevention}"))]);
        }
        if let Some(url) = &first.doc_url {
            lines.push(Vec::new());
            lines.push(vec![
                Segment::styled("Docs: ", Style::new().dim()),
                Segment::styled(url.clone(), Style::new().underline()),
            ]);
        }
    }

    let panel = Panel::new(lines)
        .title(Text::new(error.category().to_string()))
        .border_style(colored("red"))
        .padding((1, 2));
    segments_to_string(&panel.render(76))
}

fn suggestion_lines(suggestions: &[FixSuggestion]) -> Vec<Vec<Segment<'static>>> {
    let mut lines = Vec::new();
    for (i, suggestion) in suggestions.iter().enumerate() {
        for (j, cmd) in suggestion.commands.iter().enumerate() {
            let prefix = if j == 0 {
                format!("  {}. ", i + 1)
            } else {
                "     Or: ".to_string()
            };
            lines.push(vec![
                Segment::plain(prefix),
                Segment::styled(cmd.clone(), colored("cyan")),
            ]);
        }
    }
    lines
}

fn colored(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |color| Style::new().color(color))
}

fn segments_to_string(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| {
            seg.style.as_ref().map_or_else(
                || seg.text.to_string(),
                |style| style.render(&seg.text, ColorSystem::TrueColor),
            )
        })
        .collect()
}

// =============================================================================
// Simple Text Rendering
// =============================================================================

/// Error code, message, and the first runnable fix command.
fn render_simple(error: &OpsError) -> String {
    let mut lines = vec![format!("Error [{}]: {}", error.error_code(), error)];

    let fix = error
        .fix_suggestions()
        .into_iter()
        .flat_map(|s| s.commands)
        .find(|cmd| !cmd.starts_with('#'));
    if let Some(cmd) = fix {
        lines.push(format!("Fix: {cmd}"));
    }

    lines.join("\n")
}

// =============================================================================
// JSON Rendering
// =============================================================================

#[derive(serde::Serialize)]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    suggestions: Vec<FixSuggestion>,
}

impl ErrorJson {
    fn from_error(error: &OpsError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            provider: error.provider().map(String::from),
            suggestions: error.fix_suggestions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_contains, assert_no_ansi_codes};

    fn unknown_provider() -> OpsError {
        OpsError::UnknownProvider {
            name: "oracle".to_string(),
            valid: "gcp, aws, azure".to_string(),
        }
    }

    #[test]
    fn simple_output_has_code_and_message() {
        let out = render_simple(&unknown_provider());
        assert_contains!(&out, "Error [OPS-C010]");
        assert_contains!(&out, "oracle");
        assert_no_ansi_codes!(&out);
    }

    #[test]
    fn simple_output_suggests_install_command() {
        let out = render_simple(&OpsError::CliNotFound {
            name: "gcloud".to_string(),
        });
        assert_contains!(&out, "Fix: ");
    }

    #[test]
    fn json_output_is_structured() {
        let out = render_error(&unknown_provider(), OutputFormat::Json, true, false);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["error_code"], "OPS-C010");
        assert_eq!(parsed["category"], "Configuration error");
        assert_eq!(parsed["is_retryable"], false);
        assert!(parsed["suggestions"].is_array());
    }

    #[test]
    fn json_output_names_provider() {
        let err = OpsError::Timeout {
            provider: "aws".to_string(),
            seconds: 20,
        };
        let out = render_error_json(&err, false);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["provider"], "aws");
        assert_eq!(parsed["is_retryable"], true);
    }

    #[test]
    fn markdown_falls_back_to_pretty_json() {
        let out = render_error(&unknown_provider(), OutputFormat::Md, true, false);
        assert!(out.contains('\n'));
        assert!(serde_json::from_str::<serde_json::Value>(&out).is_ok());
    }
}
