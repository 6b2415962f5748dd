//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::models::{AnalysisResult, StatusSnapshot};
use crate::error::Result;

pub use robot::adapt_analysis_result;

/// Render an analysis result produced by `command`.
pub fn render_analysis(
    result: &AnalysisResult,
    command: &str,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_analysis(result, no_color),
        OutputFormat::Json => robot::render_analysis_json(result, command, pretty),
        OutputFormat::Md => robot::render_analysis_md(result),
    }
}

/// Render a provider status snapshot.
pub fn render_status(
    snapshot: &StatusSnapshot,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_status(snapshot, no_color),
        OutputFormat::Json => robot::render_status_json(snapshot, pretty),
        OutputFormat::Md => robot::render_status_md(snapshot),
    }
}
