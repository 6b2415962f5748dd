//! Analyze command implementation.

use std::sync::Arc;

use crate::cli::args::AnalyzeArgs;
use crate::core::orchestrator::Orchestrator;
use crate::core::provider::ProviderRegistry;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Analyze one provider and print the result.
pub async fn execute(args: &AnalyzeArgs, config: &ResolvedConfig) -> Result<()> {
    let provider = args.provider.trim().to_lowercase();
    tracing::debug!(%provider, days = config.days, "Starting analysis");

    let orchestrator = Orchestrator::new(Arc::new(ProviderRegistry::with_defaults()));
    let result = orchestrator
        .analyze(&provider, config.days, &config.params)
        .await?;

    let output = render::render_analysis(
        &result,
        "analyze",
        config.format,
        config.pretty,
        config.no_color,
    )?;
    println!("{}", output.trim_end());
    Ok(())
}
