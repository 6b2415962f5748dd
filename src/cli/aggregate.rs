//! Aggregate command implementation.

use std::sync::Arc;

use crate::core::orchestrator::Orchestrator;
use crate::core::provider::ProviderRegistry;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Analyze the configured providers concurrently and print the merged result.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    tracing::debug!(
        providers = ?config.providers,
        source = %config.sources.providers,
        days = config.days,
        "Starting aggregate analysis"
    );

    let orchestrator = Orchestrator::new(Arc::new(ProviderRegistry::with_defaults()));
    let merged = orchestrator
        .aggregate_analysis(&config.providers, config.days, &config.params)
        .await?;

    let output = render::render_analysis(
        &merged,
        "aggregate",
        config.format,
        config.pretty,
        config.no_color,
    )?;
    println!("{}", output.trim_end());
    Ok(())
}
