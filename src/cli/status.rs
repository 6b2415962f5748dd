//! Status command implementation.

use std::sync::Arc;

use crate::core::provider::ProviderRegistry;
use crate::core::status_cache::StatusCache;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Probe every provider CLI and print the snapshot.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let cache = StatusCache::new(registry, config.params.clone());

    let snapshot = cache.get_all_statuses().await;
    let authenticated = snapshot
        .providers
        .values()
        .filter(|status| status.authenticated)
        .count();
    tracing::debug!(
        provider_count = snapshot.providers.len(),
        authenticated,
        "Status snapshot ready"
    );

    let output = render::render_status(&snapshot, config.format, config.pretty, config.no_color)?;
    println!("{}", output.trim_end());
    Ok(())
}
