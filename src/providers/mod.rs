//! Cloud provider adapters.
//!
//! Each submodule drives one cloud CLI (`gcloud`/`bq`, `aws`, `az`) through
//! [`crate::core::cli_runner`] and normalizes its JSON into the core models.

pub mod aws;
pub mod azure;
pub mod gcp;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::core::cli_runner::{CliOutput, locate};
use crate::core::models::ProviderStatus;
use crate::core::provider::{CloudProvider, ProviderFactory, ProviderParams};
use crate::error::OpsError;

pub use crate::core::provider::Provider;

/// Factory for a built-in provider. Reads only the params that provider uses.
#[must_use]
pub fn factory_for(provider: Provider) -> ProviderFactory {
    match provider {
        Provider::Gcp => Arc::new(|params: &ProviderParams| {
            Ok(Arc::new(gcp::GcpProvider::from_params(params)?) as Arc<dyn CloudProvider>)
        }),
        Provider::Aws => Arc::new(|params: &ProviderParams| {
            Ok(Arc::new(aws::AwsProvider::from_params(params)) as Arc<dyn CloudProvider>)
        }),
        Provider::Azure => Arc::new(|params: &ProviderParams| {
            Ok(Arc::new(azure::AzureProvider::from_params(params)) as Arc<dyn CloudProvider>)
        }),
    }
}

// =============================================================================
// Shared Adapter Helpers
// =============================================================================

/// Locate `binary` on PATH, or build the not-installed status.
async fn require_cli(binary: &str, missing: &str) -> Result<String, ProviderStatus> {
    if let Some(path) = locate(binary).await {
        Ok(path.display().to_string())
    } else {
        let mut status = ProviderStatus::failed(missing);
        status.debug.insert("which".to_string(), Value::Null);
        Err(status)
    }
}

/// Trimmed command output for a status `debug` map.
fn command_debug(output: &CliOutput) -> Value {
    json!({
        "stdout": output.stdout_excerpt(300),
        "stderr": output.stderr_excerpt(300),
        "returncode": output.exit_code,
    })
}

/// Wrap a CLI failure as an adapter call failure for `provider`.
fn call_failed(provider: Provider, operation: &str, err: &OpsError) -> OpsError {
    OpsError::AdapterCall {
        provider: provider.cli_name().to_string(),
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

/// Parse RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Last path segment of a resource URL (`.../zones/us-central1-a` -> `us-central1-a`).
fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Amounts arrive as JSON numbers or as numeric strings depending on the CLI.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0.0),
        Raw::Null => 0.0,
    })
}
