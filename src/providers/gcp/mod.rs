//! Google Cloud adapter.
//!
//! - Status: `gcloud auth list`
//! - Inventory: `gcloud compute instances list` and `gcloud compute addresses list`
//! - Costs: `bq query` against a billing export table
//!
//! Cost data is only available when a billing export table is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{amount, call_failed, command_debug, last_segment, parse_timestamp, require_cli};
use crate::core::cli_runner::{
    BILLING_TIMEOUT, CLI_TIMEOUT, parse_json_output, run_command, run_json_command,
};
use crate::core::models::{NormalizedCost, ProviderStatus, Resource};
use crate::core::provider::{CloudProvider, Provider, ProviderParams};
use crate::error::{OpsError, Result};

const GCLOUD: &str = "gcloud";
const BQ: &str = "bq";

/// GCP adapter over `gcloud` and `bq`.
#[derive(Debug, Clone, Default)]
pub struct GcpProvider {
    project_id: Option<String>,
    billing_table: Option<String>,
}

impl GcpProvider {
    /// Build from shared params, using `project_id` and `billing_table`.
    ///
    /// # Errors
    /// `ProviderInit` if the billing table name contains characters that are
    /// not valid in a BigQuery table path.
    pub fn from_params(params: &ProviderParams) -> Result<Self> {
        if let Some(table) = &params.billing_table {
            if !is_valid_table(table) {
                return Err(OpsError::ProviderInit {
                    provider: Provider::Gcp.cli_name().to_string(),
                    reason: format!("invalid billing table name: {table}"),
                });
            }
        }
        Ok(Self {
            project_id: params.project_id.clone(),
            billing_table: params.billing_table.clone(),
        })
    }

    fn project_flag(&self, flag: &str) -> Option<String> {
        self.project_id.as_ref().map(|p| format!("{flag}={p}"))
    }
}

fn is_valid_table(table: &str) -> bool {
    !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Standard SQL over the detailed billing export, grouped per day and service.
#[must_use]
pub fn billing_query(table: &str, days: u32) -> String {
    format!(
        "SELECT service.description AS service, \
         IFNULL(location.region, 'global') AS region, \
         IFNULL(project.id, '') AS project, \
         FORMAT_DATE('%Y-%m-%d', DATE(usage_start_time)) AS day, \
         (SELECT value FROM UNNEST(labels) WHERE key = 'team') AS team, \
         (SELECT value FROM UNNEST(labels) WHERE key = 'environment') AS environment, \
         SUM(cost) AS cost, currency \
         FROM `{table}` \
         WHERE usage_start_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {days} DAY) \
         GROUP BY service, region, project, day, team, environment, currency \
         ORDER BY day"
    )
}

// =============================================================================
// CLI Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GcloudAccount {
    account: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct BillingRow {
    service: Option<String>,
    region: Option<String>,
    project: Option<String>,
    day: String,
    team: Option<String>,
    environment: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    cost: f64,
    currency: Option<String>,
}

impl BillingRow {
    fn into_cost(self) -> Option<NormalizedCost> {
        let timestamp = parse_timestamp(&self.day)?;
        let mut cost = NormalizedCost::new(
            Provider::Gcp.cli_name(),
            self.service.unwrap_or_else(|| "Unknown".to_string()),
            self.cost,
            timestamp,
        );
        cost.region = self.region.unwrap_or_else(|| "global".to_string());
        cost.account_id = self.project.filter(|p| !p.is_empty());
        cost.team = self.team;
        cost.environment = self.environment;
        if let Some(currency) = self.currency {
            cost.currency = currency;
        }
        Some(cost)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceInstance {
    #[serde(default)]
    id: String,
    name: String,
    status: Option<String>,
    machine_type: Option<String>,
    creation_timestamp: Option<String>,
    #[serde(default)]
    network_interfaces: Vec<NetworkInterface>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    #[serde(default)]
    access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Deserialize)]
struct AccessConfig {
    #[serde(rename = "natIP")]
    nat_ip: Option<String>,
}

impl GceInstance {
    fn into_resource(self) -> Resource {
        let external_ip = self
            .network_interfaces
            .iter()
            .flat_map(|ni| ni.access_configs.iter())
            .find_map(|ac| ac.nat_ip.clone());
        let id = if self.id.is_empty() {
            self.name.clone()
        } else {
            self.id
        };
        let mut resource = Resource::new(id, self.name, "compute_instance", Provider::Gcp.cli_name());
        resource.state = self.status;
        resource.external_ip = external_ip;
        resource.class_type = self.machine_type.as_deref().map(|m| last_segment(m).to_string());
        resource.creation_date = self.creation_timestamp.as_deref().and_then(parse_timestamp);
        resource.dependencies = self
            .labels
            .into_iter()
            .filter(|(k, _)| k == "depends-on")
            .map(|(_, v)| v)
            .collect();
        resource
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceAddress {
    #[serde(default)]
    id: String,
    name: String,
    address: Option<String>,
    status: Option<String>,
    creation_timestamp: Option<String>,
}

impl GceAddress {
    fn into_resource(self) -> Resource {
        let id = if self.id.is_empty() {
            self.name.clone()
        } else {
            self.id
        };
        let mut resource = Resource::new(id, self.name, "ip_address", Provider::Gcp.cli_name());
        resource.state = self.status;
        resource.external_ip = self.address;
        resource.creation_date = self.creation_timestamp.as_deref().and_then(parse_timestamp);
        resource
    }
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl CloudProvider for GcpProvider {
    fn name(&self) -> &str {
        Provider::Gcp.cli_name()
    }

    async fn status(&self) -> ProviderStatus {
        let path = match require_cli(GCLOUD, "gcloud CLI not found on PATH").await {
            Ok(path) => path,
            Err(status) => return status,
        };

        let mut status = ProviderStatus {
            installed: true,
            ..ProviderStatus::default()
        };
        status.debug.insert("which".to_string(), json!(path));
        if let Some(project) = &self.project_id {
            status.debug.insert("project".to_string(), json!(project));
        }

        match run_command(GCLOUD, &["auth", "list", "--format=json"], CLI_TIMEOUT).await {
            Ok(output) => {
                status.debug.insert("auth_list".to_string(), command_debug(&output));
                if output.success() {
                    let accounts: Vec<GcloudAccount> =
                        parse_json_output::<Option<Vec<GcloudAccount>>>(&output.stdout)
                            .ok()
                            .flatten()
                            .unwrap_or_default();
                    match accounts
                        .into_iter()
                        .find(|a| a.status.eq_ignore_ascii_case("ACTIVE"))
                    {
                        Some(active) => {
                            status.authenticated = true;
                            status.account = Some(active.account);
                        }
                        None => {
                            status.error =
                                Some("No active gcloud account. Run: gcloud auth login".to_string());
                        }
                    }
                } else {
                    let stderr = output.stderr_excerpt(300);
                    status.error = Some(if stderr.is_empty() {
                        "gcloud credentials not configured".to_string()
                    } else {
                        stderr
                    });
                }
            }
            Err(e) => status.error = Some(e.to_string()),
        }

        status
    }

    async fn costs(&self, days: u32) -> Result<Vec<NormalizedCost>> {
        let table = self.billing_table.as_deref().ok_or_else(|| OpsError::AdapterCall {
            provider: Provider::Gcp.cli_name().to_string(),
            operation: "costs".to_string(),
            reason: "no billing export table configured (providers.gcp.billing_table)".to_string(),
        })?;

        let sql = billing_query(table, days);
        let project = self.project_flag("--project_id");
        let mut args = vec!["query", "--use_legacy_sql=false", "--format=json", "--max_rows=100000"];
        if let Some(flag) = &project {
            args.push(flag);
        }
        args.push(&sql);

        let rows: Option<Vec<BillingRow>> = run_json_command(BQ, &args, BILLING_TIMEOUT)
            .await
            .map_err(|e| call_failed(Provider::Gcp, "costs", &e))?;

        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(BillingRow::into_cost)
            .collect())
    }

    async fn infrastructure(&self) -> Result<Vec<Resource>> {
        let project = self.project_flag("--project");
        let mut instance_args = vec!["compute", "instances", "list", "--format=json"];
        let mut address_args = vec!["compute", "addresses", "list", "--format=json"];
        if let Some(flag) = &project {
            instance_args.push(flag);
            address_args.push(flag);
        }

        let (instances, addresses) = tokio::join!(
            run_json_command::<Option<Vec<GceInstance>>>(GCLOUD, &instance_args, CLI_TIMEOUT),
            run_json_command::<Option<Vec<GceAddress>>>(GCLOUD, &address_args, CLI_TIMEOUT),
        );

        let mut resources: Vec<Resource> = instances
            .map_err(|e| call_failed(Provider::Gcp, "infrastructure", &e))?
            .unwrap_or_default()
            .into_iter()
            .map(GceInstance::into_resource)
            .collect();

        match addresses {
            Ok(list) => resources.extend(
                list.unwrap_or_default()
                    .into_iter()
                    .map(GceAddress::into_resource),
            ),
            Err(e) => tracing::warn!(provider = "gcp", error = %e, "Address listing failed"),
        }

        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_injected_table_names() {
        let params = ProviderParams {
            billing_table: Some("proj.ds.t` OR 1=1 --".to_string()),
            ..ProviderParams::default()
        };
        let err = GcpProvider::from_params(&params).unwrap_err();
        assert!(matches!(err, OpsError::ProviderInit { .. }));

        let ok = ProviderParams {
            billing_table: Some("my-proj.billing.gcp_billing_export_v1_0123".to_string()),
            ..ProviderParams::default()
        };
        assert!(GcpProvider::from_params(&ok).is_ok());
    }

    #[test]
    fn billing_query_embeds_table_and_window() {
        let sql = billing_query("p.d.t", 30);
        assert!(sql.contains("`p.d.t`"));
        assert!(sql.contains("INTERVAL 30 DAY"));
    }

    #[test]
    fn billing_rows_normalize() {
        let raw = r#"[
            {"service": "Compute Engine", "region": "us-central1", "project": "demo",
             "day": "2026-01-02", "team": "core", "environment": null,
             "cost": "12.5", "currency": "USD"},
            {"service": null, "region": null, "project": "", "day": "bad",
             "cost": "1", "currency": "USD"}
        ]"#;
        let rows: Vec<BillingRow> = serde_json::from_str(raw).unwrap();
        let costs: Vec<_> = rows.into_iter().filter_map(BillingRow::into_cost).collect();
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0].service, "Compute Engine");
        assert_eq!(costs[0].account_id.as_deref(), Some("demo"));
        assert_eq!(costs[0].team.as_deref(), Some("core"));
        assert!((costs[0].cost - 12.5).abs() < 1e-12);
        assert_eq!(costs[0].day(), "2026-01-02");
    }

    #[test]
    fn instances_normalize() {
        let raw = r#"[{
            "id": "123",
            "name": "web-1",
            "status": "RUNNING",
            "machineType": "https://www.googleapis.com/compute/v1/projects/p/zones/z/machineTypes/e2-medium",
            "creationTimestamp": "2025-12-01T08:00:00.000-08:00",
            "networkInterfaces": [{"accessConfigs": [{"natIP": "34.1.2.3"}]}]
        }]"#;
        let instances: Vec<GceInstance> = serde_json::from_str(raw).unwrap();
        let resource = instances.into_iter().next().unwrap().into_resource();
        assert_eq!(resource.id, "123");
        assert!(resource.is_running());
        assert_eq!(resource.class_type.as_deref(), Some("e2-medium"));
        assert_eq!(resource.external_ip.as_deref(), Some("34.1.2.3"));
        assert!(resource.creation_date.is_some());
    }

    #[test]
    fn reserved_address_is_ip_resource() {
        let raw = r#"[{"name": "static-1", "address": "35.0.0.1", "status": "RESERVED"}]"#;
        let addresses: Vec<GceAddress> = serde_json::from_str(raw).unwrap();
        let resource = addresses.into_iter().next().unwrap().into_resource();
        assert_eq!(resource.id, "static-1");
        assert_eq!(resource.type_key(), "ip_address");
        assert_eq!(resource.state.as_deref(), Some("RESERVED"));
    }

    #[tokio::test]
    async fn costs_without_billing_table_fail() {
        let provider = GcpProvider::default();
        let err = provider.costs(30).await.unwrap_err();
        assert!(err.to_string().contains("billing"));
    }
}
