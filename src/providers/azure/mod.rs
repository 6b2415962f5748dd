//! Azure adapter.
//!
//! - Status: `az account show`, falling back to `az account list`
//! - Inventory: `az vm list -d` and `az network public-ip list`
//! - Costs: `az consumption usage list`

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{amount, call_failed, command_debug, parse_timestamp, require_cli};
use crate::core::cli_runner::{
    BILLING_TIMEOUT, CLI_TIMEOUT, parse_json_output, run_command, run_json_command,
};
use crate::core::models::{NormalizedCost, ProviderStatus, Resource, Subscription};
use crate::core::provider::{CloudProvider, Provider, ProviderParams};
use crate::error::Result;

const AZ: &str = "az";

/// Azure adapter over the `az` CLI.
#[derive(Debug, Clone, Default)]
pub struct AzureProvider {
    subscription_id: Option<String>,
}

impl AzureProvider {
    /// Build from shared params, using `subscription_id`.
    #[must_use]
    pub fn from_params(params: &ProviderParams) -> Self {
        Self {
            subscription_id: params.subscription_id.clone(),
        }
    }

    /// `command` plus `--output json` and the subscription, if one is set.
    fn args<'a>(&'a self, command: &[&'a str]) -> Vec<&'a str> {
        let mut args = command.to_vec();
        args.extend(["--output", "json"]);
        if let Some(sub) = &self.subscription_id {
            args.push("--subscription");
            args.push(sub);
        }
        args
    }
}

// =============================================================================
// CLI Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    tenant_id: Option<String>,
    user: Option<AccountUser>,
}

#[derive(Debug, Deserialize)]
struct AccountUser {
    name: Option<String>,
}

fn enabled_subscriptions(accounts: Vec<Account>) -> Vec<Subscription> {
    accounts
        .into_iter()
        .filter(|a| a.state == "Enabled")
        .map(|a| Subscription {
            id: a.id,
            name: a.name,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageDetail {
    consumed_service: Option<String>,
    meter_details: Option<MeterDetails>,
    instance_location: Option<String>,
    instance_id: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pretax_cost: f64,
    currency: Option<String>,
    usage_start: Option<String>,
    date: Option<String>,
    subscription_guid: Option<String>,
    tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeterDetails {
    meter_category: Option<String>,
}

fn tag_value(tags: &BTreeMap<String, String>, key: &str) -> Option<String> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

impl UsageDetail {
    fn into_cost(self) -> Option<NormalizedCost> {
        let timestamp = self
            .usage_start
            .as_deref()
            .or(self.date.as_deref())
            .and_then(parse_timestamp)?;
        let service = self
            .meter_details
            .and_then(|m| m.meter_category)
            .or(self.consumed_service)
            .unwrap_or_else(|| "Unknown".to_string());

        let mut cost = NormalizedCost::new(Provider::Azure.cli_name(), service, self.pretax_cost, timestamp);
        cost.region = self.instance_location.unwrap_or_else(|| "global".to_string());
        cost.resource_id = self.instance_id.unwrap_or_default();
        cost.account_id = self.subscription_guid;
        if let Some(currency) = self.currency {
            cost.currency = currency;
        }
        if let Some(tags) = self.tags {
            cost.team = tag_value(&tags, "team");
            cost.environment = tag_value(&tags, "environment");
            cost.tags = tags;
        }
        Some(cost)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualMachine {
    id: String,
    name: String,
    power_state: Option<String>,
    hardware_profile: Option<HardwareProfile>,
    public_ips: Option<String>,
    time_created: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardwareProfile {
    vm_size: Option<String>,
}

impl VirtualMachine {
    fn into_resource(self) -> Resource {
        let mut resource =
            Resource::new(self.id, self.name, "virtual_machine", Provider::Azure.cli_name());
        // "VM running" / "VM deallocated"
        resource.state = self.power_state.map(|s| {
            s.strip_prefix("VM ").unwrap_or(&s).to_string()
        });
        resource.external_ip = self
            .public_ips
            .as_deref()
            .and_then(|ips| ips.split(',').map(str::trim).find(|ip| !ip.is_empty()))
            .map(str::to_string);
        resource.class_type = self.hardware_profile.and_then(|h| h.vm_size);
        resource.creation_date = self.time_created.as_deref().and_then(parse_timestamp);
        resource
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicIp {
    id: String,
    name: String,
    ip_address: Option<String>,
    ip_configuration: Option<Value>,
}

impl PublicIp {
    fn into_resource(self) -> Resource {
        let mut resource = Resource::new(self.id, self.name, "ip_address", Provider::Azure.cli_name());
        let attached = self.ip_configuration.is_some_and(|c| !c.is_null());
        resource.state = Some(if attached { "in-use" } else { "reserved" }.to_string());
        resource.external_ip = self.ip_address;
        resource
    }
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        Provider::Azure.cli_name()
    }

    async fn status(&self) -> ProviderStatus {
        let path = match require_cli(AZ, "Azure CLI not found on PATH").await {
            Ok(path) => path,
            Err(status) => return status,
        };

        let mut status = ProviderStatus {
            installed: true,
            ..ProviderStatus::default()
        };
        status.debug.insert("which".to_string(), json!(path));

        let show = run_command(AZ, &["account", "show", "--output", "json"], CLI_TIMEOUT).await;
        let show_stderr = match show {
            Ok(output) if output.success() => {
                status.debug.insert("account_show".to_string(), command_debug(&output));
                status.authenticated = true;
                if let Ok(Some(account)) = parse_json_output::<Option<Account>>(&output.stdout) {
                    if let Some(user) = account.user.and_then(|u| u.name) {
                        status.debug.insert("user".to_string(), json!(user));
                        status.account = Some(user);
                    }
                    status.debug.insert(
                        "tenant".to_string(),
                        json!(account.tenant_id.unwrap_or_default()),
                    );
                    if !account.id.is_empty() {
                        status.subscriptions = vec![Subscription {
                            id: account.id,
                            name: account.name,
                        }];
                    }
                }
                None
            }
            Ok(output) => {
                status.debug.insert("account_show".to_string(), command_debug(&output));
                Some(output.stderr_excerpt(300))
            }
            Err(e) => Some(e.to_string()),
        };

        if let Some(show_stderr) = show_stderr {
            match run_command(AZ, &["account", "list", "--output", "json"], CLI_TIMEOUT).await {
                Ok(list) if list.success() => {
                    status.debug.insert(
                        "account_list".to_string(),
                        json!({ "returncode": list.exit_code, "stdout_len": list.stdout.len() }),
                    );
                    let accounts: Vec<Account> =
                        parse_json_output::<Option<Vec<Account>>>(&list.stdout)
                            .ok()
                            .flatten()
                            .unwrap_or_default();
                    if accounts.is_empty() {
                        status.error = Some("No Azure subscriptions. Run: az login".to_string());
                    } else {
                        status.authenticated = true;
                        status.subscriptions = enabled_subscriptions(accounts);
                    }
                }
                _ => {
                    status.error = Some(if show_stderr.is_empty() {
                        "Azure credentials not configured".to_string()
                    } else {
                        show_stderr
                    });
                }
            }
        }

        status.debug.insert(
            "env".to_string(),
            json!({
                "AZURE_CONFIG_DIR": std::env::var("AZURE_CONFIG_DIR")
                    .unwrap_or_else(|_| "(not set)".to_string()),
            }),
        );

        status
    }

    async fn costs(&self, days: u32) -> Result<Vec<NormalizedCost>> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days));
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();

        let args = self.args(&[
            "consumption",
            "usage",
            "list",
            "--start-date",
            &start,
            "--end-date",
            &end,
        ]);
        let rows: Option<Vec<UsageDetail>> = run_json_command(AZ, &args, BILLING_TIMEOUT)
            .await
            .map_err(|e| call_failed(Provider::Azure, "costs", &e))?;

        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(UsageDetail::into_cost)
            .collect())
    }

    async fn infrastructure(&self) -> Result<Vec<Resource>> {
        let vm_args = self.args(&["vm", "list", "-d"]);
        let ip_args = self.args(&["network", "public-ip", "list"]);

        let (vms, ips) = tokio::join!(
            run_json_command::<Option<Vec<VirtualMachine>>>(AZ, &vm_args, CLI_TIMEOUT),
            run_json_command::<Option<Vec<PublicIp>>>(AZ, &ip_args, CLI_TIMEOUT),
        );

        let mut resources: Vec<Resource> = vms
            .map_err(|e| call_failed(Provider::Azure, "infrastructure", &e))?
            .unwrap_or_default()
            .into_iter()
            .map(VirtualMachine::into_resource)
            .collect();

        match ips {
            Ok(list) => resources.extend(list.unwrap_or_default().into_iter().map(PublicIp::into_resource)),
            Err(e) => tracing::warn!(provider = "azure", error = %e, "Public IP listing failed"),
        }

        Ok(resources)
    }
}
