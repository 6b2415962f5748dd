//! AWS adapter.
//!
//! - Status: `aws sts get-caller-identity`
//! - Inventory: `aws ec2 describe-instances` and `aws ec2 describe-addresses`
//! - Costs: `aws ce get-cost-and-usage`, daily, grouped by service

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{amount, call_failed, command_debug, parse_timestamp, require_cli};
use crate::core::cli_runner::{CLI_TIMEOUT, parse_json_output, run_command, run_json_command};
use crate::core::models::{NormalizedCost, ProviderStatus, Resource};
use crate::core::provider::{CloudProvider, Provider, ProviderParams};
use crate::error::Result;

const AWS: &str = "aws";
const DEFAULT_REGION: &str = "us-east-1";

/// Cost Explorer is only served from this region.
const COST_EXPLORER_REGION: &str = "us-east-1";

/// Upper bound on Cost Explorer pages followed per call.
const MAX_PAGES: usize = 20;

/// AWS adapter over the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsProvider {
    region: String,
    profile: Option<String>,
}

impl AwsProvider {
    /// Build from shared params, using `region` and `profile`.
    #[must_use]
    pub fn from_params(params: &ProviderParams) -> Self {
        Self {
            region: params
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            profile: params.profile.clone(),
        }
    }

    /// Global flags for every call, with `region` overriding the adapter's own.
    fn global_args(&self, region: &str) -> Vec<String> {
        let mut args = vec![
            "--region".to_string(),
            region.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        command: &[&str],
        region: &str,
    ) -> Result<T> {
        let globals = self.global_args(region);
        let args: Vec<&str> = command
            .iter()
            .copied()
            .chain(globals.iter().map(String::as_str))
            .collect();
        run_json_command(AWS, &args, CLI_TIMEOUT).await
    }
}

// =============================================================================
// CLI Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentity {
    account: Option<String>,
    arn: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostAndUsage {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultByTime {
    time_period: TimePeriod,
    #[serde(default)]
    groups: Vec<CostGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimePeriod {
    start: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostGroup {
    #[serde(default)]
    keys: Vec<String>,
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Metrics {
    unblended_cost: Metric,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Metric {
    #[serde(default, deserialize_with = "amount")]
    amount: f64,
    #[serde(default)]
    unit: Option<String>,
}

fn normalize_costs(pages: Vec<CostAndUsage>) -> Vec<NormalizedCost> {
    let mut costs = Vec::new();
    for result in pages.into_iter().flat_map(|p| p.results_by_time) {
        let Some(timestamp) = parse_timestamp(&result.time_period.start) else {
            continue;
        };
        for group in result.groups {
            let service = group
                .keys
                .into_iter()
                .next()
                .unwrap_or_else(|| "Unknown".to_string());
            let mut cost = NormalizedCost::new(
                Provider::Aws.cli_name(),
                service,
                group.metrics.unblended_cost.amount,
                timestamp,
            );
            if let Some(unit) = group.metrics.unblended_cost.unit {
                cost.currency = unit;
            }
            costs.push(cost);
        }
    }
    costs
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    instance_id: String,
    instance_type: Option<String>,
    state: Option<InstanceState>,
    public_ip_address: Option<String>,
    launch_time: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceState {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

fn name_tag(tags: &[Tag]) -> Option<String> {
    tags.iter().find(|t| t.key == "Name").map(|t| t.value.clone())
}

impl Ec2Instance {
    fn into_resource(self) -> Resource {
        let name = name_tag(&self.tags).unwrap_or_else(|| self.instance_id.clone());
        let mut resource =
            Resource::new(self.instance_id, name, "compute_instance", Provider::Aws.cli_name());
        resource.state = self.state.map(|s| s.name);
        resource.external_ip = self.public_ip_address;
        resource.class_type = self.instance_type;
        resource.creation_date = self.launch_time.as_deref().and_then(parse_timestamp);
        resource
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAddresses {
    #[serde(default)]
    addresses: Vec<ElasticIp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ElasticIp {
    allocation_id: Option<String>,
    public_ip: Option<String>,
    association_id: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

impl ElasticIp {
    fn into_resource(self) -> Resource {
        let id = self
            .allocation_id
            .or_else(|| self.public_ip.clone())
            .unwrap_or_default();
        let name = name_tag(&self.tags).unwrap_or_else(|| id.clone());
        let mut resource = Resource::new(id, name, "ip_address", Provider::Aws.cli_name());
        resource.state = Some(
            if self.association_id.is_some() {
                "in-use"
            } else {
                "reserved"
            }
            .to_string(),
        );
        resource.external_ip = self.public_ip;
        resource
    }
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        Provider::Aws.cli_name()
    }

    async fn status(&self) -> ProviderStatus {
        let path = match require_cli(AWS, "AWS CLI not found on PATH").await {
            Ok(path) => path,
            Err(status) => return status,
        };

        let mut status = ProviderStatus {
            installed: true,
            ..ProviderStatus::default()
        };
        status.debug.insert("which".to_string(), json!(path));

        let globals = self.global_args(&self.region);
        let mut args = vec!["sts", "get-caller-identity"];
        args.extend(globals.iter().map(String::as_str));

        match run_command(AWS, &args, CLI_TIMEOUT).await {
            Ok(output) => {
                status.debug.insert("sts".to_string(), command_debug(&output));
                if output.success() {
                    status.authenticated = true;
                    if let Ok(Some(identity)) =
                        parse_json_output::<Option<CallerIdentity>>(&output.stdout)
                    {
                        status.account = identity.account;
                        status
                            .debug
                            .insert("arn".to_string(), json!(identity.arn.unwrap_or_default()));
                    }
                } else {
                    let stderr = output.stderr_excerpt(300);
                    status.error = Some(if stderr.is_empty() {
                        "AWS credentials not configured".to_string()
                    } else {
                        stderr
                    });
                }
            }
            Err(e) => status.error = Some(e.to_string()),
        }

        let env = |key: &str| std::env::var(key).unwrap_or_else(|_| "(not set)".to_string());
        status.debug.insert(
            "env".to_string(),
            json!({
                "AWS_PROFILE": env("AWS_PROFILE"),
                "AWS_DEFAULT_REGION": env("AWS_DEFAULT_REGION"),
                "AWS_ACCESS_KEY_ID": if std::env::var_os("AWS_ACCESS_KEY_ID").is_some() {
                    "***set***"
                } else {
                    "(not set)"
                },
            }),
        );

        status
    }

    async fn costs(&self, days: u32) -> Result<Vec<NormalizedCost>> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days));
        let period = format!(
            "Start={},End={}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut command = vec![
                "ce",
                "get-cost-and-usage",
                "--time-period",
                period.as_str(),
                "--granularity",
                "DAILY",
                "--metrics",
                "UnblendedCost",
                "--group-by",
                "Type=DIMENSION,Key=SERVICE",
            ];
            if let Some(t) = &token {
                command.push("--next-page-token");
                command.push(t);
            }
            let page: CostAndUsage = self
                .call(&command, COST_EXPLORER_REGION)
                .await
                .map_err(|e| call_failed(Provider::Aws, "costs", &e))?;
            token = page.next_page_token.clone().filter(|t| !t.is_empty());
            pages.push(page);
            if token.is_none() {
                break;
            }
        }

        Ok(normalize_costs(pages))
    }

    async fn infrastructure(&self) -> Result<Vec<Resource>> {
        let (instances, addresses) = tokio::join!(
            self.call::<DescribeInstances>(&["ec2", "describe-instances"], &self.region),
            self.call::<DescribeAddresses>(&["ec2", "describe-addresses"], &self.region),
        );

        let mut resources: Vec<Resource> = instances
            .map_err(|e| call_failed(Provider::Aws, "infrastructure", &e))?
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(Ec2Instance::into_resource)
            .collect();

        match addresses {
            Ok(list) => resources.extend(list.addresses.into_iter().map(ElasticIp::into_resource)),
            Err(e) => tracing::warn!(provider = "aws", error = %e, "Elastic IP listing failed"),
        }

        Ok(resources)
    }
}
