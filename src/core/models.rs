//! Core data models.
//!
//! Cost line items and discovered resources come out of the provider
//! adapters. [`AnalysisResult`] is what the orchestrator builds from them and
//! what the aggregation engine merges. Status types describe the health of a
//! provider's CLI and credentials.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Normalized Cost
// =============================================================================

/// One billing line item, normalized across providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedCost {
    pub provider: String,
    pub service: String,
    pub region: String,
    pub resource_id: String,
    pub cost: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl NormalizedCost {
    /// Create a USD line item with no tags.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        service: impl Into<String>,
        cost: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
            region: "global".to_string(),
            resource_id: String::new(),
            cost,
            currency: "USD".to_string(),
            timestamp,
            account_id: None,
            team: None,
            environment: None,
            tags: BTreeMap::new(),
        }
    }

    /// Calendar day of the line item as `YYYY-MM-DD`.
    #[must_use]
    pub fn day(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    /// Whether the item carries any allocation tag (team, environment or free-form).
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.team.is_some() || self.environment.is_some() || !self.tags.is_empty()
    }
}

// =============================================================================
// Resource
// =============================================================================

/// One discovered infrastructure unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    pub name: String,

    /// Resource type such as `compute_instance` or `ip_address`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ip: Option<String>,

    /// Average CPU utilization as a fraction (0.0-1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_avg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_avg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_30d: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,

    /// Machine class or instance type (`e2-medium`, `t3.small`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,

    #[serde(default)]
    pub risk_score: f64,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Resource {
    /// Create a bare resource with only identity fields set.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: Some(kind.into()),
            provider: provider.into(),
            state: None,
            external_ip: None,
            cpu_avg: None,
            memory_avg: None,
            cost_30d: None,
            creation_date: None,
            class_type: None,
            risk_score: 0.0,
            dependencies: Vec::new(),
        }
    }

    /// Histogram key for this resource's type.
    #[must_use]
    pub fn type_key(&self) -> &str {
        self.kind.as_deref().filter(|k| !k.is_empty()).unwrap_or("unknown")
    }

    /// Whether the resource reports an active state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.as_deref().is_some_and(|s| {
            let upper = s.to_ascii_uppercase();
            matches!(upper.as_str(), "RUNNING" | "ACTIVE" | "ONLINE")
        })
    }

    /// Whether the resource is stopped, deallocated or terminated.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.as_deref().is_some_and(|s| {
            let lower = s.to_ascii_lowercase();
            lower.contains("stop") || lower.contains("terminated") || lower.contains("dealloc")
        })
    }
}

// =============================================================================
// Analysis Result
// =============================================================================

/// Marks whether a result covers one provider, several, or none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResultKind {
    Single,
    MultiCloudAggregate,
    Empty,
}

/// Where a result came from and which period it covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMeta {
    /// Provider name, or comma-joined provider names for an aggregate.
    pub provider: String,

    #[serde(rename = "type")]
    pub kind: ResultKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_count: Option<usize>,
}

/// Totals for a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_cost: f64,
    pub total_waste: f64,
    pub currency: String,
    pub resource_count: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_potential: Option<f64>,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total_cost: 0.0,
            total_waste: 0.0,
            currency: "USD".to_string(),
            resource_count: 0,
            providers: Vec::new(),
            savings_potential: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    /// 0-10, `None` when the producer did not score the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,

    #[serde(default)]
    pub headline: String,

    #[serde(default)]
    pub anomaly_count: usize,

    #[serde(default)]
    pub active_recommendations: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyTrendPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostDriver {
    pub service: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighCostResource {
    pub id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub cost_30d: f64,
}

/// A resource whose idle score crossed the reporting threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdleFinding {
    pub resource_id: String,
    pub name: String,
    pub provider: String,
    pub idle_score: u32,
    pub cost_30d: f64,

    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteFinding {
    pub resource_id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub provider: String,
    pub reasons: Vec<String>,
    pub cost_30d: f64,
}

/// A daily spend spike.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub date: String,
    pub amount: f64,
    pub expected: f64,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationAction {
    Stop,
    Rightsize,
}

impl fmt::Display for OptimizationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Rightsize => write!(f, "rightsize"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Optimization {
    pub resource_id: String,
    pub provider: String,
    pub action: OptimizationAction,
    pub description: String,
    pub potential_savings: f64,
}

/// Spend that cannot be attributed to a team or environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernanceIssue {
    pub service: String,
    pub provider: String,
    pub issue: String,
    pub untagged_cost: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub predicted_additional_spend: f64,
    pub confidence: Confidence,

    /// Number of per-provider forecasts folded into a merged forecast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_forecasts: Option<usize>,
}

/// Unified per-provider or merged cost and resource report.
///
/// Built fresh for every call. The aggregation engine produces new instances
/// and never mutates its inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub meta: AnalysisMeta,
    pub summary: Summary,
    pub executive_summary: ExecutiveSummary,

    /// Ascending by date.
    pub daily_trends: Vec<DailyTrendPoint>,

    /// Descending by cost.
    pub cost_drivers: Vec<CostDriver>,

    pub resource_types: BTreeMap<String, usize>,
    pub running_count: usize,

    /// Descending by `cost_30d`, at most 20 entries.
    pub high_cost_resources: Vec<HighCostResource>,

    pub resources: Vec<Resource>,
    pub idle_resources: Vec<IdleFinding>,
    pub waste_findings: Vec<WasteFinding>,
    pub anomalies: Vec<Anomaly>,

    /// Descending by potential savings.
    pub optimizations: Vec<Optimization>,

    pub governance_issues: Vec<GovernanceIssue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Forecast>,
}

impl AnalysisResult {
    /// The canonical empty result: provider `none`, zeroed totals, empty lists.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            meta: AnalysisMeta {
                provider: "none".to_string(),
                kind: ResultKind::Empty,
                period_days: None,
                generated_at: None,
                source_count: None,
            },
            summary: Summary::default(),
            executive_summary: ExecutiveSummary {
                risk_score: Some(0.0),
                ..ExecutiveSummary::default()
            },
            daily_trends: Vec::new(),
            cost_drivers: Vec::new(),
            resource_types: BTreeMap::new(),
            running_count: 0,
            high_cost_resources: Vec::new(),
            resources: Vec::new(),
            idle_resources: Vec::new(),
            waste_findings: Vec::new(),
            anomalies: Vec::new(),
            optimizations: Vec::new(),
            governance_issues: Vec::new(),
            forecast: None,
        }
    }
}

// =============================================================================
// Provider Status
// =============================================================================

/// An enabled subscription (Azure) or project visible to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub name: String,
}

/// Health of one provider's CLI and credentials. Failure is encoded, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub installed: bool,
    pub authenticated: bool,

    #[serde(default)]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Subscription>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub debug: BTreeMap<String, serde_json::Value>,
}

impl ProviderStatus {
    /// Status for a provider whose CLI is missing or whose adapter failed.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Status for a probe that did not finish within `seconds`.
    #[must_use]
    pub fn timed_out(seconds: u64) -> Self {
        let mut debug = BTreeMap::new();
        debug.insert("timeout".to_string(), serde_json::Value::Bool(true));
        Self {
            installed: true,
            authenticated: false,
            error: Some(format!("Status check timed out after {seconds}s")),
            debug,
            ..Self::default()
        }
    }
}

/// Process environment captured alongside a status snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub home: Option<String>,
    pub user_profile: Option<String>,
    pub aws_profile: Option<String>,
    pub azure_config_dir: Option<String>,
    pub cloudsdk_config: Option<String>,
    pub path_len: usize,
    pub pager: Option<String>,
    pub in_docker: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMeta {
    pub checked_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub env: EnvSnapshot,
}

/// One status entry per registered provider plus `_meta`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub providers: BTreeMap<String, ProviderStatus>,

    #[serde(rename = "_meta")]
    pub meta: StatusMeta,
}

// =============================================================================
// Robot Output Envelope
// =============================================================================

/// Top-level envelope for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,

    #[serde(default)]
    pub errors: Vec<String>,

    pub meta: RobotMeta,
}

/// Metadata for robot output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotMeta {
    pub format: String,
    pub flags: Vec<String>,
    pub runtime: String,
}

impl<T> RobotOutput<T> {
    /// Create a new robot output envelope.
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self::with_errors(command, data, Vec::new())
    }

    /// Create with errors.
    pub fn with_errors(command: impl Into<String>, data: T, errors: Vec<String>) -> Self {
        Self {
            schema_version: "opsyield.v1".to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors,
            meta: RobotMeta {
                format: "json".to_string(),
                flags: Vec::new(),
                runtime: "cli".to_string(),
            },
        }
    }
}
