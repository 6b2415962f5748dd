//! Test utilities for opsyield.
//!
//! Provides test data factories, a scriptable [`MockProvider`], and
//! assertion macros for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use opsyield::test_utils::*;
//!
//! let gcp = MockProvider::new("gcp").with_costs(vec![make_test_cost("gcp", "Compute", 150.0, "2026-03-01")]);
//! let registry = registry_with(vec![gcp.into_shared()]);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::core::models::{
    AnalysisMeta, AnalysisResult, EnvSnapshot, ExecutiveSummary, NormalizedCost, ProviderStatus,
    Resource, ResultKind, StatusMeta, StatusSnapshot, Summary,
};
use crate::core::provider::{CloudProvider, ProviderFactory, ProviderParams, ProviderRegistry};
use crate::error::{OpsError, Result};

pub use crate::core::status_cache::ManualClock;

// =============================================================================
// Test Data Factories
// =============================================================================

/// Midday UTC on `date` (`YYYY-MM-DD`).
///
/// # Panics
///
/// Panics if `date` is not a valid calendar date.
#[must_use]
pub fn make_test_timestamp(date: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .expect("test date must be YYYY-MM-DD")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
        .and_utc()
}

/// One billing line item on `date`.
#[must_use]
pub fn make_test_cost(provider: &str, service: &str, cost: f64, date: &str) -> NormalizedCost {
    NormalizedCost::new(provider, service, cost, make_test_timestamp(date))
}

/// A running compute instance with an external IP and no cost data.
#[must_use]
pub fn make_test_resource(id: &str, provider: &str) -> Resource {
    let mut resource = Resource::new(id, format!("{id}-name"), "compute_instance", provider);
    resource.state = Some("RUNNING".to_string());
    resource.external_ip = Some("203.0.113.10".to_string());
    resource
}

/// A resource in `state` with a 30-day cost.
#[must_use]
pub fn make_test_resource_with(id: &str, provider: &str, state: &str, cost_30d: f64) -> Resource {
    let mut resource = make_test_resource(id, provider);
    resource.state = Some(state.to_string());
    resource.cost_30d = Some(cost_30d);
    resource
}

/// A single-provider result over 30 days with the given total.
#[must_use]
pub fn make_test_result(provider: &str, total_cost: f64) -> AnalysisResult {
    AnalysisResult {
        meta: AnalysisMeta {
            provider: provider.to_string(),
            kind: ResultKind::Single,
            period_days: Some(30),
            generated_at: Some(Utc::now()),
            source_count: None,
        },
        summary: Summary {
            total_cost,
            ..Summary::default()
        },
        executive_summary: ExecutiveSummary {
            risk_score: Some(0.0),
            headline: format!("{provider} spend of ${total_cost:.2} over 30 days"),
            ..ExecutiveSummary::default()
        },
        ..AnalysisResult::empty()
    }
}

/// A status snapshot where every named provider is installed and logged in.
#[must_use]
pub fn make_test_status_snapshot(providers: &[&str]) -> StatusSnapshot {
    let providers = providers
        .iter()
        .map(|name| {
            let status = ProviderStatus {
                installed: true,
                authenticated: true,
                account: Some(format!("ops@{name}.example.com")),
                ..ProviderStatus::default()
            };
            ((*name).to_string(), status)
        })
        .collect::<BTreeMap<_, _>>();

    StatusSnapshot {
        providers,
        meta: StatusMeta {
            checked_at: Utc::now(),
            elapsed_ms: 12,
            env: EnvSnapshot::default(),
        },
    }
}

// =============================================================================
// Mock Provider
// =============================================================================

/// Call counters shared between a [`MockProvider`] and the test holding it.
#[derive(Debug, Default)]
pub struct MockCalls {
    pub status: AtomicUsize,
    pub costs: AtomicUsize,
    pub infrastructure: AtomicUsize,
}

impl MockCalls {
    #[must_use]
    pub fn status(&self) -> usize {
        self.status.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn costs(&self) -> usize {
        self.costs.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn infrastructure(&self) -> usize {
        self.infrastructure.load(Ordering::SeqCst)
    }
}

/// Scriptable [`CloudProvider`] for orchestrator, aggregation and cache tests.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    costs: Vec<NormalizedCost>,
    resources: Vec<Resource>,
    status: ProviderStatus,
    fail_costs: bool,
    fail_infrastructure: bool,
    panic_on_costs: bool,
    panic_on_status: bool,
    status_delay: Duration,
    call_delay: Duration,
    calls: Arc<MockCalls>,
}

impl MockProvider {
    /// A provider with no data that reports installed and authenticated.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            costs: Vec::new(),
            resources: Vec::new(),
            status: ProviderStatus {
                installed: true,
                authenticated: true,
                account: Some(format!("ops@{name}.example.com")),
                ..ProviderStatus::default()
            },
            fail_costs: false,
            fail_infrastructure: false,
            panic_on_costs: false,
            panic_on_status: false,
            status_delay: Duration::ZERO,
            call_delay: Duration::ZERO,
            calls: Arc::new(MockCalls::default()),
        }
    }

    #[must_use]
    pub fn with_costs(mut self, costs: Vec<NormalizedCost>) -> Self {
        self.costs = costs;
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn failing_costs(mut self) -> Self {
        self.fail_costs = true;
        self
    }

    #[must_use]
    pub const fn failing_infrastructure(mut self) -> Self {
        self.fail_infrastructure = true;
        self
    }

    /// Panic inside `costs()` instead of returning.
    #[must_use]
    pub const fn panicking_costs(mut self) -> Self {
        self.panic_on_costs = true;
        self
    }

    #[must_use]
    pub const fn panicking_status(mut self) -> Self {
        self.panic_on_status = true;
        self
    }

    /// Sleep before answering `status()`.
    #[must_use]
    pub const fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    /// Sleep before answering `costs()` and `infrastructure()`.
    #[must_use]
    pub const fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Counters that stay readable after the mock is handed to a registry.
    #[must_use]
    pub fn calls(&self) -> Arc<MockCalls> {
        Arc::clone(&self.calls)
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn failure(&self, operation: &str) -> OpsError {
        OpsError::AdapterCall {
            provider: self.name.clone(),
            operation: operation.to_string(),
            reason: "mock failure".to_string(),
        }
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn status(&self) -> ProviderStatus {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        assert!(!self.panic_on_status, "mock status panic");
        self.status.clone()
    }

    async fn costs(&self, _days: u32) -> Result<Vec<NormalizedCost>> {
        self.calls.costs.fetch_add(1, Ordering::SeqCst);
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        assert!(!self.panic_on_costs, "mock costs panic");
        if self.fail_costs {
            return Err(self.failure("costs"));
        }
        Ok(self.costs.clone())
    }

    async fn infrastructure(&self) -> Result<Vec<Resource>> {
        self.calls.infrastructure.fetch_add(1, Ordering::SeqCst);
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        if self.fail_infrastructure {
            return Err(self.failure("infrastructure"));
        }
        Ok(self.resources.clone())
    }
}

/// Factory handing out the same mock instance on every call.
#[must_use]
pub fn mock_factory(mock: Arc<MockProvider>) -> ProviderFactory {
    Arc::new(move |_params: &ProviderParams| Ok(Arc::clone(&mock) as Arc<dyn CloudProvider>))
}

/// Factory whose construction always fails.
#[must_use]
pub fn failing_factory(name: &str, reason: &str) -> ProviderFactory {
    let (name, reason) = (name.to_string(), reason.to_string());
    Arc::new(move |_params: &ProviderParams| {
        Err(OpsError::ProviderInit {
            provider: name.clone(),
            reason: reason.clone(),
        })
    })
}

/// Registry holding only the given mocks, registered under their names.
#[must_use]
pub fn registry_with(mocks: Vec<Arc<MockProvider>>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for mock in mocks {
        let name = mock.name().to_string();
        registry.register(&name, mock_factory(mock));
    }
    registry
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// Isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Write `content` to `relative`, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json) {
            panic!(
                "Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}",
                e, json
            );
        }
    };
}

/// Assert that a string contains ANSI escape codes.
#[macro_export]
macro_rules! assert_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            text.contains('\x1b'),
            "Expected string to contain ANSI escape codes, but none found.\n\nActual string:\n{:?}",
            text
        );
    };
}

/// Assert that a string does NOT contain ANSI escape codes.
#[macro_export]
macro_rules! assert_no_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            !text.contains('\x1b'),
            "Expected string to NOT contain ANSI escape codes.\n\nActual string:\n{:?}",
            text
        );
    };
}

/// Assert approximate floating point equality.
///
/// ```rust,ignore
/// assert_float_eq!(300.0, 100.0 + 200.0);
/// assert_float_eq!(70.0, 70.05, 0.1);
/// ```
#[macro_export]
macro_rules! assert_float_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_float_eq!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = $epsilon;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
}
