#![allow(dead_code)]

use std::sync::Arc;

use opsyield::core::models::{NormalizedCost, Resource};
use opsyield::test_utils::{MockProvider, make_test_cost, make_test_resource_with};

/// GCP line items over three days totaling 150.0.
pub fn gcp_costs() -> Vec<NormalizedCost> {
    vec![
        make_test_cost("gcp", "Compute Engine", 40.0, "2026-03-01"),
        make_test_cost("gcp", "Cloud Storage", 10.0, "2026-03-01"),
        make_test_cost("gcp", "Compute Engine", 45.0, "2026-03-02"),
        make_test_cost("gcp", "BigQuery", 25.0, "2026-03-02"),
        make_test_cost("gcp", "Compute Engine", 30.0, "2026-03-03"),
    ]
}

/// Three GCP resources, one of them running.
pub fn gcp_resources() -> Vec<Resource> {
    let mut disk = make_test_resource_with("disk-1", "gcp", "READY", 4.0);
    disk.kind = Some("compute_disk".to_string());
    disk.external_ip = None;
    vec![
        make_test_resource_with("vm-web", "gcp", "RUNNING", 60.0),
        make_test_resource_with("vm-batch", "gcp", "TERMINATED", 12.0),
        disk,
    ]
}

/// The gcp scenario: 150.0 spend, three resources, one running.
pub fn gcp_scenario() -> MockProvider {
    MockProvider::new("gcp")
        .with_costs(gcp_costs())
        .with_resources(gcp_resources())
}

/// AWS with a single day of spend.
pub fn aws_scenario(total: f64) -> MockProvider {
    MockProvider::new("aws")
        .with_costs(vec![make_test_cost("aws", "AmazonEC2", total, "2026-03-02")])
        .with_resources(vec![make_test_resource_with("i-0abc", "aws", "running", 20.0)])
}

/// Azure with a single day of spend, dated before the others.
pub fn azure_scenario(total: f64) -> MockProvider {
    MockProvider::new("azure")
        .with_costs(vec![make_test_cost("azure", "Virtual Machines", total, "2026-02-27")])
        .with_resources(vec![make_test_resource_with("vm-az", "azure", "VM deallocated", 8.0)])
}

pub fn shared(mocks: Vec<MockProvider>) -> Vec<Arc<MockProvider>> {
    mocks.into_iter().map(MockProvider::into_shared).collect()
}
