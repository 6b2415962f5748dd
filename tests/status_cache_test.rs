//! Status cache: TTL reuse, probe isolation, timeouts and refresh coalescing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::shared;
use common::log_capture::LogCapture;
use opsyield::core::models::ProviderStatus;
use opsyield::core::provider::{ProviderParams, ProviderRegistry};
use opsyield::core::status_cache::{PROBE_TIMEOUT, STATUS_TTL};
use opsyield::core::{ManualClock, StatusCache};
use opsyield::test_utils::{MockProvider, failing_factory, registry_with};

fn three_mocks() -> Vec<MockProvider> {
    vec![
        MockProvider::new("gcp"),
        MockProvider::new("aws"),
        MockProvider::new("azure"),
    ]
}

fn cache_with_clock(registry: ProviderRegistry, clock: Arc<ManualClock>) -> StatusCache {
    StatusCache::with_clock(Arc::new(registry), ProviderParams::default(), clock)
}

#[tokio::test]
async fn snapshot_has_every_provider_and_meta() {
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(three_mocks()))),
        ProviderParams::default(),
    );

    let snapshot = cache.get_all_statuses().await;
    let json = serde_json::to_value(snapshot.as_ref()).unwrap();

    for key in ["gcp", "aws", "azure", "_meta"] {
        assert!(json.get(key).is_some(), "missing key {key}: {json}");
    }
    assert_eq!(json["gcp"]["installed"], true);
    assert_eq!(json["aws"]["account"], "ops@aws.example.com");
    assert!(json["_meta"]["checked_at"].is_string());
    assert!(json["_meta"]["env"].is_object());
}

#[tokio::test]
async fn construction_failures_are_encoded() {
    let capture = LogCapture::start();
    let mut registry = ProviderRegistry::new();
    for name in ["gcp", "aws", "azure"] {
        registry.register(name, failing_factory(name, "missing credentials"));
    }
    let cache = StatusCache::new(Arc::new(registry), ProviderParams::default());

    let snapshot = cache.get_all_statuses().await;

    assert_eq!(snapshot.providers.len(), 3);
    for status in snapshot.providers.values() {
        assert!(!status.installed);
        assert!(!status.authenticated);
        let error = status.error.as_deref().unwrap();
        assert!(error.starts_with("Failed to instantiate"), "{error}");
        assert!(error.contains("missing credentials"), "{error}");
    }
    assert_eq!(
        capture
            .matching(tracing::Level::WARN, "Provider construction failed")
            .len(),
        3
    );
}

#[tokio::test]
async fn fresh_snapshot_is_reused() {
    let mock = MockProvider::new("gcp");
    let calls = mock.calls();
    let clock = Arc::new(ManualClock::new());
    let cache = cache_with_clock(registry_with(shared(vec![mock])), Arc::clone(&clock));

    let first = cache.get_all_statuses().await;
    clock.advance(STATUS_TTL - Duration::from_secs(1));
    let second = cache.get_all_statuses().await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.probe_count().await, 1);
    assert_eq!(calls.status(), 1);
}

#[tokio::test]
async fn expired_snapshot_is_refreshed() {
    let mock = MockProvider::new("gcp");
    let calls = mock.calls();
    let clock = Arc::new(ManualClock::new());
    let cache = cache_with_clock(registry_with(shared(vec![mock])), Arc::clone(&clock));

    let first = cache.get_all_statuses().await;
    clock.advance(Duration::from_secs(61));
    let second = cache.get_all_statuses().await;

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(cache.probe_count().await, 2);
    assert_eq!(calls.status(), 2);
}

#[tokio::test]
async fn invalidate_forces_a_probe() {
    let clock = Arc::new(ManualClock::new());
    let cache = cache_with_clock(registry_with(shared(three_mocks())), clock);

    cache.get_all_statuses().await;
    cache.invalidate().await;
    cache.get_all_statuses().await;

    assert_eq!(cache.probe_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn slow_probe_times_out_alone() {
    let slow = MockProvider::new("aws").with_status_delay(PROBE_TIMEOUT + Duration::from_secs(5));
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(vec![
            MockProvider::new("gcp"),
            slow,
            MockProvider::new("azure"),
        ]))),
        ProviderParams::default(),
    );

    let snapshot = cache.get_all_statuses().await;

    let aws = &snapshot.providers["aws"];
    assert!(aws.installed);
    assert!(!aws.authenticated);
    assert_eq!(aws.error.as_deref(), Some("Status check timed out after 20s"));
    assert_eq!(aws.debug.get("timeout"), Some(&serde_json::Value::Bool(true)));

    for name in ["gcp", "azure"] {
        let status = &snapshot.providers[name];
        assert!(status.authenticated, "{name} should be unaffected");
        assert!(status.error.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn custom_probe_timeout() {
    let slow = MockProvider::new("gcp").with_status_delay(Duration::from_secs(3));
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(vec![slow]))),
        ProviderParams::default(),
    )
    .with_probe_timeout(Duration::from_secs(2));

    let snapshot = cache.get_all_statuses().await;
    assert_eq!(
        snapshot.providers["gcp"].error.as_deref(),
        Some("Status check timed out after 2s")
    );
}

#[tokio::test]
async fn panicking_probe_is_isolated() {
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(vec![
            MockProvider::new("gcp").panicking_status(),
            MockProvider::new("aws"),
        ]))),
        ProviderParams::default(),
    );

    let snapshot = cache.get_all_statuses().await;

    let gcp = &snapshot.providers["gcp"];
    assert!(!gcp.authenticated);
    assert!(gcp.error.as_deref().unwrap().starts_with("Status check failed"));
    assert!(snapshot.providers["aws"].authenticated);
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_share_one_probe() {
    let mock = MockProvider::new("gcp").with_status_delay(Duration::from_secs(1));
    let calls = mock.calls();
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(vec![mock]))),
        ProviderParams::default(),
    );

    let (a, b, c) = tokio::join!(
        cache.get_all_statuses(),
        cache.get_all_statuses(),
        cache.get_all_statuses(),
    );

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(cache.probe_count().await, 1);
    assert_eq!(calls.status(), 1);
}

#[tokio::test]
async fn status_is_encoded_not_raised() {
    let cache = StatusCache::new(
        Arc::new(registry_with(shared(vec![
            MockProvider::new("azure")
                .with_status(ProviderStatus::failed("Azure CLI not found on PATH")),
        ]))),
        ProviderParams::default(),
    );

    let snapshot = cache.get_all_statuses().await;
    let azure = &snapshot.providers["azure"];
    assert!(!azure.installed);
    assert_eq!(azure.error.as_deref(), Some("Azure CLI not found on PATH"));
}
