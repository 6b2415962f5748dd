//! Time-bounded cache of provider status probes.
//!
//! Probing shells out to every cloud CLI, so a snapshot is reused for
//! [`STATUS_TTL`]. The lock is held only to check freshness and to write the
//! refreshed snapshot back; the probes run outside it. Callers that miss the
//! cache while a refresh is running join that refresh instead of starting
//! another one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use tokio::sync::Mutex;

use crate::core::models::{ProviderStatus, StatusMeta, StatusSnapshot};
use crate::core::provider::{ProviderParams, ProviderRegistry};
use crate::util::env;

/// How long a snapshot stays fresh.
pub const STATUS_TTL: Duration = Duration::from_secs(60);

/// Bound on each provider's status probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

// =============================================================================
// Clock
// =============================================================================

/// Monotonic time source for cache freshness.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: StdMutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: StdMutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.base + offset
    }
}

// =============================================================================
// Cache
// =============================================================================

type Refresh = Shared<BoxFuture<'static, Arc<StatusSnapshot>>>;

#[derive(Default)]
struct CacheState {
    entry: Option<(Instant, Arc<StatusSnapshot>)>,
    in_flight: Option<Refresh>,
    probes: u64,
}

/// Shared status cache; construct once and pass by reference.
pub struct StatusCache {
    registry: Arc<ProviderRegistry>,
    params: ProviderParams,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    probe_timeout: Duration,
    state: Mutex<CacheState>,
}

impl StatusCache {
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, params: ProviderParams) -> Self {
        Self::with_clock(registry, params, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        registry: Arc<ProviderRegistry>,
        params: ProviderParams,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            params,
            clock,
            ttl: STATUS_TTL,
            probe_timeout: PROBE_TIMEOUT,
            state: Mutex::new(CacheState::default()),
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Status of every registered provider plus `_meta`.
    ///
    /// Within the TTL the same snapshot is returned without probing.
    pub async fn get_all_statuses(&self) -> Arc<StatusSnapshot> {
        let refresh = {
            let mut state = self.state.lock().await;
            if let Some((stored_at, snapshot)) = &state.entry {
                if self.clock.now().saturating_duration_since(*stored_at) < self.ttl {
                    tracing::debug!("Status cache hit");
                    return Arc::clone(snapshot);
                }
            }
            if let Some(running) = &state.in_flight {
                tracing::debug!("Joining in-flight status refresh");
                running.clone()
            } else {
                tracing::debug!("Status cache miss, probing providers");
                state.probes += 1;
                let refresh = probe_all(
                    Arc::clone(&self.registry),
                    self.params.clone(),
                    self.probe_timeout,
                )
                .boxed()
                .shared();
                state.in_flight = Some(refresh.clone());
                refresh
            }
        };

        let snapshot = refresh.clone().await;

        let mut state = self.state.lock().await;
        if state
            .in_flight
            .as_ref()
            .is_some_and(|running| running.ptr_eq(&refresh))
        {
            state.entry = Some((self.clock.now(), Arc::clone(&snapshot)));
            state.in_flight = None;
        }
        snapshot
    }

    /// Drop the cached snapshot so the next call probes again.
    pub async fn invalidate(&self) {
        self.state.lock().await.entry = None;
    }

    /// Number of refreshes started so far.
    pub async fn probe_count(&self) -> u64 {
        self.state.lock().await.probes
    }
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache")
            .field("registry", &self.registry)
            .field("ttl", &self.ttl)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Probing
// =============================================================================

/// Probe every registered provider concurrently. Never fails.
pub async fn probe_all(
    registry: Arc<ProviderRegistry>,
    params: ProviderParams,
    timeout: Duration,
) -> Arc<StatusSnapshot> {
    let start = Instant::now();
    let names: Vec<String> = registry.names().into_iter().map(str::to_string).collect();

    let probes = names
        .into_iter()
        .map(|name| probe_one(&registry, &params, name, timeout));
    let providers: BTreeMap<String, ProviderStatus> = join_all(probes).await.into_iter().collect();

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        provider_count = providers.len(),
        duration_ms = elapsed_ms,
        "Status probe complete"
    );

    Arc::new(StatusSnapshot {
        providers,
        meta: StatusMeta {
            checked_at: Utc::now(),
            elapsed_ms,
            env: env::snapshot(),
        },
    })
}

async fn probe_one(
    registry: &ProviderRegistry,
    params: &ProviderParams,
    name: String,
    timeout: Duration,
) -> (String, ProviderStatus) {
    let adapter = match registry.create(&name, params) {
        Ok(adapter) => adapter,
        Err(e) => {
            tracing::warn!(provider = %name, error = %e, "Provider construction failed");
            let status = ProviderStatus::failed(format!("Failed to instantiate {name}: {e}"));
            return (name, status);
        }
    };

    // A spawned task isolates a panicking adapter from its siblings.
    let handle = tokio::spawn(async move { adapter.status().await });
    let abort = handle.abort_handle();

    let status = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(status)) => status,
        Ok(Err(join_error)) => {
            tracing::warn!(provider = %name, error = %join_error, "Status probe aborted");
            ProviderStatus::failed(format!("Status check failed: {join_error}"))
        }
        Err(_) => {
            abort.abort();
            tracing::warn!(
                provider = %name,
                timeout_secs = timeout.as_secs(),
                "Status check timed out"
            );
            ProviderStatus::timed_out(timeout.as_secs())
        }
    };

    (name, status)
}
