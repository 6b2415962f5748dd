//! Provider descriptors, the adapter capability trait, and the registry.
//!
//! The orchestrator and status cache only ever see `dyn CloudProvider`.
//! The registry maps a lowercase provider name to a factory that builds an
//! adapter from [`ProviderParams`]; each adapter reads the fields it needs and
//! ignores the rest.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::models::{NormalizedCost, ProviderStatus, Resource};
use crate::error::{OpsError, Result};

// =============================================================================
// Provider Enum
// =============================================================================

/// Supported cloud platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gcp,
    Aws,
    Azure,
}

impl Provider {
    /// All providers in registry order.
    pub const ALL: &'static [Self] = &[Self::Gcp, Self::Aws, Self::Azure];

    /// Lowercase name used on the command line and as a registry key.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
            Self::Aws => "aws",
            Self::Azure => "azure",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gcp => "Google Cloud",
            Self::Aws => "AWS",
            Self::Azure => "Azure",
        }
    }

    /// The cloud CLI binary the adapter shells out to.
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Gcp => "gcloud",
            Self::Aws => "aws",
            Self::Azure => "az",
        }
    }

    /// Parse a provider from its CLI name.
    ///
    /// # Errors
    /// Returns `UnknownProvider` for names outside [`Provider::ALL`].
    pub fn from_cli_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gcp" => Ok(Self::Gcp),
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            _ => Err(OpsError::UnknownProvider {
                name: name.to_string(),
                valid: Self::ALL
                    .iter()
                    .map(|p| p.cli_name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

// =============================================================================
// Capability Trait
// =============================================================================

/// What the core needs from a cloud adapter.
///
/// `status` never fails: a missing CLI or rejected credentials are encoded in
/// the returned [`ProviderStatus`]. Cost and inventory calls may fail; callers
/// recover from those.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn status(&self) -> ProviderStatus;

    async fn costs(&self, days: u32) -> Result<Vec<NormalizedCost>>;

    async fn infrastructure(&self) -> Result<Vec<Resource>>;
}

// =============================================================================
// Provider Parameters
// =============================================================================

/// Construction parameters shared by all adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderParams {
    /// GCP project.
    pub project_id: Option<String>,
    /// BigQuery billing export table (`project.dataset.table`).
    pub billing_table: Option<String>,
    /// Azure subscription.
    pub subscription_id: Option<String>,
    /// AWS region.
    pub region: Option<String>,
    /// AWS named profile.
    pub profile: Option<String>,
}

// =============================================================================
// Registry
// =============================================================================

/// Builds an adapter for a provider.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderParams) -> Result<Arc<dyn CloudProvider>> + Send + Sync>;

/// Ordered map from provider name to adapter factory.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<(String, ProviderFactory)>,
}

impl ProviderRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the GCP, AWS and Azure CLI adapters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for provider in Provider::ALL {
            registry.register(provider.cli_name(), crate::providers::factory_for(*provider));
        }
        registry
    }

    /// Register or replace the factory for `name`. Names are stored lowercase.
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        let key = name.to_ascii_lowercase();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == key) {
            slot.1 = factory;
        } else {
            self.entries.push((key, factory));
        }
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn lookup(&self, name: &str) -> Option<&ProviderFactory> {
        let key = name.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, factory)| factory)
    }

    fn unknown(&self, name: &str) -> OpsError {
        OpsError::UnknownProvider {
            name: name.to_string(),
            valid: self.names().join(", "),
        }
    }

    /// Fail with `UnknownProvider` unless `name` is registered.
    ///
    /// # Errors
    /// Returns `UnknownProvider` listing the registered names.
    pub fn ensure_known(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(self.unknown(name))
        }
    }

    /// Construct the adapter registered under `name`.
    ///
    /// # Errors
    /// `UnknownProvider` for unregistered names, otherwise whatever the factory
    /// returns (typically `ProviderInit`).
    pub fn create(&self, name: &str, params: &ProviderParams) -> Result<Arc<dyn CloudProvider>> {
        let factory = self.lookup(name).ok_or_else(|| self.unknown(name))?;
        factory(params)
    }

    /// Split a comma-separated provider list and check every name.
    ///
    /// # Errors
    /// `EmptyProviderList` when no names remain after trimming, `UnknownProvider`
    /// for the first unregistered name.
    pub fn parse_list(&self, raw: &str) -> Result<Vec<String>> {
        let names: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self.validate(&names)?;
        Ok(names)
    }

    /// Check a provider list without constructing anything.
    ///
    /// # Errors
    /// `EmptyProviderList` or `UnknownProvider`.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        if names.is_empty() {
            return Err(OpsError::EmptyProviderList);
        }
        for name in names {
            self.ensure_known(name.as_ref())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
