//! Orchestration engine: provider registry, analysis, aggregation and status caching.

pub mod aggregation;
pub mod cli_runner;
pub mod insights;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod status_cache;

pub use aggregation::AggregationEngine;
pub use models::{AnalysisResult, NormalizedCost, ProviderStatus, Resource, StatusSnapshot};
pub use orchestrator::Orchestrator;
pub use provider::{CloudProvider, Provider, ProviderParams, ProviderRegistry};
pub use status_cache::{Clock, ManualClock, StatusCache, SystemClock};
