//! Error types for opsyield.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Configuration**: unknown provider names, malformed provider lists, config files
//! - **Provider**: adapter construction or adapter call failures
//! - **Network**: probe and CLI timeouts
//! - **Environment**: missing cloud CLIs
//! - **Internal**: I/O, JSON, and unclassified errors
//!
//! Each error has a stable error code (e.g., `OPS-C010`) for programmatic handling.
//!
//! Only configuration errors are expected to reach the caller of the
//! orchestrator. Adapter failures are recovered next to the call that produced
//! them and only show up in logs.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration issues (unknown providers, parse errors, invalid values).
    Configuration,
    /// Provider adapter issues (construction, cost or inventory calls).
    Provider,
    /// Timeouts talking to a provider.
    Network,
    /// Environment issues (missing CLIs, permissions).
    Environment,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Network => "Network error",
            Self::Environment => "Environment error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Configuration => "C",
            Self::Provider => "P",
            Self::Network => "N",
            Self::Environment => "E",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Cloud CLI not installed
    BinaryNotFound = 2,
    /// Invalid configuration or unknown provider
    ConfigError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for opsyield operations.
#[derive(Error, Debug)]
pub enum OpsError {
    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// Requested provider name is not registered.
    #[error("unknown provider: {name} (valid providers: {valid})")]
    UnknownProvider { name: String, valid: String },

    /// A multi-provider request named no providers.
    #[error("provider list is empty")]
    EmptyProviderList,

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error parsing a configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    // ==========================================================================
    // Provider errors
    // ==========================================================================
    /// Adapter could not be constructed.
    #[error("failed to instantiate {provider}: {reason}")]
    ProviderInit { provider: String, reason: String },

    /// A cost, inventory or status call on an adapter failed.
    #[error("{provider} {operation} failed: {reason}")]
    AdapterCall {
        provider: String,
        operation: String,
        reason: String,
    },

    /// One provider failed inside a multi-provider aggregate.
    #[error("provider {provider} excluded from aggregate: {reason}")]
    AggregateProvider { provider: String, reason: String },

    /// A cloud CLI exited unsuccessfully.
    #[error("{program} exited with code {exit_code}: {stderr}")]
    CliFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// Failed to parse CLI output.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Network errors
    // ==========================================================================
    /// Provider call exceeded its time bound.
    #[error("{provider} timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    // ==========================================================================
    // Environment errors
    // ==========================================================================
    /// Required CLI tool not found in PATH.
    #[error("CLI tool not found: {name}")]
    CliNotFound { name: String },

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OpsError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::CliNotFound { .. } => ExitCode::BinaryNotFound,

            Self::UnknownProvider { .. }
            | Self::EmptyProviderList
            | Self::Config(_)
            | Self::ConfigParse { .. } => ExitCode::ConfigError,

            Self::Timeout { .. } => ExitCode::Timeout,

            Self::ProviderInit { .. }
            | Self::AdapterCall { .. }
            | Self::AggregateProvider { .. }
            | Self::CliFailed { .. }
            | Self::ParseResponse(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownProvider { .. }
            | Self::EmptyProviderList
            | Self::Config(_)
            | Self::ConfigParse { .. } => ErrorCategory::Configuration,

            Self::ProviderInit { .. }
            | Self::AdapterCall { .. }
            | Self::AggregateProvider { .. }
            | Self::CliFailed { .. }
            | Self::ParseResponse(_) => ErrorCategory::Provider,

            Self::Timeout { .. } => ErrorCategory::Network,

            Self::CliNotFound { .. } => ErrorCategory::Environment,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `OPS-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "OPS-C001",
            Self::ConfigParse { .. } => "OPS-C002",
            Self::UnknownProvider { .. } => "OPS-C010",
            Self::EmptyProviderList => "OPS-C011",

            Self::ProviderInit { .. } => "OPS-P001",
            Self::AdapterCall { .. } => "OPS-P010",
            Self::AggregateProvider { .. } => "OPS-P011",
            Self::CliFailed { .. } => "OPS-P020",
            Self::ParseResponse(_) => "OPS-P021",

            Self::Timeout { .. } => "OPS-N001",

            Self::CliNotFound { .. } => "OPS-E001",

            Self::Io(_) => "OPS-X001",
            Self::Json(_) => "OPS-X002",
            Self::Other(_) => "OPS-X099",
        }
    }

    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::CliFailed { .. })
    }

    /// Returns the provider name if this error is provider-specific.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::UnknownProvider { name, .. } => Some(name),
            Self::ProviderInit { provider, .. }
            | Self::AdapterCall { provider, .. }
            | Self::AggregateProvider { provider, .. }
            | Self::Timeout { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::UnknownProvider { name, valid } => {
                suggestions::unknown_provider_suggestions(name, valid)
            }
            Self::EmptyProviderList => vec![FixSuggestion::new(
                vec!["opsyield aggregate --providers gcp,aws,azure".to_string()],
                "Name at least one provider to aggregate.",
            )],
            Self::Config(msg) | Self::ConfigParse { message: msg, .. } => {
                suggestions::config_suggestions(msg)
            }
            Self::CliNotFound { name } => suggestions::cli_not_found_suggestions(name),
            Self::CliFailed { program, .. } => suggestions::auth_suggestions(program),
            Self::Timeout { provider, seconds } => {
                suggestions::timeout_suggestions(provider, *seconds)
            }
            Self::ProviderInit { provider, .. }
            | Self::AdapterCall { provider, .. }
            | Self::AggregateProvider { provider, .. } => {
                suggestions::provider_failure_suggestions(provider)
            }
            Self::ParseResponse(msg) => vec![FixSuggestion::new(
                vec!["opsyield status".to_string()],
                format!("Failed to parse cloud CLI output: {msg}. The CLI version may be unsupported."),
            )],
            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                vec!["opsyield status".to_string()],
                format!("JSON error: {err}."),
            )],
            Self::Other(err) => vec![FixSuggestion::new(
                vec!["opsyield status".to_string()],
                format!("Unexpected error: {err}. Please report this issue."),
            )],
        }
    }
}

/// Result type alias for opsyield operations.
pub type Result<T> = std::result::Result<T, OpsError>;

// =============================================================================
// Tests
// =============================================================================
