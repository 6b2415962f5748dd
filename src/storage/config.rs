//! Configuration file loading and resolution.
//!
//! Loads configuration from:
//! - Linux: `~/.config/opsyield/config.toml`
//! - macOS: `~/Library/Application Support/io.opsyield.opsyield/config.toml`
//! - Windows: `%APPDATA%/opsyield/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `OPSYIELD_PROVIDERS`: Comma-separated provider list (e.g., "gcp,aws")
//! - `OPSYIELD_FORMAT`: Output format (human, json, md)
//! - `OPSYIELD_DAYS`: Look-back window in days
//! - `OPSYIELD_NO_COLOR` or `NO_COLOR`: Disable colors
//! - `OPSYIELD_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `OPSYIELD_CONFIG`: Override config file path
//!
//! Example file:
//!
//! ```toml
//! [general]
//! days = 14
//!
//! [providers]
//! default_providers = ["gcp", "aws"]
//!
//! [providers.gcp]
//! project_id = "acme-prod"
//! billing_table = "acme-prod.billing.gcp_billing_export_v1"
//!
//! [providers.aws]
//! region = "eu-west-1"
//!
//! [output]
//! format = "json"
//! pretty = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat, ProviderArgs};
use crate::core::logging::LogLevel;
use crate::core::provider::{Provider, ProviderParams};
use crate::error::{OpsError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for comma-separated provider list.
pub const ENV_PROVIDERS: &str = "OPSYIELD_PROVIDERS";
/// Environment variable for output format.
pub const ENV_FORMAT: &str = "OPSYIELD_FORMAT";
/// Environment variable for the look-back window.
pub const ENV_DAYS: &str = "OPSYIELD_DAYS";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "OPSYIELD_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "OPSYIELD_PRETTY";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "OPSYIELD_CONFIG";

/// Default look-back window.
pub const DEFAULT_DAYS: u32 = 30;
/// Longest accepted look-back window.
pub const MAX_DAYS: u32 = 365;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Final configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Providers for multi-provider commands, in request order.
    pub providers: Vec<String>,
    /// Look-back window in days.
    pub days: u32,
    /// Adapter construction parameters.
    pub params: ProviderParams,
    pub format: OutputFormat,
    pub no_color: bool,
    pub pretty: bool,
    /// Log level from the config file; CLI and env are applied by `main`.
    pub log_level: Option<LogLevel>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub providers: ConfigSource,
    pub days: ConfigSource,
    pub format: ConfigSource,
    pub no_color: ConfigSource,
    pub pretty: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Command-specific inputs that take part in resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInputs<'a> {
    /// `--providers` value.
    pub providers: Option<&'a str>,
    /// `--days` value.
    pub days: Option<u32>,
    /// Adapter flags.
    pub provider_args: Option<&'a ProviderArgs>,
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or if any
    /// resolved value is invalid (unknown provider, bad format, days out of range).
    pub fn resolve(cli: &Cli, inputs: CommandInputs<'_>) -> Result<Self> {
        let config = Self::load_config()?;
        Self::resolve_with(cli, inputs, &config)
    }

    /// Resolve against an already-loaded config file.
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::resolve`].
    pub fn resolve_with(cli: &Cli, inputs: CommandInputs<'_>, config: &Config) -> Result<Self> {
        config.validate()?;

        let mut sources = ConfigSources::default();

        let providers = Self::resolve_providers(inputs.providers, config, &mut sources.providers)?;
        let days = Self::resolve_days(inputs.days, config, &mut sources.days)?;
        let format = Self::resolve_format(cli, config, &mut sources.format)?;
        let no_color = Self::resolve_no_color(cli, config, &mut sources.no_color);
        let pretty = Self::resolve_pretty(cli, config, &mut sources.pretty);
        let log_level = config
            .general
            .log_level
            .as_deref()
            .and_then(LogLevel::from_arg);

        let file_params = config.providers.params();
        let params = inputs
            .provider_args
            .map_or(file_params.clone(), |args| args.over(&file_params));

        Ok(Self {
            providers,
            days,
            params,
            format,
            no_color,
            pretty,
            log_level,
            sources,
        })
    }

    /// Load config file, respecting `OPSYIELD_CONFIG` override.
    fn load_config() -> Result<Config> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            Config::load_from(Path::new(&path))
        } else {
            Config::load()
        }
    }

    fn resolve_providers(
        flag: Option<&str>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<Vec<String>> {
        if let Some(list) = flag {
            *source = ConfigSource::Cli;
            return Self::parse_provider_list(list);
        }

        if let Ok(list) = std::env::var(ENV_PROVIDERS) {
            *source = ConfigSource::Env;
            return Self::parse_provider_list(&list);
        }

        if !config.providers.default_providers.is_empty() {
            *source = ConfigSource::ConfigFile;
            return Ok(config
                .providers
                .default_providers
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect());
        }

        *source = ConfigSource::Default;
        Ok(Provider::ALL
            .iter()
            .map(|provider| provider.cli_name().to_string())
            .collect())
    }

    /// Split a comma-separated list, checking names against the built-in providers.
    fn parse_provider_list(list: &str) -> Result<Vec<String>> {
        let names: Vec<String> = list
            .split(',')
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(OpsError::EmptyProviderList);
        }
        for name in &names {
            Provider::from_cli_name(name)?;
        }
        Ok(names)
    }

    fn resolve_days(flag: Option<u32>, config: &Config, source: &mut ConfigSource) -> Result<u32> {
        if let Some(days) = flag {
            *source = ConfigSource::Cli;
            return Self::check_days(days);
        }

        if let Ok(raw) = std::env::var(ENV_DAYS) {
            *source = ConfigSource::Env;
            let days = raw.trim().parse::<u32>().map_err(|_| {
                OpsError::Config(format!("Invalid {ENV_DAYS} value '{raw}', expected a number"))
            })?;
            return Self::check_days(days);
        }

        if let Some(days) = config.general.days {
            *source = ConfigSource::ConfigFile;
            return Ok(days);
        }

        *source = ConfigSource::Default;
        Ok(DEFAULT_DAYS)
    }

    fn check_days(days: u32) -> Result<u32> {
        if (1..=MAX_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(OpsError::Config(format!(
                "Days must be between 1 and {MAX_DAYS}, got {days}"
            )))
        }
    }

    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        if let Some(format) = cli.format_flag() {
            *source = ConfigSource::Cli;
            return Ok(format);
        }

        if let Ok(raw) = std::env::var(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return Self::parse_format(&raw);
        }

        if let Some(raw) = &config.output.format {
            *source = ConfigSource::ConfigFile;
            return Self::parse_format(raw);
        }

        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    /// Parse format string to `OutputFormat`.
    fn parse_format(s: &str) -> Result<OutputFormat> {
        match s.trim().to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Md),
            _ => Err(OpsError::Config(format!(
                "Invalid format '{s}'. Valid formats: human, json, md"
            ))),
        }
    }

    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        let std_no_color = std::env::var(ENV_NO_COLOR_STD).is_ok_and(|v| !v.is_empty());
        if Self::is_env_truthy(ENV_NO_COLOR) || std_no_color {
            *source = ConfigSource::Env;
            return true;
        }

        if let Some(color) = config.output.color {
            *source = ConfigSource::ConfigFile;
            return !color;
        }

        *source = ConfigSource::Default;
        false
    }

    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }

        if Self::is_env_truthy(ENV_PRETTY) {
            *source = ConfigSource::Env;
            return true;
        }

        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    fn is_env_truthy(var: &str) -> bool {
        std::env::var(var)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub providers: ProvidersConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Look-back window in days.
    pub days: Option<u32>,
    /// trace, debug, info, warn or error.
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Providers used by `aggregate` when none are given.
    pub default_providers: Vec<String>,
    pub gcp: GcpConfig,
    pub aws: AwsConfig,
    pub azure: AzureConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    pub project_id: Option<String>,
    pub billing_table: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: Option<String>,
    /// `false` disables colored output.
    pub color: Option<bool>,
    pub pretty: bool,
}

impl ProvidersConfig {
    /// Flatten the per-provider sections into adapter parameters.
    #[must_use]
    pub fn params(&self) -> ProviderParams {
        ProviderParams {
            project_id: self.gcp.project_id.clone(),
            billing_table: self.gcp.billing_table.clone(),
            subscription_id: self.azure.subscription_id.clone(),
            region: self.aws.region.clone(),
            profile: self.aws.profile.clone(),
        }
    }
}

impl Config {
    /// Load from the default config path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| OpsError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown provider names, an unknown
    /// output format, an unknown log level, or days outside 1..=365.
    pub fn validate(&self) -> Result<()> {
        let valid_providers = Provider::ALL
            .iter()
            .map(|provider| provider.cli_name())
            .collect::<Vec<_>>()
            .join(", ");

        for name in &self.providers.default_providers {
            Provider::from_cli_name(name).map_err(|_| {
                OpsError::Config(format!(
                    "Invalid provider \"{name}\" in default_providers. Valid providers: {valid_providers}",
                ))
            })?;
        }

        if let Some(format) = &self.output.format {
            ResolvedConfig::parse_format(format)?;
        }

        if let Some(level) = &self.general.log_level {
            if LogLevel::from_arg(level).is_none() {
                return Err(OpsError::Config(format!(
                    "Invalid log_level '{level}'. Valid levels: trace, debug, info, warn, error"
                )));
            }
        }

        if let Some(days) = self.general.days {
            ResolvedConfig::check_days(days)?;
        }

        Ok(())
    }
}
