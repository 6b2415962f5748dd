//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::provider::ProviderParams;

/// OpsYield - multi-cloud cost analysis for GCP, AWS and Azure.
#[derive(Parser, Debug)]
#[command(name = "opsyield")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format [default: human]
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Output format given on the command line, if any.
    #[must_use]
    pub const fn format_flag(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show CLI install and authentication status for every provider
    Status(StatusArgs),

    /// Analyze costs and infrastructure for one provider
    Analyze(AnalyzeArgs),

    /// Analyze several providers concurrently and merge the results
    Aggregate(AggregateArgs),
}

/// Arguments for the `status` command.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub provider_args: ProviderArgs,
}

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Provider to analyze (gcp, aws, azure)
    #[arg(long, short, value_name = "PROVIDER")]
    pub provider: String,

    /// Look-back window in days
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,

    #[command(flatten)]
    pub provider_args: ProviderArgs,
}

/// Arguments for the `aggregate` command.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Comma-separated providers (e.g. "gcp,aws,azure")
    #[arg(long, value_name = "LIST")]
    pub providers: Option<String>,

    /// Look-back window in days
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,

    #[command(flatten)]
    pub provider_args: ProviderArgs,
}

/// Settings handed to provider adapters.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// GCP project id
    #[arg(long, value_name = "ID")]
    pub project_id: Option<String>,

    /// BigQuery billing export table (project.dataset.table)
    #[arg(long, value_name = "TABLE")]
    pub billing_table: Option<String>,

    /// Azure subscription id
    #[arg(long, value_name = "ID")]
    pub subscription_id: Option<String>,

    /// AWS region
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// AWS named profile
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,
}

impl ProviderArgs {
    /// Fill unset fields from `fallback`.
    #[must_use]
    pub fn over(&self, fallback: &ProviderParams) -> ProviderParams {
        let pick = |flag: &Option<String>, file: &Option<String>| flag.clone().or_else(|| file.clone());
        ProviderParams {
            project_id: pick(&self.project_id, &fallback.project_id),
            billing_table: pick(&self.billing_table, &fallback.billing_table),
            subscription_id: pick(&self.subscription_id, &fallback.subscription_id),
            region: pick(&self.region, &fallback.region),
            profile: pick(&self.profile, &fallback.profile),
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable rich output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Markdown output
    Md,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_wins_over_format() {
        let cli = Cli::parse_from(["opsyield", "--format", "md", "--json", "status"]);
        assert_eq!(cli.format_flag(), Some(OutputFormat::Json));

        let cli = Cli::parse_from(["opsyield", "status"]);
        assert_eq!(cli.format_flag(), None);
    }

    #[test]
    fn analyze_requires_provider() {
        assert!(Cli::try_parse_from(["opsyield", "analyze"]).is_err());

        let cli = Cli::parse_from([
            "opsyield", "analyze", "--provider", "aws", "--days", "7", "--region", "eu-west-1",
        ]);
        let Some(Commands::Analyze(args)) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.provider, "aws");
        assert_eq!(args.days, Some(7));
        assert_eq!(args.provider_args.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn provider_args_prefer_flags() {
        let args = ProviderArgs {
            region: Some("eu-west-1".to_string()),
            ..ProviderArgs::default()
        };
        let file = ProviderParams {
            region: Some("us-west-2".to_string()),
            profile: Some("ops".to_string()),
            ..ProviderParams::default()
        };
        let params = args.over(&file);
        assert_eq!(params.region.as_deref(), Some("eu-west-1"));
        assert_eq!(params.profile.as_deref(), Some("ops"));
        assert!(params.project_id.is_none());
    }
}
