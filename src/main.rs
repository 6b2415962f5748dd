//! opsyield - multi-cloud cost orchestration.
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use opsyield::cli::{Cli, Commands, OutputFormat};
use opsyield::core::logging;
use opsyield::storage::{CommandInputs, ResolvedConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        print_quickstart();
        return ExitCode::SUCCESS;
    };

    let inputs = match command {
        Commands::Status(args) => CommandInputs {
            provider_args: Some(&args.provider_args),
            ..CommandInputs::default()
        },
        Commands::Analyze(args) => CommandInputs {
            days: args.days,
            provider_args: Some(&args.provider_args),
            ..CommandInputs::default()
        },
        Commands::Aggregate(args) => CommandInputs {
            providers: args.providers.as_deref(),
            days: args.days,
            provider_args: Some(&args.provider_args),
        },
    };
    let resolved = ResolvedConfig::resolve(&cli, inputs);

    // Initialize logging
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(|| logging::parse_log_level_from_env().map(logging::LogLevel::from_tracing_level))
        .or_else(|| resolved.as_ref().ok().and_then(|config| config.log_level))
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    logging::init(
        log_level,
        log_format,
        logging::parse_log_file_from_env(),
        cli.verbose,
    );

    let result = match resolved {
        Ok(config) => match run(command, &config).await {
            Ok(()) => Ok(()),
            Err(e) => Err((e, Some(config))),
        },
        Err(e) => Err((e, None)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err((e, config)) => {
            tracing::error!(error_code = e.error_code(), "{e}");
            let (format, no_color, pretty) = config.map_or_else(
                || {
                    (
                        cli.format_flag().unwrap_or(OutputFormat::Human),
                        cli.no_color,
                        cli.pretty,
                    )
                },
                |c| (c.format, c.no_color, c.pretty),
            );
            let rendered = opsyield::render::error::render_error(&e, format, no_color, pretty);
            eprintln!("{rendered}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(command: &Commands, config: &ResolvedConfig) -> opsyield::Result<()> {
    match command {
        Commands::Status(_) => opsyield::cli::status::execute(config).await,
        Commands::Analyze(args) => opsyield::cli::analyze::execute(args, config).await,
        Commands::Aggregate(_) => opsyield::cli::aggregate::execute(config).await,
    }
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r"opsyield - multi-cloud cost analysis

Analyze spend and infrastructure across GCP, AWS and Azure through their CLIs.

USAGE:
    opsyield [OPTIONS] <COMMAND>

COMMANDS:
    status      Check that gcloud, aws and az are installed and logged in
    analyze     Analyze one provider
    aggregate   Analyze several providers and merge the results

QUICK START:
    opsyield status
    opsyield analyze --provider aws --days 14
    opsyield analyze --provider gcp --billing-table proj.billing.export
    opsyield aggregate --providers gcp,aws,azure

ROBOT MODE (for AI agents):
    opsyield aggregate --json
    opsyield analyze --provider azure --format md

For more help: opsyield --help
"
    );
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}
