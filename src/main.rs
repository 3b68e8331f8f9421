use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tslab::cli::parse_series_arg;
use tslab::core::log::init_logging;
use tslab::core::{AnalysisQuery, Aggregator, Frequency};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct QueryArgs {
    /// Series as CODE or CODE:LABEL, e.g. 433:IPCA
    #[arg(required = true, value_parser = parse_series_arg)]
    series: Vec<(tslab::core::SeriesCode, String)>,

    /// First date of the range (YYYY-MM-DD)
    #[arg(short, long, default_value = "2020-01-01")]
    start: NaiveDate,

    /// Last date of the range (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    end: Option<NaiveDate>,

    /// original, monthly or annual
    #[arg(short, long, default_value = "original")]
    frequency: Frequency,

    /// Reduction used when resampling: last, first, mean, sum, min or max
    #[arg(short, long)]
    aggregator: Option<Aggregator>,
}

impl From<QueryArgs> for AnalysisQuery {
    fn from(args: QueryArgs) -> Self {
        AnalysisQuery {
            series: args.series,
            start: args.start,
            end: args.end.unwrap_or_else(|| Local::now().date_naive()),
            frequency: args.frequency,
            aggregator: args.aggregator,
        }
    }
}

impl From<Commands> for tslab::AppCommand {
    fn from(cmd: Commands) -> tslab::AppCommand {
        match cmd {
            Commands::Catalog { search } => tslab::AppCommand::Catalog { search },
            Commands::Query { args, json } => tslab::AppCommand::Query {
                query: args.into(),
                json,
            },
            Commands::Export {
                args,
                output,
                stats,
            } => tslab::AppCommand::Export {
                query: args.into(),
                output,
                stats,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List popular series, or search them by name, description or code
    Catalog { search: Option<String> },
    /// Fetch series and show latest values, statistics and correlations
    Query {
        #[command(flatten)]
        args: QueryArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch series and write them as a delimited file
    Export {
        #[command(flatten)]
        args: QueryArgs,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        /// Export per-series statistics instead of the data table
        #[arg(long)]
        stats: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => tslab::cli::setup::setup_at_path(path),
            None => tslab::cli::setup::setup(),
        },
        Some(cmd) => tslab::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
