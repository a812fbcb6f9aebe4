use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use quotelens::cli::analyze::AnalyzeOptions;
use quotelens::core::log::init_logging;
use quotelens::core::{Interval, Period};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch price history, derive indicators, export CSV and chart
    Analyze {
        /// Ticker symbol, e.g. AMZN
        #[arg(short, long)]
        ticker: Option<String>,

        /// History range: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max
        #[arg(short, long)]
        period: Option<Period>,

        /// Sampling interval: 1m 2m 5m 15m 30m 60m 90m 1h 1d 5d 1wk 1mo 3mo
        #[arg(short, long)]
        interval: Option<Interval>,

        /// Simple moving average window length
        #[arg(short = 'w', long)]
        sma_window: Option<usize>,

        /// Directory for the CSV and chart
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Do not open the chart after rendering
        #[arg(long)]
        no_show: bool,
    },
}

impl From<Commands> for quotelens::AppCommand {
    fn from(cmd: Commands) -> quotelens::AppCommand {
        match cmd {
            Commands::Analyze {
                ticker,
                period,
                interval,
                sma_window,
                out_dir,
                no_show,
            } => quotelens::AppCommand::Analyze(AnalyzeOptions {
                ticker,
                period,
                interval,
                sma_window,
                out_dir,
                no_show,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => quotelens::run_command(cmd.into(), cli.config_path.as_deref()).await,
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

fn setup() -> Result<()> {
    let path = quotelens::cli::setup::setup()?;
    println!("Created default configuration at {}", path.display());
    Ok(())
}
