pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::analyze::AnalyzeOptions;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Analyze(AnalyzeOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("quotelens starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider =
        providers::yahoo_finance::YahooHistoryProvider::new(config.providers.yahoo_base_url());

    match command {
        AppCommand::Analyze(options) => {
            let analysis = options.apply(config.analysis);
            cli::analyze::run(&analysis, &provider).await?;
        }
    }

    Ok(())
}
