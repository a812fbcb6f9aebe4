//! The fetch → derive → summarize → export pipeline.
use crate::core::chart::{plot_price_sma, show_chart};
use crate::core::config::AnalysisConfig;
use crate::core::error::Result;
use crate::core::export::write_csv;
use crate::core::metrics::{DerivedSeries, add_metrics};
use crate::core::price::HistoryProvider;
use crate::core::stats::{SummaryStats, summarize};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub series: DerivedSeries,
    pub summary: SummaryStats,
    pub csv_path: PathBuf,
    pub chart_path: PathBuf,
}

/// Runs one analysis. Any failure aborts the run; files belonging to a stage
/// after the failing one are never written.
#[instrument(
    name = "Analysis",
    skip_all,
    fields(ticker = %config.ticker, period = %config.period, interval = %config.interval)
)]
pub async fn run_analysis(
    config: &AnalysisConfig,
    provider: &(dyn HistoryProvider + Send + Sync),
) -> Result<AnalysisOutput> {
    let prices = provider
        .fetch_history(&config.ticker, config.period, config.interval)
        .await?;
    debug!(rows = prices.len(), "Fetched price history");

    let series = add_metrics(&prices, config.sma_window)?;
    let summary = summarize(&series)?;

    config.ensure_out_dir()?;
    let csv_path = write_csv(&series, &config.out_dir)?;
    let chart_path = plot_price_sma(&series, &config.out_dir)?;
    info!(csv = %csv_path.display(), chart = %chart_path.display(), "Analysis complete");

    if config.show_plots {
        show_chart(&chart_path);
    }

    Ok(AnalysisOutput {
        series,
        summary,
        csv_path,
        chart_path,
    })
}
