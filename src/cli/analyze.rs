use super::ui;
use crate::core::config::AnalysisConfig;
use crate::core::stats::{StatValue, SummaryStats};
use crate::core::{AnalysisOutput, HistoryProvider, Interval, Period, run_analysis};
use anyhow::Result;
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::debug;

/// Command line overrides for a single run. Unset fields keep the
/// configured value.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub ticker: Option<String>,
    pub period: Option<Period>,
    pub interval: Option<Interval>,
    pub sma_window: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub no_show: bool,
}

impl AnalyzeOptions {
    pub fn apply(&self, base: AnalysisConfig) -> AnalysisConfig {
        AnalysisConfig {
            ticker: self.ticker.clone().unwrap_or(base.ticker),
            period: self.period.unwrap_or(base.period),
            interval: self.interval.unwrap_or(base.interval),
            sma_window: self.sma_window.unwrap_or(base.sma_window),
            out_dir: self.out_dir.clone().unwrap_or(base.out_dir),
            show_plots: base.show_plots && !self.no_show,
        }
    }
}

const PERCENT_ROWS: [&str; 2] = ["Total Return (%)", "Daily Return Mean (%)"];

impl SummaryStats {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Statistic"), ui::header_cell("Value")]);

        for (label, value) in self.entries() {
            let value_cell = match value {
                StatValue::Missing => ui::na_cell(),
                StatValue::Number(v) if PERCENT_ROWS.contains(&label) => ui::change_cell(v),
                other => ui::value_cell(&other.to_string()),
            };
            table.add_row(vec![Cell::new(label), value_cell]);
        }

        table.to_string()
    }
}

pub async fn run(
    config: &AnalysisConfig,
    provider: &(dyn HistoryProvider + Send + Sync),
) -> Result<AnalysisOutput> {
    debug!(?config, "Resolved analysis config");
    println!(
        "{} | Period: {} | Interval: {}",
        ui::style_text(&format!("Analyzing {}", config.ticker), ui::StyleType::Title),
        config.period,
        config.interval
    );

    let pb = ui::new_spinner(format!("Fetching {} history...", config.ticker));
    let result = run_analysis(config, provider).await;
    pb.finish_and_clear();
    let output = result?;

    for path in [&output.csv_path, &output.chart_path] {
        println!(
            "{} {}",
            ui::style_text("Saved:", ui::StyleType::Success),
            ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
        );
    }
    println!("\n{}", output.summary.display_as_table());

    Ok(output)
}
