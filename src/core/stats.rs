//! Summary statistics over a derived price series.
use crate::core::error::{AnalysisError, Result};
use crate::core::metrics::DerivedSeries;
use chrono::NaiveDate;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub rows: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: f64,
    pub end_price: f64,
    pub total_return_pct: f64,
    /// Absent when no daily return exists.
    pub daily_return_mean_pct: Option<f64>,
    /// Sample standard deviation; needs at least two returns.
    pub daily_return_std_pct: Option<f64>,
    pub min_price: f64,
    pub max_price: f64,
}

/// A single displayable entry of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Count(usize),
    Date(NaiveDate),
    Number(f64),
    Missing,
}

impl Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatValue::Count(n) => write!(f, "{n}"),
            StatValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            StatValue::Number(v) => write!(f, "{v:.2}"),
            StatValue::Missing => write!(f, "N/A"),
        }
    }
}

impl SummaryStats {
    /// Label/value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, StatValue)> {
        vec![
            ("Rows", StatValue::Count(self.rows)),
            ("Start Date", StatValue::Date(self.start_date)),
            ("End Date", StatValue::Date(self.end_date)),
            ("Start Price", StatValue::Number(self.start_price)),
            ("End Price", StatValue::Number(self.end_price)),
            ("Total Return (%)", StatValue::Number(self.total_return_pct)),
            (
                "Daily Return Mean (%)",
                self.daily_return_mean_pct
                    .map_or(StatValue::Missing, StatValue::Number),
            ),
            (
                "Daily Return Std (%)",
                self.daily_return_std_pct
                    .map_or(StatValue::Missing, StatValue::Number),
            ),
            ("Min Price", StatValue::Number(self.min_price)),
            ("Max Price", StatValue::Number(self.max_price)),
        ]
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn summarize(series: &DerivedSeries) -> Result<SummaryStats> {
    let (first, last) = match (series.rows.first(), series.rows.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first, last),
        _ => return Err(AnalysisError::InsufficientRows(series.len())),
    };

    let closes = series.closes();
    let returns: Vec<f64> = series.rows.iter().filter_map(|r| r.return_daily).collect();

    let start_price = first.close();
    let end_price = last.close();
    let min_price = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(SummaryStats {
        rows: series.len(),
        start_date: first.bar.date.date(),
        end_date: last.bar.date.date(),
        start_price,
        end_price,
        total_return_pct: (end_price / start_price - 1.0) * 100.0,
        daily_return_mean_pct: (!returns.is_empty()).then(|| mean(&returns)),
        daily_return_std_pct: sample_std(&returns),
        min_price,
        max_price,
    })
}
