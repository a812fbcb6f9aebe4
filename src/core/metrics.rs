//! Derived indicators: daily return and simple moving average.
use crate::core::error::{AnalysisError, Result};
use crate::core::price::{PriceBar, PriceSeries};
use tracing::{debug, warn};

/// A price bar together with the indicators derived for it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub bar: PriceBar,
    /// Percentage change of the close against the previous row.
    pub return_daily: Option<f64>,
    pub sma: Option<f64>,
}

impl DerivedRow {
    /// Close price used by every indicator. Rows are only built from
    /// validated series, so the close is always present.
    pub fn close(&self) -> f64 {
        self.bar.close_price().unwrap_or(f64::NAN)
    }
}

/// A price series extended with the derived indicator columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub ticker: String,
    pub sma_window: usize,
    pub rows: Vec<DerivedRow>,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(DerivedRow::close).collect()
    }

    pub fn sma_column(&self) -> String {
        format!("SMA_{}", self.sma_window)
    }
}

/// Percentage change between consecutive values. The first entry, and any
/// entry following a zero, is `None`.
pub fn daily_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return returns;
    }
    returns.push(None);
    for pair in closes.windows(2) {
        let (prev, current) = (pair[0], pair[1]);
        if prev == 0.0 {
            returns.push(None);
        } else {
            returns.push(Some((current - prev) / prev * 100.0));
        }
    }
    returns
}

/// Trailing mean over `window` values; `None` until the window is filled.
pub fn simple_moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut sma = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return sma;
    }

    for i in (window - 1)..closes.len() {
        let start_idx = i + 1 - window;
        let sum: f64 = closes[start_idx..=i].iter().sum();
        sma[i] = Some(sum / window as f64);
    }

    sma
}

/// Builds a new derived series; the input series is left untouched.
pub fn add_metrics(series: &PriceSeries, sma_window: usize) -> Result<DerivedSeries> {
    if sma_window == 0 {
        return Err(AnalysisError::InvalidWindow(sma_window));
    }
    if sma_window > series.len() {
        warn!(
            ticker = series.ticker(),
            sma_window,
            rows = series.len(),
            "SMA window is longer than the series, no average will be produced"
        );
    }

    let closes = series.closes();
    let returns = daily_returns(&closes);
    let sma = simple_moving_average(&closes, sma_window);

    let rows = series
        .bars()
        .iter()
        .zip(returns)
        .zip(sma)
        .map(|((bar, return_daily), sma)| DerivedRow {
            bar: bar.clone(),
            return_daily,
            sma,
        })
        .collect::<Vec<_>>();

    debug!(rows = rows.len(), sma_window, "Derived metrics");

    Ok(DerivedSeries {
        ticker: series.ticker().to_string(),
        sma_window,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PriceBar {
                date: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: Some(*close),
                high: Some(*close),
                low: Some(*close),
                close: Some(*close),
                adj_close: None,
                volume: Some(1_000),
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn round2(v: f64) -> f64 {
        (v * 100.0).round() / 100.0
    }

    #[test]
    fn test_reference_example() {
        let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0]);
        let derived = add_metrics(&series, 2).unwrap();

        let sma: Vec<Option<f64>> = derived.rows.iter().map(|r| r.sma).collect();
        assert_eq!(sma, vec![None, Some(101.0), Some(101.5), Some(103.0)]);

        let returns: Vec<Option<f64>> = derived
            .rows
            .iter()
            .map(|r| r.return_daily.map(round2))
            .collect();
        assert_eq!(returns, vec![None, Some(2.0), Some(-0.98), Some(3.96)]);
        assert_eq!(derived.sma_column(), "SMA_2");
    }

    #[test]
    fn test_returns_match_closed_form() {
        let closes = [50.0, 55.0, 44.0, 44.0, 46.2];
        let returns = daily_returns(&closes);
        assert!(returns[0].is_none());
        for t in 1..closes.len() {
            let expected = (closes[t] - closes[t - 1]) / closes[t - 1] * 100.0;
            assert_eq!(returns[t], Some(expected));
        }
    }

    #[test]
    fn test_return_after_zero_is_absent() {
        assert_eq!(daily_returns(&[0.0, 1.0]), vec![None, None]);
        assert!(daily_returns(&[]).is_empty());
    }

    #[test]
    fn test_sma_window_semantics() {
        let closes = [10.0, 20.0, 30.0, 40.0, 50.0];
        let sma = simple_moving_average(&closes, 3);
        assert_eq!(sma[..2], [None, None]);
        for i in 2..closes.len() {
            let expected = closes[i - 2..=i].iter().sum::<f64>() / 3.0;
            assert_eq!(sma[i], Some(expected));
        }

        // window of one reproduces the closes
        let ones = simple_moving_average(&closes, 1);
        assert_eq!(ones, closes.iter().map(|c| Some(*c)).collect::<Vec<_>>());
    }

    #[test]
    fn test_last_sma_of_linear_series() {
        let series = series_from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let derived = add_metrics(&series, 2).unwrap();
        assert_eq!(derived.rows.last().unwrap().sma, Some(45.0));
    }

    #[test]
    fn test_window_longer_than_series() {
        let series = series_from_closes(&[1.0, 2.0]);
        let derived = add_metrics(&series, 5).unwrap();
        assert!(derived.rows.iter().all(|r| r.sma.is_none()));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let series = series_from_closes(&[1.0, 2.0]);
        assert!(matches!(
            add_metrics(&series, 0),
            Err(AnalysisError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let series = series_from_closes(&[3.0, 4.0, 5.0]);
        let before = series.clone();
        let derived = add_metrics(&series, 2).unwrap();
        assert_eq!(series, before);
        assert_eq!(derived.len(), series.len());
        assert_eq!(derived.rows[1].bar, series.bars()[1]);
    }

    #[test]
    fn test_adjusted_close_drives_metrics() {
        let mut series = series_from_closes(&[100.0, 100.0]);
        let mut bars = series.bars().to_vec();
        bars[1].adj_close = Some(110.0);
        series = PriceSeries::new("TEST", bars).unwrap();

        let derived = add_metrics(&series, 2).unwrap();
        assert_eq!(derived.rows[1].return_daily.map(round2), Some(10.0));
        assert_eq!(derived.rows[1].sma, Some(105.0));
    }
}
