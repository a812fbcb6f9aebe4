//! Price history abstractions and core types

use crate::core::error::{AnalysisError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// How far back the history request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            _ => Err(AnalysisError::InvalidPeriod(s.to_string())),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> String {
        period.as_str().to_string()
    }
}

/// Sampling granularity of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    NinetyMinutes,
    OneHour,
    OneDay,
    FiveDays,
    OneWeek,
    OneMonth,
    ThreeMonths,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Intraday bars keep their time of day; coarser bars are keyed by date.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Interval::OneMinute
                | Interval::TwoMinutes
                | Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::SixtyMinutes
                | Interval::NinetyMinutes
                | Interval::OneHour
        )
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Interval::OneMinute),
            "2m" => Ok(Interval::TwoMinutes),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "60m" => Ok(Interval::SixtyMinutes),
            "90m" => Ok(Interval::NinetyMinutes),
            "1h" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            "5d" => Ok(Interval::FiveDays),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            "3mo" => Ok(Interval::ThreeMonths),
            _ => Err(AnalysisError::InvalidInterval(s.to_string())),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> String {
        interval.as_str().to_string()
    }
}

/// One period of price history, keyed by exchange-local date/time.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

impl PriceBar {
    /// Adjusted close when present, plain close otherwise.
    pub fn close_price(&self) -> Option<f64> {
        self.adj_close.or(self.close)
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.adj_close.is_none()
            && self.volume.is_none()
    }
}

/// Ordered price history for a single ticker.
///
/// Every bar carries a usable close price and dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        let ticker = ticker.into();
        if bars.is_empty() {
            return Err(AnalysisError::EmptyData {
                ticker,
                reason: "price series has no rows".to_string(),
            });
        }
        if bars.iter().any(|bar| bar.close_price().is_none()) {
            return Err(AnalysisError::MissingClose(ticker));
        }
        if let Some(pair) = bars.windows(2).find(|pair| pair[1].date <= pair[0].date) {
            return Err(AnalysisError::UnorderedIndex(pair[1].date));
        }
        Ok(PriceSeries { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().filter_map(PriceBar::close_price).collect()
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: Option<f64>, adj_close: Option<f64>) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: None,
            high: None,
            low: None,
            close,
            adj_close,
            volume: None,
        }
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("5y".parse::<Period>().unwrap(), Period::FiveYears);
        assert_eq!("YTD".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!(" 3mo ".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert_eq!(Period::TenYears.to_string(), "10y");
        assert!(matches!(
            "7y".parse::<Period>(),
            Err(AnalysisError::InvalidPeriod(s)) if s == "7y"
        ));
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("1wk".parse::<Interval>().unwrap(), Interval::OneWeek);
        assert_eq!("1H".parse::<Interval>().unwrap(), Interval::OneHour);
        assert!(Interval::FifteenMinutes.is_intraday());
        assert!(!Interval::OneDay.is_intraday());
        assert!("1x".parse::<Interval>().is_err());
    }

    #[test]
    fn test_close_price_prefers_adjusted() {
        assert_eq!(bar(2, Some(10.0), Some(9.5)).close_price(), Some(9.5));
        assert_eq!(bar(2, Some(10.0), None).close_price(), Some(10.0));
        assert_eq!(bar(2, None, Some(9.5)).close_price(), Some(9.5));
        assert_eq!(bar(2, None, None).close_price(), None);
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = PriceSeries::new(
            "AMZN",
            vec![bar(3, Some(1.0), None), bar(2, Some(2.0), None)],
        );
        assert!(matches!(result, Err(AnalysisError::UnorderedIndex(_))));

        let duplicate = PriceSeries::new(
            "AMZN",
            vec![bar(2, Some(1.0), None), bar(2, Some(2.0), None)],
        );
        assert!(matches!(duplicate, Err(AnalysisError::UnorderedIndex(_))));
    }

    #[test]
    fn test_series_rejects_empty_and_missing_close() {
        assert!(matches!(
            PriceSeries::new("AMZN", vec![]),
            Err(AnalysisError::EmptyData { .. })
        ));
        assert!(matches!(
            PriceSeries::new("AMZN", vec![bar(2, None, None)]),
            Err(AnalysisError::MissingClose(_))
        ));
    }

    #[test]
    fn test_series_closes_follow_preference() {
        let series = PriceSeries::new(
            "AMZN",
            vec![bar(2, Some(10.0), Some(9.0)), bar(3, Some(11.0), None)],
        )
        .unwrap();
        assert_eq!(series.closes(), vec![9.0, 11.0]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.ticker(), "AMZN");
    }
}
