use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::core::error::{AnalysisError, Result};
use crate::core::price::{HistoryProvider, Interval, Period, PriceBar, PriceSeries};

const USER_AGENT: &str = concat!("quotelens/", env!("CARGO_PKG_VERSION"));

/// Price history from the Yahoo Finance chart API.
pub struct YahooHistoryProvider {
    base_url: String,
}

impl YahooHistoryProvider {
    pub fn new(base_url: &str) -> Self {
        YahooHistoryProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn history_url(&self, symbol: &str, period: Period, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&includeAdjustedClose=true&events=div%2Csplit",
            self.base_url, symbol, period, interval
        )
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: Option<String>,
}

impl ChartError {
    fn reason(&self) -> String {
        self.description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.code.clone())
    }
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug, Default)]
struct ChartMeta {
    /// Seconds east of UTC for the listing exchange at request time.
    #[serde(default)]
    gmtoffset: i64,
    #[serde(rename = "exchangeTimezoneName", default)]
    exchange_timezone_name: Option<String>,
}

/// How UTC timestamps are turned into exchange wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExchangeClock {
    Zone(Tz),
    /// Only used when the exchange zone is unknown; wrong across DST changes.
    FixedOffset(i64),
}

impl ExchangeClock {
    fn from_meta(ticker: &str, meta: &ChartMeta) -> Self {
        match meta.exchange_timezone_name.as_deref() {
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => ExchangeClock::Zone(tz),
                Err(e) => {
                    warn!(ticker, zone = name, error = %e, "Unknown exchange timezone, using gmtoffset");
                    ExchangeClock::FixedOffset(meta.gmtoffset)
                }
            },
            None => ExchangeClock::FixedOffset(meta.gmtoffset),
        }
    }

    fn local_time(self, timestamp: i64) -> Option<NaiveDateTime> {
        match self {
            ExchangeClock::Zone(tz) => Some(
                DateTime::from_timestamp(timestamp, 0)?
                    .with_timezone(&tz)
                    .naive_local(),
            ),
            ExchangeClock::FixedOffset(offset) => {
                Some(DateTime::from_timestamp(timestamp.checked_add(offset)?, 0)?.naive_utc())
            }
        }
    }
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

type Column<T> = Option<Vec<Option<T>>>;

#[derive(Deserialize, Debug, Default)]
struct Quote {
    open: Column<f64>,
    high: Column<f64>,
    low: Column<f64>,
    close: Column<f64>,
    volume: Column<u64>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Column<f64>,
}

fn value_at<T: Copy>(column: &Column<T>, index: usize) -> Option<T> {
    column
        .as_ref()
        .and_then(|values| values.get(index).copied().flatten())
}

/// Turns a chart payload into its single result item, mapping every
/// provider-side failure onto the pipeline error.
fn parse_chart(ticker: &str, status: StatusCode, body: &str) -> Result<ChartItem> {
    let parsed = serde_json::from_str::<YahooChartResponse>(body);

    // Unknown symbols come back as a chart error, usually with a 404
    if let Ok(YahooChartResponse {
        chart: ChartEnvelope {
            error: Some(error), ..
        },
    }) = &parsed
    {
        if status == StatusCode::NOT_FOUND || error.code == "Not Found" {
            return Err(AnalysisError::InvalidTicker {
                ticker: ticker.to_string(),
                reason: error.reason(),
            });
        }
        return Err(AnalysisError::Provider {
            ticker: ticker.to_string(),
            status: status.as_u16(),
            reason: error.reason(),
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(AnalysisError::InvalidTicker {
            ticker: ticker.to_string(),
            reason: "symbol not found".to_string(),
        });
    }
    if !status.is_success() {
        return Err(AnalysisError::Provider {
            ticker: ticker.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
        });
    }

    let data = parsed.map_err(|e| AnalysisError::MalformedResponse {
        ticker: ticker.to_string(),
        reason: e.to_string(),
    })?;

    data.chart
        .result
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| AnalysisError::EmptyData {
            ticker: ticker.to_string(),
            reason: "provider returned no result".to_string(),
        })
}

fn bar_date(timestamp: i64, clock: ExchangeClock, interval: Interval) -> Option<NaiveDateTime> {
    let local = clock.local_time(timestamp)?;
    if interval.is_intraday() {
        Some(local)
    } else {
        Some(local.date().and_time(NaiveTime::MIN))
    }
}

/// Builds validated bars: empty rows and rows without a usable close are
/// dropped, the index is sorted and duplicate dates keep the latest row.
fn bars_from_chart(ticker: &str, item: &ChartItem, interval: Interval) -> Result<Vec<PriceBar>> {
    let timestamps = item.timestamp.as_deref().unwrap_or_default();
    if timestamps.is_empty() {
        return Err(AnalysisError::EmptyData {
            ticker: ticker.to_string(),
            reason: "no price rows returned".to_string(),
        });
    }

    let empty_quote = Quote::default();
    let (quote, adjclose) = match &item.indicators {
        Some(indicators) => (
            indicators.quote.first().unwrap_or(&empty_quote),
            indicators.adjclose.first().and_then(|a| a.adjclose.as_ref()),
        ),
        None => (&empty_quote, None),
    };
    if quote.close.is_none() && adjclose.is_none() {
        return Err(AnalysisError::MissingClose(ticker.to_string()));
    }
    let adjclose: Column<f64> = adjclose.cloned();

    let clock = ExchangeClock::from_meta(ticker, &item.meta);
    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    let mut dropped = 0usize;
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = bar_date(*ts, clock, interval) else {
            dropped += 1;
            continue;
        };
        let bar = PriceBar {
            date,
            open: value_at(&quote.open, i),
            high: value_at(&quote.high, i),
            low: value_at(&quote.low, i),
            close: value_at(&quote.close, i),
            adj_close: value_at(&adjclose, i),
            volume: value_at(&quote.volume, i),
        };
        if bar.is_empty() || bar.close_price().is_none() {
            dropped += 1;
            continue;
        }
        bars.push(bar);
    }

    if dropped > 0 {
        warn!(ticker, dropped, "Dropped rows without a usable close price");
    }
    if bars.is_empty() {
        return Err(AnalysisError::EmptyData {
            ticker: ticker.to_string(),
            reason: "All data was NaN".to_string(),
        });
    }

    bars.sort_by_key(|bar| bar.date);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }

    Ok(deduped)
}

#[async_trait]
impl HistoryProvider for YahooHistoryProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(ticker = %ticker, period = %period, interval = %interval)
    )]
    async fn fetch_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries> {
        let symbol = ticker.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidTicker {
                ticker: ticker.to_string(),
                reason: "ticker is empty".to_string(),
            });
        }

        let url = self.history_url(&symbol, period, interval);
        debug!("Requesting price history from {}", url);

        let network_error = |source| AnalysisError::Network {
            ticker: symbol.clone(),
            source,
        };

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(network_error)?;
        let response = client.get(&url).send().await.map_err(network_error)?;

        let status = response.status();
        debug!(%status, "Received Yahoo response");
        let body = response.text().await.map_err(network_error)?;

        let item = parse_chart(&symbol, status, &body)?;
        let bars = bars_from_chart(&symbol, &item, interval)?;
        debug!(rows = bars.len(), "Parsed price history");

        PriceSeries::new(symbol, bars)
    }
}
