//! Flat-file persistence of a derived series.
use crate::core::error::{AnalysisError, Result};
use crate::core::metrics::{DerivedRow, DerivedSeries};
use crate::core::price::{PriceBar, PriceSeries};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::{Path, PathBuf};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PRICE_COLUMNS: [&str; 8] = [
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "Adj Close",
    "Volume",
    "return_daily",
];

pub fn csv_path(out_dir: &Path, ticker: &str) -> PathBuf {
    out_dir.join(format!("{ticker}.csv"))
}

/// Date-only output when every row sits at midnight, full timestamps otherwise.
fn date_format(rows: &[DerivedRow]) -> &'static str {
    if rows.iter().all(|r| r.bar.date.time() == NaiveTime::MIN) {
        DATE_FORMAT
    } else {
        DATETIME_FORMAT
    }
}

fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

/// Writes `<out_dir>/<ticker>.csv`. `out_dir` must already exist.
pub fn write_csv(series: &DerivedSeries, out_dir: &Path) -> Result<PathBuf> {
    let path = csv_path(out_dir, &series.ticker);

    let mut writer = csv::Writer::from_path(&path).map_err(|e| AnalysisError::csv(&path, e))?;

    let sma_column = series.sma_column();
    let mut header: Vec<&str> = PRICE_COLUMNS.to_vec();
    header.push(&sma_column);
    writer
        .write_record(&header)
        .map_err(|e| AnalysisError::csv(&path, e))?;

    let date_format = date_format(&series.rows);
    for row in &series.rows {
        let bar = &row.bar;
        writer
            .write_record(&[
                bar.date.format(date_format).to_string(),
                format_opt(bar.open),
                format_opt(bar.high),
                format_opt(bar.low),
                format_opt(bar.close),
                format_opt(bar.adj_close),
                format_opt(bar.volume),
                format_opt(row.return_daily),
                format_opt(row.sma),
            ])
            .map_err(|e| AnalysisError::csv(&path, e))?;
    }

    writer.flush().map_err(|e| AnalysisError::io(&path, e))?;
    debug!(path = %path.display(), rows = series.len(), "Wrote CSV");
    Ok(path)
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_opt<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    path: &Path,
) -> Result<Option<T>> {
    match record.get(index).map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|_| {
            AnalysisError::csv(
                path,
                format!("invalid value '{value}' in column {}", index + 1),
            )
        }),
    }
}

/// Reads back a file written by [`write_csv`]. The ticker is taken from the
/// file stem and the SMA window from the `SMA_<n>` header.
pub fn read_csv(path: &Path) -> Result<DerivedSeries> {
    let ticker = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AnalysisError::csv(path, "file name has no ticker"))?
        .to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AnalysisError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::csv(path, e))?
        .clone();
    if headers.len() != PRICE_COLUMNS.len() + 1
        || headers.iter().zip(PRICE_COLUMNS).any(|(h, c)| h != c)
    {
        return Err(AnalysisError::csv(path, "unexpected header row"));
    }
    let sma_window = headers
        .get(PRICE_COLUMNS.len())
        .and_then(|h| h.strip_prefix("SMA_"))
        .and_then(|w| w.parse::<usize>().ok())
        .ok_or_else(|| AnalysisError::csv(path, "missing SMA_<window> column"))?;

    let mut bars = Vec::new();
    let mut indicators = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AnalysisError::csv(path, e))?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = parse_date(raw_date)
            .ok_or_else(|| AnalysisError::csv(path, format!("invalid date '{raw_date}'")))?;

        bars.push(PriceBar {
            date,
            open: parse_opt(&record, 1, path)?,
            high: parse_opt(&record, 2, path)?,
            low: parse_opt(&record, 3, path)?,
            close: parse_opt(&record, 4, path)?,
            adj_close: parse_opt(&record, 5, path)?,
            volume: parse_opt(&record, 6, path)?,
        });
        indicators.push((
            parse_opt::<f64>(&record, 7, path)?,
            parse_opt::<f64>(&record, 8, path)?,
        ));
    }

    let bars = PriceSeries::new(ticker.clone(), bars)?.into_bars();
    let rows = bars
        .into_iter()
        .zip(indicators)
        .map(|(bar, (return_daily, sma))| DerivedRow {
            bar,
            return_daily,
            sma,
        })
        .collect();

    Ok(DerivedSeries {
        ticker,
        sma_window,
        rows,
    })
}
