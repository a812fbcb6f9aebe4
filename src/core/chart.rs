//! Price and moving-average chart rendering.
use crate::core::error::{AnalysisError, Result};
use crate::core::metrics::DerivedSeries;
use chrono::NaiveDateTime;
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use plotters::style::register_font;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

const CHART_SIZE: (u32, u32) = (1500, 750);
const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const BACKGROUND: RGBColor = RGBColor(0x0F, 0x1B, 0x2B);
const EDGE: RGBColor = RGBColor(0x2A, 0x3A, 0x55);
const LABEL: RGBColor = RGBColor(0xC8, 0xD6, 0xF0);
const TICK: RGBColor = RGBColor(0x9F, 0xB4, 0xD0);
const GRID: RGBColor = RGBColor(0x22, 0x32, 0x4A);
const PRICE_LINE: RGBColor = RGBColor(0x7A, 0xD9, 0xC7);
const SMA_LINE: RGBColor = RGBColor(0xD1, 0x6F, 0x60);

pub fn chart_path(out_dir: &Path, ticker: &str) -> PathBuf {
    out_dir.join(format!("{ticker}_price_sma.png"))
}

/// Registers the embedded font once per process.
fn ensure_font() -> bool {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    *REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok())
}

/// Formats a price as `$1,234.56`.
pub fn format_usd(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

/// Padded value bounds covering price and average.
fn y_bounds(series: &DerivedSeries) -> (f64, f64) {
    let values = series
        .rows
        .iter()
        .map(|r| r.close())
        .chain(series.rows.iter().filter_map(|r| r.sma));
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    let range = max - min;
    let pad = if range > 0.0 {
        range * 0.05
    } else {
        (max.abs() * 0.05).max(1.0)
    };
    (min - pad, max + pad)
}

/// Date axis bounds; a single-row series is widened by a day on each side.
fn x_bounds(series: &DerivedSeries) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = series.rows.first()?.bar.date;
    let end = series.rows.last()?.bar.date;
    if start == end {
        let day = chrono::Duration::days(1);
        Some((start - day, end + day))
    } else {
        Some((start, end))
    }
}

fn draw(series: &DerivedSeries, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (x_start, x_end) = x_bounds(series).ok_or("series has no rows")?;
    let (y_low, y_high) = y_bounds(series);
    let intraday = series
        .rows
        .iter()
        .any(|r| r.bar.date.time() != chrono::NaiveTime::MIN);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let title = format!("{} - Price & SMA", series.ticker);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 30).into_font().color(&LABEL))
        .margin(24)
        .x_label_area_size(60)
        .y_label_area_size(110)
        .build_cartesian_2d(RangedDateTime::from(x_start..x_end), y_low..y_high)?;

    let x_formatter = |d: &NaiveDateTime| {
        if intraday {
            d.format("%Y-%m-%d %H:%M").to_string()
        } else {
            d.format("%Y-%m-%d").to_string()
        }
    };
    let y_formatter = |p: &f64| format_usd(*p);

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(10)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc("Date")
        .y_desc("Price (USD)")
        .axis_style(EDGE)
        .bold_line_style(GRID.mix(0.6))
        .light_line_style(TRANSPARENT)
        .label_style((FONT_FAMILY, 16).into_font().color(&TICK))
        .axis_desc_style((FONT_FAMILY, 18).into_font().color(&LABEL))
        .draw()?;

    let price_points = series.rows.iter().map(|r| (r.bar.date, r.close()));
    chart
        .draw_series(LineSeries::new(price_points, PRICE_LINE.stroke_width(2)))?
        .label("Price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], PRICE_LINE.stroke_width(2)));

    let sma_points = series
        .rows
        .iter()
        .filter_map(|r| r.sma.map(|sma| (r.bar.date, sma)));
    chart
        .draw_series(LineSeries::new(
            sma_points,
            SMA_LINE.mix(0.9).stroke_width(2),
        ))?
        .label(format!("SMA {}", series.sma_window))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], SMA_LINE.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(BACKGROUND.mix(0.8))
        .border_style(TRANSPARENT)
        .label_font((FONT_FAMILY, 16).into_font().color(&LABEL))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Renders `<out_dir>/<ticker>_price_sma.png`. `out_dir` must already exist.
pub fn plot_price_sma(series: &DerivedSeries, out_dir: &Path) -> Result<PathBuf> {
    let path = chart_path(out_dir, &series.ticker);

    if !ensure_font() {
        return Err(AnalysisError::Chart {
            path,
            reason: "embedded font could not be loaded".to_string(),
        });
    }

    draw(series, &path).map_err(|e| AnalysisError::Chart {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    debug!(path = %path.display(), "Rendered chart");
    Ok(path)
}

fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

fn launch_viewer(mut command: Command, path: &Path) -> bool {
    match command.spawn() {
        Ok(_) => {
            debug!(path = %path.display(), "Opened chart viewer");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not open chart viewer");
            false
        }
    }
}

/// Opens the chart in the platform image viewer. Failing to launch a viewer
/// does not fail the run.
pub fn show_chart(path: &Path) {
    launch_viewer(viewer_command(path), path);
}
