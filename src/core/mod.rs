//! Core analysis logic: data model, indicators, statistics and export

pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod log;
pub mod metrics;
pub mod pipeline;
pub mod price;
pub mod stats;

// Re-export main types for cleaner imports
pub use error::AnalysisError;
pub use metrics::{DerivedRow, DerivedSeries};
pub use pipeline::{AnalysisOutput, run_analysis};
pub use price::{HistoryProvider, Interval, Period, PriceBar, PriceSeries};
pub use stats::SummaryStats;
