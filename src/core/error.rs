//! The single error type surfaced by the analysis pipeline

use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid or unknown ticker {ticker}: {reason}")]
    InvalidTicker { ticker: String, reason: String },

    #[error("Failed to fetch data for {ticker}: {source}")]
    Network {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {status} for ticker: {ticker}: {reason}")]
    Provider {
        ticker: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to parse response for {ticker}: {reason}")]
    MalformedResponse { ticker: String, reason: String },

    #[error("No data found for ticker {ticker}: {reason}")]
    EmptyData { ticker: String, reason: String },

    #[error("Expected 'Adj Close' or 'Close' column in data for {0}")]
    MissingClose(String),

    #[error("Price index is not strictly increasing at {0}")]
    UnorderedIndex(NaiveDateTime),

    #[error("SMA window must be at least 1, got {0}")]
    InvalidWindow(usize),

    #[error("At least 2 rows are required for summary statistics, got {0}")]
    InsufficientRows(usize),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error at {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    #[error("Failed to render chart {path}: {reason}")]
    Chart { path: PathBuf, reason: String },
}

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AnalysisError::Csv {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
