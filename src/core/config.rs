use crate::core::error::AnalysisError;
use crate::core::price::{Interval, Period};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Parameters of a single analysis run.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ticker: String,
    pub period: Period,
    pub interval: Interval,
    pub sma_window: usize,
    pub out_dir: PathBuf,
    pub show_plots: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            ticker: "AMZN".to_string(),
            period: Period::FiveYears,
            interval: Interval::OneDay,
            sma_window: 20,
            out_dir: PathBuf::from("stock_data"),
            show_plots: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates the output directory, including any missing parents.
    pub fn ensure_out_dir(&self) -> Result<(), AnalysisError> {
        fs::create_dir_all(&self.out_dir).map_err(|e| AnalysisError::io(&self.out_dir, e))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_BASE_URL, |p| &p.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "quotelens", "quotelens")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.ticker, "AMZN");
        assert_eq!(config.period, Period::FiveYears);
        assert_eq!(config.interval, Interval::OneDay);
        assert_eq!(config.sma_window, 20);
        assert_eq!(config.out_dir, PathBuf::from("stock_data"));
        assert!(config.show_plots);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
analysis:
  ticker: "MSFT"
  period: "1y"
  interval: "1wk"
  sma_window: 10
  out_dir: "/tmp/out"
  show_plots: false
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.analysis.ticker, "MSFT");
        assert_eq!(config.analysis.period, Period::OneYear);
        assert_eq!(config.analysis.interval, Interval::OneWeek);
        assert_eq!(config.analysis.sma_window, 10);
        assert_eq!(config.analysis.out_dir, PathBuf::from("/tmp/out"));
        assert!(!config.analysis.show_plots);
        assert_eq!(config.providers.yahoo_base_url(), "http://example.com/yahoo");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml_str = r#"
analysis:
  ticker: "NVDA"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.analysis.ticker, "NVDA");
        assert_eq!(config.analysis.period, Period::FiveYears);
        assert_eq!(config.analysis.sma_window, 20);
        assert_eq!(config.providers.yahoo_base_url(), DEFAULT_YAHOO_BASE_URL);

        let empty: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(empty, AppConfig::default());
    }

    #[test]
    fn test_invalid_period_is_rejected() {
        let yaml_str = r#"
analysis:
  period: "7y"
"#;
        let err = serde_yaml::from_str::<AppConfig>(yaml_str).unwrap_err();
        assert!(err.to_string().contains("Invalid period: 7y"));
    }

    #[test]
    fn test_load_from_path_and_missing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "analysis:\n  sma_window: 50\n")?;

        let config = AppConfig::load_from_path(&path)?;
        assert_eq!(config.analysis.sma_window, 50);

        let missing = AppConfig::load_from_path(temp_dir.path().join("nope.yaml"));
        assert!(missing.is_err());
        assert!(
            missing
                .unwrap_err()
                .to_string()
                .starts_with("Failed to read config file")
        );
        Ok(())
    }

    #[test]
    fn test_ensure_out_dir_creates_parents() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = AnalysisConfig {
            out_dir: temp_dir.path().join("a").join("b"),
            ..AnalysisConfig::default()
        };
        config.ensure_out_dir()?;
        assert!(config.out_dir.is_dir());
        // idempotent
        config.ensure_out_dir()?;
        Ok(())
    }
}
