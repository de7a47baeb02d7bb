//! Serializable dataset configuration.
//!
//! Lists which macro series and market tickers make up the dataset, the
//! semantic column name each one gets, and the provider endpoints. The
//! default reproduces the standard nine-column macro/market set.

use crate::data::mapping::ColumnMapping;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_START_YEAR: i32 = 2000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A provider code and the column name it becomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesSpec {
    pub name: String,
    pub code: String,
}

impl SeriesSpec {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// FRED endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FredConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fred.stlouisfed.org/graph/fredgraph.csv".into(),
            timeout_secs: 30,
            user_agent: concat!("macrolab/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Yahoo Finance endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com/v8/finance/chart".into(),
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

/// Full dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetConfig {
    /// First calendar year of the range (January 1).
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    pub macro_series: Vec<SeriesSpec>,

    pub market_tickers: Vec<SeriesSpec>,

    #[serde(default)]
    pub fred: FredConfig,

    #[serde(default)]
    pub yahoo: YahooConfig,
}

fn default_start_year() -> i32 {
    DEFAULT_START_YEAR
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            macro_series: vec![
                SeriesSpec::new("GDP", "GDP"), // quarterly
                SeriesSpec::new("CPI", "CPIAUCSL"), // monthly
                SeriesSpec::new("Unemployment", "UNRATE"), // monthly
                SeriesSpec::new("Fed_Rate", "FEDFUNDS"), // monthly
                SeriesSpec::new("US_10Y", "DGS10"), // daily
                SeriesSpec::new("US_2Y", "DGS2"), // daily
                SeriesSpec::new("M2", "M2SL"), // monthly
            ],
            market_tickers: vec![
                SeriesSpec::new("SP500", "^GSPC"),
                SeriesSpec::new("Nasdaq", "^IXIC"),
            ],
            fred: FredConfig::default(),
            yahoo: YahooConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check lists are non-empty and every name and code is unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1900..=2100).contains(&self.start_year) {
            return Err(ConfigError::Invalid(format!(
                "start_year {} outside 1900..=2100",
                self.start_year
            )));
        }
        if self.macro_series.is_empty() {
            return Err(ConfigError::Invalid("macro_series is empty".into()));
        }
        if self.market_tickers.is_empty() {
            return Err(ConfigError::Invalid("market_tickers is empty".into()));
        }

        let mut names = HashSet::new();
        for spec in self.macro_series.iter().chain(&self.market_tickers) {
            if spec.name.trim().is_empty() || spec.code.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "series name and code must be non-empty".into(),
                ));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "column name '{}' is used twice",
                    spec.name
                )));
            }
        }

        for list in [&self.macro_series, &self.market_tickers] {
            let mut codes = HashSet::new();
            for spec in list {
                if !codes.insert(spec.code.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "provider code '{}' is listed twice",
                        spec.code
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn macro_mapping(&self) -> Result<ColumnMapping, ConfigError> {
        to_mapping(&self.macro_series)
    }

    pub fn market_mapping(&self) -> Result<ColumnMapping, ConfigError> {
        to_mapping(&self.market_tickers)
    }
}

fn to_mapping(specs: &[SeriesSpec]) -> Result<ColumnMapping, ConfigError> {
    ColumnMapping::new(specs.iter().map(|s| (s.code.as_str(), s.name.as_str())))
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = DatasetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.start_year, 2000);
        assert_eq!(config.macro_series.len(), 7);
        assert_eq!(config.market_tickers.len(), 2);

        let market = config.market_mapping().unwrap();
        assert_eq!(market.apply("^GSPC"), "SP500");
        assert_eq!(market.apply("^IXIC"), "Nasdaq");
        let macros = config.macro_mapping().unwrap();
        assert_eq!(macros.apply("CPIAUCSL"), "CPI");
        assert_eq!(macros.source_of("Fed_Rate"), Some("FEDFUNDS"));
    }

    #[test]
    fn toml_roundtrip() {
        let config = DatasetConfig::default();
        let s = config.to_toml_string().unwrap();
        let parsed = DatasetConfig::from_toml_str(&s).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let toml = r#"
            macro_series = [{ name = "CPI", code = "CPIAUCSL" }]
            market_tickers = [{ name = "SP500", code = "^GSPC" }]
        "#;
        let config = DatasetConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.start_year, DEFAULT_START_YEAR);
        assert_eq!(config.fred, FredConfig::default());
        assert_eq!(config.yahoo.timeout_secs, 30);
    }

    #[test]
    fn name_shared_across_sources_rejected() {
        let toml = r#"
            macro_series = [{ name = "X", code = "CPIAUCSL" }]
            market_tickers = [{ name = "X", code = "^GSPC" }]
        "#;
        assert!(matches!(
            DatasetConfig::from_toml_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn repeated_code_rejected() {
        let mut config = DatasetConfig::default();
        config.macro_series.push(SeriesSpec::new("CPI_again", "CPIAUCSL"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn start_year_bounds() {
        let config = DatasetConfig {
            start_year: 1850,
            ..DatasetConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_market_list_rejected() {
        let toml = r#"
            macro_series = [{ name = "CPI", code = "CPIAUCSL" }]
            market_tickers = []
        "#;
        assert!(DatasetConfig::from_toml_str(toml).is_err());
    }
}
