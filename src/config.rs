//! Run configuration
//! Loaded from an optional JSON file. Every field has a default, so `{}`
//! reproduces the two studies on the standard data files.

use crate::charts::Palette;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub stock: StockConfig,
    pub countries: CountriesConfig,
    pub render: RenderConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            stock: StockConfig::default(),
            countries: CountriesConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl StudyConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject tables whose columns cannot line up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let eps = &self.stock.eps;
        if eps.actual.len() != eps.labels.len() || eps.estimate.len() != eps.labels.len() {
            return Err(ConfigError::Invalid(format!(
                "EPS needs one actual and one estimate per label ({} labels, {} actual, {} estimate)",
                eps.labels.len(),
                eps.actual.len(),
                eps.estimate.len()
            )));
        }

        let fin = &self.stock.financials;
        if fin.revenue.len() != fin.labels.len() || fin.earnings.len() != fin.labels.len() {
            return Err(ConfigError::Invalid(format!(
                "financials need one revenue and one earnings value per label ({} labels, {} revenue, {} earnings)",
                fin.labels.len(),
                fin.revenue.len(),
                fin.earnings.len()
            )));
        }

        if !(self.render.scale > 0.0 && self.render.scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "render scale must be positive, got {}",
                self.render.scale
            )));
        }
        Ok(())
    }

    pub fn data_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }
}

/// Stock vs index study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub enabled: bool,
    pub stock_file: String,
    pub index_file: String,
    pub daily_file: String,
    pub stock_name: String,
    pub index_name: String,
    /// Legend names on the growth chart.
    pub stock_label: String,
    pub index_label: String,
    /// Column renamed to `Price` in every file.
    pub price_column: String,
    pub eps: EpsTable,
    pub financials: FinancialsTable,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stock_file: "NFLX.csv".into(),
            index_file: "DJI.csv".into(),
            daily_file: "NFLX_daily_by_quarter.csv".into(),
            stock_name: "Netflix".into(),
            index_name: "Dow Jones".into(),
            stock_label: "netflix".into(),
            index_label: "dji".into(),
            price_column: "Adj Close".into(),
            eps: EpsTable::default(),
            financials: FinancialsTable::default(),
        }
    }
}

/// Earnings per share, actual vs analyst estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsTable {
    pub labels: Vec<String>,
    pub actual: Vec<f64>,
    pub estimate: Vec<f64>,
}

impl Default for EpsTable {
    fn default() -> Self {
        Self {
            labels: labels(&["1Q2017", "2Q2017", "3Q2017", "4Q2017"]),
            actual: vec![0.4, 0.15, 0.29, 0.41],
            estimate: vec![0.37, 0.15, 0.32, 0.41],
        }
    }
}

/// Revenue and earnings per quarter, in billions of USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialsTable {
    pub labels: Vec<String>,
    pub revenue: Vec<f64>,
    pub earnings: Vec<f64>,
}

impl Default for FinancialsTable {
    fn default() -> Self {
        Self {
            labels: labels(&["2Q2017", "3Q2017", "4Q2017", "1Q2018"]),
            revenue: vec![2.79, 2.98, 3.29, 3.7],
            earnings: vec![0.0656, 0.12959, 0.18552, 0.29012],
        }
    }
}

/// Life expectancy vs GDP study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountriesConfig {
    pub enabled: bool,
    pub data_file: String,
    /// Column renamed to `LEABY`.
    pub life_expectancy_column: String,
    /// Countries singled out in the GDP composite, smallest economy last.
    pub focus: Vec<String>,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_file: "all_data.csv".into(),
            life_expectancy_column: "Life expectancy at birth (years)".into(),
            focus: labels(&["Chile", "Zimbabwe"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Multiplier on every figure's pixel size.
    pub scale: f64,
    pub palette: Palette,
    /// Also bundle charts and commentary into a slide deck.
    pub deck: bool,
    pub deck_name: String,
    pub open_report: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            palette: Palette::Pastel,
            deck: true,
            deck_name: "studies".into(),
            open_report: false,
        }
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
