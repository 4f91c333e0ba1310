//! Simulation configuration.
//!
//! Loaded from a nested JSON document. Every scalar has a default; the
//! record shapes under `basel_records` do not, and a missing shape is
//! rejected when the RecordStore is built.

use crate::{
    capital,
    error::{SimError, SimResult},
};
use serde::{Deserialize, Serialize};

/// Row layout for the daily record categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DayOrder {
    /// Chronological: row 0 is the first processed day of the year.
    #[default]
    #[serde(rename = "A")]
    Ascending,
    /// Countdown: row `day - 1`, so the year-end lands in row 0.
    #[serde(rename = "D")]
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsDistributionConfig {
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_std")]
    pub std: f64,
}

impl Default for ReturnsDistributionConfig {
    fn default() -> Self {
        Self {
            confidence_level: default_confidence_level(),
            mean:             0.0,
            std:              default_std(),
        }
    }
}

/// A fixed `rows × cols` tensor shape, written as `[rows, cols]` in JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct RecordShape {
    pub rows: usize,
    pub cols: usize,
}

impl RecordShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<[usize; 2]> for RecordShape {
    fn from(dims: [usize; 2]) -> Self {
        Self::new(dims[0], dims[1])
    }
}

impl From<RecordShape> for [usize; 2] {
    fn from(shape: RecordShape) -> Self {
        [shape.rows, shape.cols]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselRecordsConfig {
    /// years × paths
    #[serde(default)]
    pub record_shape: Option<RecordShape>,
    /// days × paths
    #[serde(default)]
    pub daily_disclosure_record_shape: Option<RecordShape>,
}

impl BaselRecordsConfig {
    /// Shapes sized exactly for a run of `years` × `days` over `paths`.
    pub fn for_run(years: usize, days: usize, paths: usize) -> Self {
        Self {
            record_shape:                  Some(RecordShape::new(years, paths)),
            daily_disclosure_record_shape: Some(RecordShape::new(days, paths)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of simulated years (outer loop).
    #[serde(default = "default_simulation_number")]
    pub simulation_number: u64,
    #[serde(default = "default_trading_days")]
    pub trading_days: u32,
    /// Number of simulated paths, i.e. the width of every batch.
    #[serde(default = "default_simulation_years")]
    pub simulation_years: usize,
    #[serde(default)]
    pub day_order: DayOrder,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub returns_distribution: ReturnsDistributionConfig,
    #[serde(default)]
    pub normal_var: Option<f64>,
    #[serde(default)]
    pub normal_var10: Option<f64>,
    #[serde(default = "default_max_report_value")]
    pub max_report_value: f64,
    #[serde(default = "default_notional")]
    pub notional: f64,
    #[serde(default = "default_asset_price")]
    pub asset_price: f64,
    #[serde(default = "default_fixed_annual_return")]
    pub fixed_annual_return: f64,
    #[serde(default)]
    pub basel_records: Option<BaselRecordsConfig>,
}

fn default_simulation_number() -> u64 { 3000 }
fn default_trading_days() -> u32 { 250 }
fn default_simulation_years() -> usize { 30 }
fn default_seed() -> u64 { 42 }
fn default_confidence_level() -> f64 { 0.99 }
fn default_std() -> f64 { 1.0 }
fn default_max_report_value() -> f64 { 3.0 }
fn default_notional() -> f64 { 100_000.0 }
fn default_asset_price() -> f64 { 1.0 }
fn default_fixed_annual_return() -> f64 { 0.06 }

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation_number:    default_simulation_number(),
            trading_days:         default_trading_days(),
            simulation_years:     default_simulation_years(),
            day_order:            DayOrder::default(),
            seed:                 default_seed(),
            returns_distribution: ReturnsDistributionConfig::default(),
            normal_var:           None,
            normal_var10:         None,
            max_report_value:     default_max_report_value(),
            notional:             default_notional(),
            asset_price:          default_asset_price(),
            fixed_annual_return:  default_fixed_annual_return(),
            basel_records:        None,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json_str(&content)?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small run with record shapes sized to match: 3 years, 250 days, 4 paths.
    pub fn default_test() -> Self {
        let mut config = Self {
            simulation_number: 3,
            simulation_years:  4,
            seed:              0xBA5E_1000,
            ..Self::default()
        };
        config.basel_records = Some(config.sized_records());
        config
    }

    /// Record shapes sized exactly to this run's dimensions.
    pub fn sized_records(&self) -> BaselRecordsConfig {
        BaselRecordsConfig::for_run(
            self.simulation_number as usize,
            self.trading_days as usize,
            self.simulation_years,
        )
    }

    /// Numeric sanity checks. Shapes are checked by the RecordStore.
    pub fn validate(&self) -> SimResult<()> {
        let dist = &self.returns_distribution;
        if !(dist.confidence_level > 0.0 && dist.confidence_level < 1.0) {
            return Err(SimError::Configuration(format!(
                "returns_distribution.confidence_level must be in (0, 1), got {}",
                dist.confidence_level
            )));
        }
        if !(dist.std > 0.0) {
            return Err(SimError::Configuration(format!(
                "returns_distribution.std must be positive, got {}",
                dist.std
            )));
        }
        if self.trading_days == 0 {
            return Err(SimError::Configuration("trading_days must be positive".into()));
        }
        if self.simulation_years == 0 {
            return Err(SimError::Configuration("simulation_years must be positive".into()));
        }
        if !(self.max_report_value >= 0.0) {
            return Err(SimError::Configuration(format!(
                "max_report_value must be non-negative, got {}",
                self.max_report_value
            )));
        }
        Ok(())
    }

    /// One-day VaR scale applied to every disclosed fraction.
    pub fn normal_var(&self) -> f64 {
        self.normal_var.unwrap_or_else(|| {
            let dist = &self.returns_distribution;
            capital::normal_ppf(dist.confidence_level, dist.mean, dist.std)
        })
    }

    /// Ten-day VaR constant, negative by convention.
    pub fn normal_var10(&self) -> f64 {
        self.normal_var10
            .unwrap_or_else(|| -self.normal_var() * capital::SQRT_10)
    }

    /// Portfolio yield earned per trading day.
    pub fn fixed_daily_return(&self) -> f64 {
        self.fixed_annual_return / self.trading_days as f64
    }
}
