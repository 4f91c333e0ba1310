//! Fixed-shape record store.
//!
//! RULE: Every tensor is allocated once from configuration and mutated in
//! place. Nothing here ever resizes; a write past the preallocated rows is
//! a sizing mismatch between configuration and run length and is fatal.
//!
//! Yearly categories are `years × paths`. The multiplier and bankruptcy
//! categories carry one extra row for the reviewed following year. Daily
//! categories are `days × paths` and are overwritten every year.

use crate::{
    config::{BaselRecordsConfig, RecordShape},
    error::{SimError, SimResult},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Dense row-major `rows × cols` matrix of f64.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: RecordShape,
    data:  Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: RecordShape) -> Self {
        Self { shape, data: vec![0.0; shape.len()] }
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows() && col < self.cols() {
            Some(self.data[row * self.cols() + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.rows()).then(|| {
            let start = row * self.cols();
            &self.data[start..start + self.cols()]
        })
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [f64]> {
        if row < self.rows() {
            let cols = self.cols();
            let start = row * cols;
            Some(&mut self.data[start..start + cols])
        } else {
            None
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Per-column mean over `rows` (clamped to the tensor).
    pub fn column_means(&self, rows: std::ops::Range<usize>) -> Vec<f64> {
        let end = rows.end.min(self.rows());
        let start = rows.start.min(end);
        let mut sums = vec![0.0; self.cols()];
        for row in start..end {
            for (sum, v) in sums.iter_mut().zip(self.row(row).unwrap_or_default()) {
                *sum += v;
            }
        }
        let n = (end - start) as f64;
        if n > 0.0 {
            sums.iter_mut().for_each(|s| *s /= n);
        }
        sums
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAxis {
    /// years × paths
    Yearly,
    /// (years + 1) × paths
    YearlyExtended,
    /// days × paths
    Daily,
}

/// Every category the Basel profile records.
/// Variants are appended only; the discriminant indexes the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    /// Final exceedance count per year.
    Exceedances,
    /// Bankruptcy flag (0/1) per year, carried into the following row.
    Bankruptcy,
    MultiplierValue,
    MultiplierIndex,
    /// Reported VaR per day.
    Disclosure,
    /// Raw disclosed fraction per day.
    Action,
    DisclosureAnnualMean,
    MrcDaily,
    MrcAnnual,
    InvestmentDaily,
    InvestmentAnnualAvg,
    ReturnDaily,
    ReturnAnnual,
    ReturnEffectiveAnnual,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 14] = [
        Self::Exceedances,
        Self::Bankruptcy,
        Self::MultiplierValue,
        Self::MultiplierIndex,
        Self::Disclosure,
        Self::Action,
        Self::DisclosureAnnualMean,
        Self::MrcDaily,
        Self::MrcAnnual,
        Self::InvestmentDaily,
        Self::InvestmentAnnualAvg,
        Self::ReturnDaily,
        Self::ReturnAnnual,
        Self::ReturnEffectiveAnnual,
    ];

    pub fn axis(&self) -> RecordAxis {
        match self {
            Self::Bankruptcy | Self::MultiplierValue | Self::MultiplierIndex => {
                RecordAxis::YearlyExtended
            }
            Self::Disclosure
            | Self::Action
            | Self::MrcDaily
            | Self::InvestmentDaily
            | Self::ReturnDaily => RecordAxis::Daily,
            _ => RecordAxis::Yearly,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exceedances           => "exceedances",
            Self::Bankruptcy            => "bankruptcy",
            Self::MultiplierValue       => "multiplier_value",
            Self::MultiplierIndex       => "multiplier_index",
            Self::Disclosure            => "disclosure",
            Self::Action                => "action",
            Self::DisclosureAnnualMean  => "disclosure_annual_mean",
            Self::MrcDaily              => "mrc_daily",
            Self::MrcAnnual             => "mrc_annual",
            Self::InvestmentDaily       => "investment_daily",
            Self::InvestmentAnnualAvg   => "investment_annual_avg",
            Self::ReturnDaily           => "return_daily",
            Self::ReturnAnnual          => "return_annual",
            Self::ReturnEffectiveAnnual => "return_effective_annual",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

pub struct RecordStore {
    tensors: Vec<Tensor>,
    yearly:  RecordShape,
    daily:   RecordShape,
}

impl RecordStore {
    /// Preallocate every category. Both shapes are required.
    pub fn new(config: &BaselRecordsConfig) -> SimResult<Self> {
        let yearly = config.record_shape.ok_or_else(|| {
            SimError::Configuration("missing basel_records.record_shape".into())
        })?;
        let daily = config.daily_disclosure_record_shape.ok_or_else(|| {
            SimError::Configuration("missing basel_records.daily_disclosure_record_shape".into())
        })?;
        if yearly.is_empty() || daily.is_empty() {
            return Err(SimError::Configuration(format!(
                "record shapes must be non-empty, got {yearly:?} and {daily:?}"
            )));
        }
        if yearly.cols != daily.cols {
            return Err(SimError::Configuration(format!(
                "yearly records have {} paths but daily records have {}",
                yearly.cols, daily.cols
            )));
        }

        let extended = RecordShape::new(yearly.rows + 1, yearly.cols);
        let tensors = RecordCategory::ALL
            .iter()
            .map(|category| {
                Tensor::zeros(match category.axis() {
                    RecordAxis::Yearly         => yearly,
                    RecordAxis::YearlyExtended => extended,
                    RecordAxis::Daily          => daily,
                })
            })
            .collect();

        Ok(Self { tensors, yearly, daily })
    }

    pub fn paths(&self) -> usize {
        self.yearly.cols
    }

    /// Years the yearly categories can hold.
    pub fn year_capacity(&self) -> usize {
        self.yearly.rows
    }

    /// Days the daily categories can hold.
    pub fn day_capacity(&self) -> usize {
        self.daily.rows
    }

    /// Write `value` into row `key` of `category`, optionally zero-filling
    /// the whole category first. Returns the written row.
    pub fn add_record(
        &mut self,
        category: RecordCategory,
        value: &[f64],
        key: usize,
        flush: bool,
    ) -> SimResult<&[f64]> {
        if value.is_empty() {
            return Err(SimError::NullInput(format!(
                "empty record for '{}'",
                category.name()
            )));
        }
        let tensor = &mut self.tensors[category.slot()];
        if value.len() != tensor.cols() {
            return Err(SimError::Configuration(format!(
                "record for '{}' has {} values, expected {}",
                category.name(),
                value.len(),
                tensor.cols()
            )));
        }
        let rows = tensor.rows();
        if key >= rows {
            return Err(SimError::IndexOutOfBounds {
                category: category.name().to_string(),
                index:    key,
                len:      rows,
            });
        }
        if flush {
            tensor.fill(0.0);
        }
        let row = tensor.row_mut(key).ok_or_else(|| SimError::IndexOutOfBounds {
            category: category.name().to_string(),
            index:    key,
            len:      rows,
        })?;
        row.copy_from_slice(value);
        Ok(&*row)
    }

    /// Read a row, failing on an out-of-bounds key.
    pub fn row(&self, category: RecordCategory, key: usize) -> SimResult<&[f64]> {
        let tensor = self.record(category);
        tensor.row(key).ok_or_else(|| SimError::IndexOutOfBounds {
            category: category.name().to_string(),
            index:    key,
            len:      tensor.rows(),
        })
    }

    /// The live tensor. No copy is made.
    pub fn record(&self, category: RecordCategory) -> &Tensor {
        &self.tensors[category.slot()]
    }

    /// Mutable access to the live tensor. Writes land directly in the store.
    pub fn record_mut(&mut self, category: RecordCategory) -> &mut Tensor {
        &mut self.tensors[category.slot()]
    }

    /// Every category with its tensor.
    pub fn records(&self) -> impl Iterator<Item = (RecordCategory, &Tensor)> {
        RecordCategory::ALL.iter().map(move |&c| (c, self.record(c)))
    }

    /// Zero one category, or all of them. Shapes are kept.
    pub fn flush(&mut self, category: Option<RecordCategory>) {
        match category {
            Some(c) => self.record_mut(c).fill(0.0),
            None => self.tensors.iter_mut().for_each(|t| t.fill(0.0)),
        }
    }

    /// Write one category as delimited text: a row per tensor row, a
    /// column per path.
    pub fn dump<P: AsRef<Path>>(
        &self,
        out: P,
        category: RecordCategory,
        delimiter: u8,
    ) -> SimResult<()> {
        let out = out.as_ref();
        if out.as_os_str().is_empty() {
            return Err(SimError::NullInput("dump requires an output file name".into()));
        }
        let tensor = self.record(category);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_path(out)?;
        for row in 0..tensor.rows() {
            if let Some(values) = tensor.row(row) {
                writer.write_record(values.iter().map(|v| v.to_string()))?;
            }
        }
        writer.flush()?;
        log::debug!("dumped '{}' to {}", category.name(), out.display());
        Ok(())
    }

    /// Read a previous dump back into `category`. The shape must match.
    pub fn load<P: AsRef<Path>>(
        &mut self,
        input: P,
        category: RecordCategory,
        delimiter: u8,
    ) -> SimResult<()> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_path(input.as_ref())?;

        let shape = self.record(category).shape();
        let mut loaded = Tensor::zeros(shape);
        let mut rows_read = 0;
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let target = loaded.row_mut(row).ok_or_else(|| SimError::IndexOutOfBounds {
                category: category.name().to_string(),
                index:    row,
                len:      shape.rows,
            })?;
            if record.len() != target.len() {
                return Err(SimError::Configuration(format!(
                    "row {row} of '{}' has {} columns, expected {}",
                    category.name(),
                    record.len(),
                    target.len()
                )));
            }
            for (cell, field) in target.iter_mut().zip(record.iter()) {
                *cell = field.trim().parse::<f64>().map_err(|e| {
                    SimError::Configuration(format!("bad value '{field}' in '{}': {e}", category.name()))
                })?;
            }
            rows_read += 1;
        }
        if rows_read != shape.rows {
            return Err(SimError::Configuration(format!(
                "'{}' dump has {rows_read} rows, expected {}",
                category.name(),
                shape.rows
            )));
        }

        *self.record_mut(category) = loaded;
        Ok(())
    }
}
