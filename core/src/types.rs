//! Shared primitive types used across the entire simulation.

/// A simulated year. Rows of the yearly record categories.
pub type Year = u64;

/// A trading-day countdown label. The first processed day of a year is
/// `trading_days`, the year-end is day 1.
pub type Day = u32;

/// Column index of a Monte Carlo path in every record tensor.
pub type PathIndex = usize;

/// The canonical run identifier.
pub type RunId = String;
