//! Basel backtesting Monte Carlo simulator.
//!
//! Simulates daily VaR disclosure, exceedance counting, capital
//! multiplier escalation and bankruptcy across many paths and years.

pub mod basel_profile;
pub mod capital;
pub mod clock;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod event;
pub mod multiplier;
pub mod profile;
pub mod record;
pub mod rng;
pub mod types;
pub mod window;
