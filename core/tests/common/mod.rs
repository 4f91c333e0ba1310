//! Shared helpers for integration tests.

#![allow(dead_code)]

use basel_core::{
    config::{BaselRecordsConfig, SimConfig},
    rng::ReturnSource,
    types::Year,
};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config for `years` × `days` over `paths`, records sized to match.
pub fn config(years: u64, days: u32, paths: usize) -> SimConfig {
    let mut config = SimConfig {
        simulation_number: years,
        trading_days: days,
        simulation_years: paths,
        ..SimConfig::default()
    };
    config.basel_records = Some(BaselRecordsConfig::for_run(years as usize, days as usize, paths));
    config
}

/// Returns given by a script of (year, step within the year, path).
/// Step 0 is the first processed day of the year.
pub struct ScriptedReturns {
    year:   Year,
    step:   usize,
    script: fn(Year, usize, usize) -> f64,
}

impl ScriptedReturns {
    pub fn new(script: fn(Year, usize, usize) -> f64) -> Self {
        Self { year: 0, step: 0, script }
    }

    pub fn flat() -> Self {
        Self::new(|_, _, _| 0.0)
    }
}

impl ReturnSource for ScriptedReturns {
    fn start_year(&mut self, year: Year) {
        self.year = year;
        self.step = 0;
    }

    fn next_batch(&mut self, paths: usize) -> Vec<f64> {
        let batch = (0..paths).map(|p| (self.script)(self.year, self.step, p)).collect();
        self.step += 1;
        batch
    }
}
