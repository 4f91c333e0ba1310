//! Basel backtesting profile — one vectorized day step over every path.
//!
//! Each day this profile:
//!   1. Builds (tier, exceedances, day) observations for every path
//!   2. Asks the disclosure policy for a VaR fraction per path
//!   3. Scales it to a reported VaR and pushes it into the 60-day window
//!   4. Computes MRC = window mean × multiplier × √10
//!   5. Flags bankruptcy where the day's loss exceeds MRC (sticky)
//!   6. Counts an exceedance where the loss exceeds the reported VaR
//!   7. Records counts, flags, MRC and invested notional
//!
//! On year-end it reviews next year's multiplier from the step table and
//! closes the annual aggregates.
//!
//! The store is the source of truth: the current tier, count and
//! bankruptcy state are read back from it at the start of each step.

use crate::{
    capital,
    clock::DayContext,
    config::{DayOrder, SimConfig},
    distribution::{DistributionProvider, Observation},
    error::{SimError, SimResult},
    event::SimEvent,
    multiplier::{MultiplierTable, BANKRUPT_BAND, MAX_PENALTY_BAND},
    profile::{RunDimensions, SimProfile},
    record::{RecordCategory, RecordStore},
    types::PathIndex,
    window::DisclosureWindow,
};

/// Scalars the transition needs, resolved once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselParams {
    pub normal_var:         f64,
    pub max_report_value:   f64,
    pub notional:           f64,
    pub asset_price:        f64,
    pub fixed_daily_return: f64,
    pub trading_days:       u32,
    pub day_order:          DayOrder,
}

impl BaselParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            normal_var:         config.normal_var(),
            max_report_value:   config.max_report_value,
            notional:           config.notional,
            asset_price:        config.asset_price,
            fixed_daily_return: config.fixed_daily_return(),
            trading_days:       config.trading_days,
            day_order:          config.day_order,
        }
    }
}

/// Anomalies that were recorded rather than aborting the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    /// Path-days on which MRC was not strictly positive.
    pub mrc_underflow_days: u64,
    /// Path-years whose average invested notional was not positive.
    pub degenerate_years: u64,
}

pub struct BaselProfile {
    params:       BaselParams,
    table:        MultiplierTable,
    distribution: Option<Box<dyn DistributionProvider>>,
    records:      RecordStore,
    window:       DisclosureWindow,
    stats:        ProfileStats,
    /// Paths already reported as underflowing this year.
    underflow_seen: Vec<bool>,
    /// Underflow path-days so far this year.
    underflow_days: u64,
}

impl BaselProfile {
    /// Build the profile and preallocate its records.
    /// A missing `basel_records` section is a configuration error.
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let records_config = config.basel_records.as_ref().ok_or_else(|| {
            SimError::Configuration("missing configuration for basel_records".into())
        })?;
        let records = RecordStore::new(records_config)?;
        let paths = records.paths();
        let window = DisclosureWindow::new(paths);

        let mut profile = Self {
            params: BaselParams::from_config(config),
            table: MultiplierTable::basel(),
            distribution: None,
            records,
            window,
            stats: ProfileStats::default(),
            underflow_seen: vec![false; paths],
            underflow_days: 0,
        };
        profile.seed_initial_tier();
        Ok(profile)
    }

    pub fn with_distribution(mut self, distribution: Box<dyn DistributionProvider>) -> Self {
        self.distribution = Some(distribution);
        self
    }

    pub fn params(&self) -> &BaselParams {
        &self.params
    }

    pub fn table(&self) -> &MultiplierTable {
        &self.table
    }

    pub fn window(&self) -> &DisclosureWindow {
        &self.window
    }

    pub fn stats(&self) -> ProfileStats {
        self.stats
    }

    /// Every path starts the first year on the base multiplier.
    fn seed_initial_tier(&mut self) {
        let base = self.table.base();
        let paths = self.records.paths();
        if let Some(row) = self.records.record_mut(RecordCategory::MultiplierIndex).row_mut(0) {
            row.fill(base.index as f64);
        }
        if let Some(row) = self.records.record_mut(RecordCategory::MultiplierValue).row_mut(0) {
            row.fill(base.value);
        }
        log::debug!("seeded {paths} paths at multiplier {}", base.value);
    }

    /// Row of the daily categories for `ctx`.
    fn day_row(&self, ctx: &DayContext) -> SimResult<usize> {
        let row = match self.params.day_order {
            DayOrder::Ascending  => ctx.day_index,
            DayOrder::Descending => (ctx.day as usize).saturating_sub(1),
        };
        let capacity = self.records.day_capacity();
        if row >= capacity {
            return Err(SimError::IndexOutOfBounds {
                category: "daily records".into(),
                index:    row,
                len:      capacity,
            });
        }
        Ok(row)
    }

    fn year_row(&self, ctx: &DayContext) -> SimResult<usize> {
        let year = ctx.year as usize;
        let capacity = self.records.year_capacity();
        if year >= capacity {
            return Err(SimError::IndexOutOfBounds {
                category: "yearly records".into(),
                index:    year,
                len:      capacity,
            });
        }
        Ok(year)
    }

    /// Next year's tier, annual means and returns.
    fn close_year(
        &mut self,
        year: usize,
        counts: &[usize],
        bankrupt: &[bool],
    ) -> SimResult<SimEvent> {
        let tiers: Vec<_> = counts
            .iter()
            .zip(bankrupt)
            .map(|(&count, &b)| self.table.tier_for(count, b))
            .collect();
        let next_index: Vec<f64> = tiers.iter().map(|t| t.index as f64).collect();
        let next_value: Vec<f64> = tiers.iter().map(|t| t.value).collect();
        let flags: Vec<f64> = bankrupt.iter().map(|&b| f64::from(u8::from(b))).collect();

        self.records.add_record(RecordCategory::MultiplierIndex, &next_index, year + 1, false)?;
        self.records.add_record(RecordCategory::MultiplierValue, &next_value, year + 1, false)?;
        self.records.add_record(RecordCategory::Bankruptcy, &flags, year + 1, false)?;

        let days = 0..self.params.trading_days as usize;
        let disclosure_mean = self.records.record(RecordCategory::Disclosure).column_means(days.clone());
        let mrc_mean = self.records.record(RecordCategory::MrcDaily).column_means(days.clone());
        let investment_avg = self.records.record(RecordCategory::InvestmentDaily).column_means(days);

        let yearly_yield =
            self.params.trading_days as f64 * self.params.asset_price * self.params.fixed_daily_return;
        let annual_return: Vec<f64> = investment_avg.iter().map(|avg| avg * yearly_yield).collect();
        let effective: Vec<f64> = annual_return
            .iter()
            .zip(&investment_avg)
            .map(|(&ret, &avg)| {
                capital::effective_annual_return(ret, avg).unwrap_or_else(|| {
                    self.stats.degenerate_years += 1;
                    0.0
                })
            })
            .collect();

        self.records.add_record(RecordCategory::DisclosureAnnualMean, &disclosure_mean, year, false)?;
        self.records.add_record(RecordCategory::MrcAnnual, &mrc_mean, year, false)?;
        self.records.add_record(RecordCategory::InvestmentAnnualAvg, &investment_avg, year, false)?;
        self.records.add_record(RecordCategory::ReturnAnnual, &annual_return, year, false)?;
        self.records.add_record(RecordCategory::ReturnEffectiveAnnual, &effective, year, false)?;

        let paths = counts.len().max(1) as f64;
        let bankrupt_paths = bankrupt.iter().filter(|&&b| b).count();
        let mean_exceedances = counts.iter().sum::<usize>() as f64 / paths;
        let mean_next_multiplier = next_value.iter().sum::<f64>() / paths;

        log::debug!(
            "year={year} basel: bankrupt={bankrupt_paths} mean_ec={mean_exceedances:.2} next_k={mean_next_multiplier:.2}"
        );

        Ok(SimEvent::YearCompleted {
            year: year as u64,
            bankrupt_paths,
            mean_exceedances,
            mean_next_multiplier,
            mrc_underflow_days: self.underflow_days,
        })
    }
}

impl SimProfile for BaselProfile {
    fn name(&self) -> &'static str { "basel" }

    fn validate(&self, dims: &RunDimensions) -> SimResult<()> {
        if self.distribution.is_none() {
            return Err(SimError::Validation("basel profile has no distribution".into()));
        }
        if self.records.paths() != dims.paths {
            return Err(SimError::Validation(format!(
                "records hold {} paths, run has {}",
                self.records.paths(),
                dims.paths
            )));
        }
        if (self.records.year_capacity() as u64) < dims.years {
            return Err(SimError::Validation(format!(
                "records hold {} years, run has {}",
                self.records.year_capacity(),
                dims.years
            )));
        }
        if self.records.day_capacity() < dims.trading_days as usize {
            return Err(SimError::Validation(format!(
                "records hold {} days, run has {}",
                self.records.day_capacity(),
                dims.trading_days
            )));
        }
        if dims.trading_days != self.params.trading_days {
            return Err(SimError::Validation(format!(
                "profile configured for {} trading days, run has {}",
                self.params.trading_days, dims.trading_days
            )));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.records.flush(None);
        self.window.clear();
        self.stats = ProfileStats::default();
        self.underflow_seen.fill(false);
        self.underflow_days = 0;
        self.seed_initial_tier();
    }

    fn perform_transition(
        &mut self,
        returns: &[f64],
        ctx: &DayContext,
    ) -> SimResult<Vec<SimEvent>> {
        let paths = self.records.paths();
        if returns.len() != paths {
            return Err(SimError::Configuration(format!(
                "return batch has {} values, profile tracks {paths} paths",
                returns.len()
            )));
        }
        let year = self.year_row(ctx)?;
        let day_row = self.day_row(ctx)?;
        let mut events = Vec::new();
        if ctx.is_year_start {
            self.underflow_seen.fill(false);
            self.underflow_days = 0;
        }

        let tier_index: Vec<usize> = self
            .records
            .row(RecordCategory::MultiplierIndex, year)?
            .iter()
            .map(|&v| v as usize)
            .collect();
        let multiplier = self.records.row(RecordCategory::MultiplierValue, year)?.to_vec();
        let was_bankrupt: Vec<bool> = self
            .records
            .row(RecordCategory::Bankruptcy, year)?
            .iter()
            .map(|&v| v > 0.5)
            .collect();
        // Counts restart on the first day of each year; bankrupt paths stay pinned.
        let prior_counts: Vec<usize> = self
            .records
            .row(RecordCategory::Exceedances, year)?
            .iter()
            .zip(&was_bankrupt)
            .map(|(&v, &bankrupt)| match (bankrupt, ctx.is_year_start) {
                (true, _)      => BANKRUPT_BAND,
                (false, true)  => 0,
                (false, false) => v as usize,
            })
            .collect();

        let observations: Vec<Observation> = tier_index
            .iter()
            .zip(&prior_counts)
            .map(|(&tier_index, &exceedances)| Observation {
                tier_index,
                exceedances,
                day_index: ctx.day_index,
            })
            .collect();

        let distribution = self
            .distribution
            .as_ref()
            .ok_or_else(|| SimError::NullInput("basel profile has no distribution".into()))?;
        let mut fractions = distribution.get_action(&observations)?;
        if fractions.len() != paths || fractions.iter().any(|f| !f.is_finite()) {
            return Err(SimError::NullInput(format!(
                "{} distribution returned an invalid response for {paths} paths",
                distribution.name()
            )));
        }

        // Penalized paths disclose the cap.
        for (fraction, &count) in fractions.iter_mut().zip(&prior_counts) {
            if count >= MAX_PENALTY_BAND {
                *fraction = self.params.max_report_value;
            }
        }

        let reported: Vec<f64> = fractions.iter().map(|f| f * self.params.normal_var).collect();
        self.window.push(&reported)?;
        self.records.add_record(RecordCategory::Disclosure, &reported, day_row, false)?;
        self.records.add_record(RecordCategory::Action, &fractions, day_row, false)?;

        let mrc: Vec<f64> = self
            .window
            .mean()
            .iter()
            .zip(&multiplier)
            .map(|(&mean, &k)| capital::minimum_regulatory_capital(mean, k))
            .collect();

        let mut bankrupt = was_bankrupt;
        let mut counts = prior_counts;
        let mut newly_bankrupt = Vec::new();
        for path in 0..paths {
            let loss = -returns[path];
            if loss > mrc[path] && !bankrupt[path] {
                bankrupt[path] = true;
                newly_bankrupt.push(path);
            }
            if loss > reported[path] {
                counts[path] += 1;
            }
            if bankrupt[path] {
                counts[path] = BANKRUPT_BAND;
            }
            counts[path] = counts[path].min(BANKRUPT_BAND);
        }

        let mut underflow = Vec::new();
        let investment: Vec<f64> = mrc
            .iter()
            .enumerate()
            .map(|(path, &m)| {
                capital::invested_notional(self.params.notional, m, self.params.asset_price)
                    .unwrap_or_else(|| {
                        underflow.push(path);
                        0.0
                    })
            })
            .collect();

        let count_row: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        let flag_row: Vec<f64> = bankrupt.iter().map(|&b| f64::from(u8::from(b))).collect();
        self.records.add_record(RecordCategory::Exceedances, &count_row, year, false)?;
        self.records.add_record(RecordCategory::Bankruptcy, &flag_row, year, false)?;
        self.records.add_record(RecordCategory::MrcDaily, &mrc, day_row, false)?;
        self.records.add_record(RecordCategory::ReturnDaily, returns, day_row, false)?;
        self.records.add_record(RecordCategory::InvestmentDaily, &investment, day_row, false)?;

        if !newly_bankrupt.is_empty() {
            log::debug!(
                "year={year} day={} basel: {} paths bankrupt",
                ctx.day,
                newly_bankrupt.len()
            );
            events.push(SimEvent::BankruptcyDetected {
                year:  ctx.year,
                day:   ctx.day,
                paths: newly_bankrupt,
            });
        }
        self.stats.mrc_underflow_days += underflow.len() as u64;
        self.underflow_days += underflow.len() as u64;
        let first_underflow: Vec<PathIndex> = underflow
            .into_iter()
            .filter(|&path| !std::mem::replace(&mut self.underflow_seen[path], true))
            .collect();
        if !first_underflow.is_empty() {
            log::warn!(
                "year={year} day={} basel: MRC underflow on {} paths, invested notional set to 0",
                ctx.day,
                first_underflow.len()
            );
            events.push(SimEvent::MrcUnderflow {
                year:  ctx.year,
                day:   ctx.day,
                paths: first_underflow,
            });
        }

        if ctx.is_year_end {
            events.push(self.close_year(year, &counts, &bankrupt)?);
        }

        Ok(events)
    }

    fn records(&self) -> &RecordStore {
        &self.records
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BaselRecordsConfig, distribution::ContinuousDistribution, multiplier::SENTINEL_MULTIPLIER,
    };
    use approx::assert_relative_eq;

    fn profile(days: u32, paths: usize, fraction: f64) -> BaselProfile {
        let mut config = SimConfig {
            simulation_number: 2,
            trading_days: days,
            simulation_years: paths,
            ..SimConfig::default()
        };
        config.basel_records = Some(BaselRecordsConfig::for_run(2, days as usize, paths));
        BaselProfile::new(&config)
            .unwrap()
            .with_distribution(Box::new(ContinuousDistribution::constant(fraction)))
    }

    fn ctx(year: u64, day: u32, days: u32) -> DayContext {
        DayContext::new(year, day, days)
    }

    #[test]
    fn first_year_starts_on_base_multiplier() {
        let p = profile(5, 3, 1.0);
        assert_eq!(p.records().row(RecordCategory::MultiplierValue, 0).unwrap(), &[3.0; 3]);
        assert_eq!(p.records().row(RecordCategory::MultiplierIndex, 0).unwrap(), &[0.0; 3]);
    }

    #[test]
    fn mrc_reproduces_from_window_and_tier() {
        let mut p = profile(5, 1, 0.8);
        p.perform_transition(&[0.0], &ctx(0, 5, 5)).unwrap();
        p.perform_transition(&[0.0], &ctx(0, 4, 5)).unwrap();

        let mean = p.window().mean()[0];
        let mrc = p.records().record(RecordCategory::MrcDaily).get(1, 0).unwrap();
        assert_relative_eq!(mrc, mean * 3.0 * capital::SQRT_10);
        assert_relative_eq!(mean, 0.8 * p.params().normal_var);
    }

    #[test]
    fn missing_distribution_fails_validation() {
        let p = BaselProfile::new(&SimConfig::default_test()).unwrap();
        let dims = RunDimensions { years: 3, trading_days: 250, paths: 4 };
        assert!(matches!(p.validate(&dims), Err(SimError::Validation(_))));
    }

    #[test]
    fn missing_records_config_is_fatal() {
        let config = SimConfig::default();
        assert!(matches!(BaselProfile::new(&config), Err(SimError::Configuration(_))));
    }

    #[test]
    fn year_past_capacity_is_out_of_bounds() {
        let mut p = profile(5, 1, 1.0);
        let err = p.perform_transition(&[0.0], &ctx(2, 5, 5)).unwrap_err();
        assert!(matches!(err, SimError::IndexOutOfBounds { index: 2, len: 2, .. }));
    }

    fn underflow_paths(events: &[SimEvent]) -> Option<Vec<PathIndex>> {
        events.iter().find_map(|e| match e {
            SimEvent::MrcUnderflow { paths, .. } => Some(paths.clone()),
            _ => None,
        })
    }

    #[test]
    fn zero_disclosure_flags_underflow() {
        let mut p = profile(3, 2, 0.0);
        let events = p.perform_transition(&[0.0, 0.0], &ctx(0, 3, 3)).unwrap();

        assert_eq!(p.stats().mrc_underflow_days, 2);
        assert_eq!(underflow_paths(&events), Some(vec![0, 1]));
        assert_eq!(p.records().row(RecordCategory::InvestmentDaily, 0).unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn zero_investment_year_closes_with_zero_effective_return() {
        let mut p = profile(3, 2, 0.0);
        for day in (1..=3).rev() {
            p.perform_transition(&[0.0, 0.0], &ctx(0, day, 3)).unwrap();
        }

        let effective = p.records().row(RecordCategory::ReturnEffectiveAnnual, 0).unwrap();
        assert!(effective.iter().all(|r| r.is_finite()));
        assert_eq!(effective, &[0.0, 0.0]);
        assert_eq!(p.records().row(RecordCategory::InvestmentAnnualAvg, 0).unwrap(), &[0.0, 0.0]);
        assert_eq!(p.stats(), ProfileStats { mrc_underflow_days: 6, degenerate_years: 2 });
    }

    #[test]
    fn underflow_is_reported_once_per_path_per_year() {
        let mut p = profile(3, 2, 0.0);
        let mut year_end = Vec::new();
        for year in 0..2 {
            for day in (1..=3).rev() {
                let events = p.perform_transition(&[0.0, 0.0], &ctx(year, day, 3)).unwrap();
                if day == 3 {
                    assert_eq!(underflow_paths(&events), Some(vec![0, 1]));
                } else {
                    assert_eq!(underflow_paths(&events), None);
                }
                if day == 1 {
                    year_end.extend(events);
                }
            }
        }

        let counted: Vec<u64> = year_end
            .iter()
            .filter_map(|e| match e {
                SimEvent::YearCompleted { mrc_underflow_days, .. } => Some(*mrc_underflow_days),
                _ => None,
            })
            .collect();
        assert_eq!(counted, vec![6, 6]);
        assert_eq!(p.stats().mrc_underflow_days, 12);
    }

    #[test]
    fn bankrupt_path_rolls_to_sentinel() {
        let mut p = profile(3, 2, 1.0);
        p.perform_transition(&[-1_000.0, 0.0], &ctx(0, 3, 3)).unwrap();
        p.perform_transition(&[0.0, 0.0], &ctx(0, 2, 3)).unwrap();
        p.perform_transition(&[0.0, 0.0], &ctx(0, 1, 3)).unwrap();

        let records = p.records();
        assert_eq!(records.row(RecordCategory::Exceedances, 0).unwrap(), &[11.0, 0.0]);
        assert_eq!(records.row(RecordCategory::MultiplierValue, 1).unwrap(), &[SENTINEL_MULTIPLIER, 3.0]);
        assert_eq!(records.row(RecordCategory::Bankruptcy, 1).unwrap(), &[1.0, 0.0]);
    }
}
