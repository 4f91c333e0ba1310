//! The simulation engine — owns the year × day loop.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   for each year:
//!     for each day, last trading day first (day 1 closes the year):
//!       1. Draw one return batch, one scalar per path
//!       2. Hand the same batch to every profile, in registration order
//!
//! RULES:
//!   - Every profile sees the identical, unmodified return batch.
//!   - No profile reads another profile's state.
//!   - All randomness flows through the ReturnSource.
//!   - Any error aborts the whole run; there is no per-path quarantine.

use crate::{
    basel_profile::BaselProfile,
    clock::SimClock,
    config::SimConfig,
    distribution::DistributionProvider,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    profile::{RunDimensions, SimProfile},
    record::RecordCategory,
    rng::{NormalReturns, ReturnSource},
    types::{RunId, Year},
};
use serde::Serialize;

/// Name the default Basel profile is registered under by `build()`.
pub const BASEL_PROFILE: &str = "basel";

pub struct SimEngine {
    pub run_id: RunId,
    pub clock:  SimClock,
    config:     SimConfig,
    returns:    Box<dyn ReturnSource>,
    profiles:   Vec<(String, Box<dyn SimProfile>)>,
    event_log:  Vec<EventLogEntry>,
}

impl SimEngine {
    /// Engine with no profiles, drawing normal returns from the configured seed.
    pub fn new(run_id: RunId, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let dist = &config.returns_distribution;
        let returns = NormalReturns::new(config.seed, dist.mean, dist.std)?;
        Ok(Self {
            clock: SimClock::new(run_id.clone(), config.trading_days),
            config,
            returns: Box::new(returns),
            profiles: Vec::new(),
            event_log: Vec::new(),
            run_id,
        })
    }

    /// Build an engine with a single Basel profile driven by `distribution`.
    pub fn build(
        run_id: RunId,
        config: SimConfig,
        distribution: Box<dyn DistributionProvider>,
    ) -> SimResult<Self> {
        let profile = BaselProfile::new(&config)?.with_distribution(distribution);
        let mut engine = SimEngine::new(run_id, config)?;
        engine.add_profile(BASEL_PROFILE, Box::new(profile));
        Ok(engine)
    }

    /// Replace the return generator.
    pub fn with_return_source(mut self, source: Box<dyn ReturnSource>) -> Self {
        self.returns = source;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn dimensions(&self) -> RunDimensions {
        RunDimensions {
            years:        self.config.simulation_number,
            trading_days: self.config.trading_days,
            paths:        self.config.simulation_years,
        }
    }

    /// Register a profile. A duplicate name is logged and ignored; the
    /// existing registration is kept.
    pub fn add_profile(&mut self, name: &str, profile: Box<dyn SimProfile>) -> bool {
        if self.profiles.iter().any(|(n, _)| n == name) {
            log::warn!("add_profile: duplicate simulation profile '{name}', keeping existing");
            return false;
        }
        self.profiles.push((name.to_string(), profile));
        true
    }

    pub fn remove_profile(&mut self, name: &str) -> Option<Box<dyn SimProfile>> {
        let pos = self.profiles.iter().position(|(n, _)| n == name)?;
        Some(self.profiles.remove(pos).1)
    }

    pub fn profile(&self, name: &str) -> Option<&dyn SimProfile> {
        self.profiles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_ref())
    }

    /// Query a registered Basel profile.
    pub fn basel_profile(&self, name: &str) -> Option<&BaselProfile> {
        self.profile(name)?.as_any().downcast_ref::<BaselProfile>()
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_running(&self) -> bool {
        self.clock.running
    }

    pub fn event_log(&self) -> &[EventLogEntry] {
        &self.event_log
    }

    /// Run the full year × day sweep over every profile.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        if self.is_running() {
            log::info!("run: '{}' already in progress", self.run_id);
            return Err(SimError::Validation(format!(
                "run '{}' already in progress",
                self.run_id
            )));
        }
        self.validate()?;

        self.clock.start()?;
        let result = self.simulate();
        self.clock.stop();
        result?;

        Ok(self.summary())
    }

    fn validate(&self) -> SimResult<()> {
        self.config.validate()?;
        let dims = self.dimensions();
        if dims.years == 0 {
            return Err(SimError::Validation("missing simulation number".into()));
        }
        if self.profiles.is_empty() {
            return Err(SimError::Validation("unable to locate simulation profiles".into()));
        }
        for (name, profile) in &self.profiles {
            profile.validate(&dims).map_err(|e| {
                SimError::Validation(format!("invalid profile '{name}': {e}"))
            })?;
        }
        Ok(())
    }

    fn simulate(&mut self) -> SimResult<()> {
        let dims = self.dimensions();
        self.event_log.clear();
        for (_, profile) in &mut self.profiles {
            profile.reset();
        }

        log::info!(
            "run {}: {} years × {} days × {} paths, {} profiles",
            self.run_id,
            dims.years,
            dims.trading_days,
            dims.paths,
            self.profiles.len()
        );
        let started = SimEvent::RunStarted {
            run_id:       self.run_id.clone(),
            seed:         self.config.seed,
            years:        dims.years,
            trading_days: dims.trading_days,
            paths:        dims.paths,
        };
        append_event(&mut self.event_log, &self.run_id, None, "engine", &started)?;

        for year in 0..dims.years {
            log::debug!("run {}: starting year {year}", self.run_id);
            self.returns.start_year(year);

            for ctx in self.clock.days_of(year) {
                let ctx = self.clock.advance(ctx);
                let batch = self.returns.next_batch(dims.paths);
                if batch.len() != dims.paths {
                    return Err(SimError::Configuration(format!(
                        "return source produced {} values for {} paths",
                        batch.len(),
                        dims.paths
                    )));
                }

                for (name, profile) in &mut self.profiles {
                    let events = profile.perform_transition(&batch, &ctx)?;
                    for event in &events {
                        append_event(&mut self.event_log, &self.run_id, Some(year), name, event)?;
                    }
                }
            }
        }

        let completed = SimEvent::RunCompleted {
            run_id: self.run_id.clone(),
            years:  dims.years,
        };
        append_event(&mut self.event_log, &self.run_id, None, "engine", &completed)?;
        log::info!("run {}: completed {} years", self.run_id, dims.years);
        Ok(())
    }

    /// Per-profile outcome, read from each profile's records.
    pub fn summary(&self) -> RunSummary {
        let dims = self.dimensions();
        let profiles = self
            .profiles
            .iter()
            .map(|(name, profile)| ProfileSummary::from_profile(name, profile.as_ref(), dims.years))
            .collect();
        RunSummary {
            run_id: self.run_id.clone(),
            years: dims.years,
            trading_days: dims.trading_days,
            paths: dims.paths,
            profiles,
        }
    }
}

fn append_event(
    log: &mut Vec<EventLogEntry>,
    run_id: &str,
    year: Option<Year>,
    source: &str,
    event: &SimEvent,
) -> SimResult<()> {
    let entry = EventLogEntry {
        seq:        log.len() as u64,
        run_id:     run_id.to_string(),
        year,
        source:     source.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    };
    log.push(entry);
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name:                  String,
    pub bankrupt_paths:        usize,
    pub mean_final_multiplier: f64,
    pub mean_effective_return: f64,
}

impl ProfileSummary {
    fn from_profile(name: &str, profile: &dyn SimProfile, years: u64) -> Self {
        let records = profile.records();
        let last = years as usize;

        let bankrupt_paths = records
            .row(RecordCategory::Bankruptcy, last)
            .map(|row| row.iter().filter(|&&b| b > 0.5).count())
            .unwrap_or(0);
        let mean_final_multiplier = records
            .row(RecordCategory::MultiplierValue, last)
            .map(|row| row.iter().sum::<f64>() / row.len().max(1) as f64)
            .unwrap_or(0.0);
        let effective = records.record(RecordCategory::ReturnEffectiveAnnual);
        let rows = last.min(effective.rows());
        let mean_effective_return = effective
            .column_means(0..rows)
            .iter()
            .sum::<f64>()
            / effective.cols().max(1) as f64;

        Self {
            name: name.to_string(),
            bankrupt_paths,
            mean_final_multiplier,
            mean_effective_return,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id:       RunId,
    pub years:        u64,
    pub trading_days: u32,
    pub paths:        usize,
    pub profiles:     Vec<ProfileSummary>,
}
