//! Profile trait.
//!
//! RULE: Every transition engine implements SimProfile.
//! The SimEngine calls perform_transition() on each registered profile
//! in registration order, every day, with the same return batch.

use crate::{
    clock::DayContext,
    error::SimResult,
    event::SimEvent,
    record::RecordStore,
};
use std::any::Any;

/// Dimensions of the run a profile is about to take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDimensions {
    pub years:        u64,
    pub trading_days: u32,
    pub paths:        usize,
}

/// The contract every profile must fulfill.
pub trait SimProfile: Send {
    /// Stable kind name for this profile.
    fn name(&self) -> &'static str;

    /// Check the profile is well-formed for `dims` before anything runs.
    fn validate(&self, dims: &RunDimensions) -> SimResult<()>;

    /// Return to the pre-run state.
    fn reset(&mut self);

    /// Called once per day by the engine.
    ///
    /// - `returns`: the day's exogenous return, one per path
    /// - `ctx`:     year, day and year-boundary flags
    ///
    /// Returns any events to add to the run's event log.
    fn perform_transition(
        &mut self,
        returns: &[f64],
        ctx: &DayContext,
    ) -> SimResult<Vec<SimEvent>>;

    /// The profile's recorded results.
    fn records(&self) -> &RecordStore;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
