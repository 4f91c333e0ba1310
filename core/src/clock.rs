//! Simulation clock — owns the year/day cursor and the running guard.

use crate::{
    error::{SimError, SimResult},
    types::{Day, RunId, Year},
};
use serde::{Deserialize, Serialize};

/// Where a transition sits in the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayContext {
    pub year: Year,
    /// Countdown label, `trading_days` on the first day down to 1.
    pub day: Day,
    /// Elapsed days, 0 on the first day.
    pub day_index: usize,
    pub is_year_start: bool,
    pub is_year_end: bool,
}

impl DayContext {
    pub fn new(year: Year, day: Day, trading_days: u32) -> Self {
        Self {
            year,
            day,
            day_index:     trading_days.saturating_sub(day) as usize,
            is_year_start: day == trading_days,
            is_year_end:   day == 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id:       RunId,
    pub trading_days: u32,
    pub current:      Option<DayContext>,
    pub running:      bool,
}

impl SimClock {
    pub fn new(run_id: RunId, trading_days: u32) -> Self {
        Self {
            run_id,
            trading_days,
            current: None,
            running: false,
        }
    }

    /// Take the running guard. Fails if a run is already in progress.
    pub fn start(&mut self) -> SimResult<()> {
        if self.running {
            return Err(SimError::Validation(format!(
                "run '{}' already in progress",
                self.run_id
            )));
        }
        self.running = true;
        self.current = None;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// The days of one year in processing order, last day first.
    pub fn days_of(&self, year: Year) -> impl Iterator<Item = DayContext> {
        let trading_days = self.trading_days;
        (1..=trading_days)
            .rev()
            .map(move |day| DayContext::new(year, day, trading_days))
    }

    /// Move the cursor. Panics if called while stopped — callers must start().
    pub fn advance(&mut self, ctx: DayContext) -> DayContext {
        assert!(self.running, "advance() called on stopped clock");
        self.current = Some(ctx);
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_count_down_to_year_end() {
        let clock = SimClock::new("clock-test".into(), 5);
        let days: Vec<DayContext> = clock.days_of(2).collect();

        assert_eq!(days.iter().map(|d| d.day).collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);
        assert_eq!(days.iter().map(|d| d.day_index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(days[0].is_year_start && !days[0].is_year_end);
        assert!(days[4].is_year_end);
        assert!(days.iter().all(|d| d.year == 2));
    }

    #[test]
    fn running_guard_rejects_reentry() {
        let mut clock = SimClock::new("guard-test".into(), 5);
        clock.start().unwrap();
        assert!(matches!(clock.start(), Err(SimError::Validation(_))));
        clock.stop();
        assert!(clock.start().is_ok());
    }
}
