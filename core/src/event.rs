//! Run events.
//!
//! RULE: Profiles report notable state changes ONLY through events.
//! The engine stamps each event with its source and keeps them in the
//! run's event log; profiles never read each other's events or state.

use crate::types::{Day, PathIndex, RunId, Year};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunStarted {
        run_id:       RunId,
        seed:         u64,
        years:        u64,
        trading_days: u32,
        paths:        usize,
    },
    RunCompleted {
        run_id: RunId,
        years:  u64,
    },

    // ── Basel profile events ───────────────────────
    /// Paths that turned bankrupt on this day.
    BankruptcyDetected {
        year:  Year,
        day:   Day,
        paths: Vec<PathIndex>,
    },
    /// Paths whose MRC first dropped to zero or below this year.
    /// Later underflow days only feed the YearCompleted count.
    MrcUnderflow {
        year:  Year,
        day:   Day,
        paths: Vec<PathIndex>,
    },
    YearCompleted {
        year:                 Year,
        bankrupt_paths:       usize,
        mean_exceedances:     f64,
        mean_next_multiplier: f64,
        /// Path-days this year with MRC not strictly positive.
        mrc_underflow_days:   u64,
    },
}

impl SimEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::RunStarted { .. }         => "run_started",
            SimEvent::RunCompleted { .. }       => "run_completed",
            SimEvent::BankruptcyDetected { .. } => "bankruptcy_detected",
            SimEvent::MrcUnderflow { .. }       => "mrc_underflow",
            SimEvent::YearCompleted { .. }      => "year_completed",
        }
    }
}

/// A persisted event with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub run_id:     RunId,
    pub year:       Option<Year>,
    pub source:     String,
    pub event_type: String,
    pub payload:    String,
}
