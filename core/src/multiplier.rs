//! Capital multiplier step table.
//!
//! Maps a year's final exceedance band to next year's multiplier tier.
//! Bands 0–4 stay on the base multiplier, bands 5–10 step up one tier
//! each, and the bankrupt band maps to a sentinel far above any
//! realistic multiplier.

use serde::{Deserialize, Serialize};

/// Highest exceedance band; a bankrupt path is pinned here.
pub const BANKRUPT_BAND: usize = 11;

/// Highest band reachable without bankruptcy.
pub const MAX_PENALTY_BAND: usize = 10;

/// Multiplier assigned to a bankrupt path.
pub const SENTINEL_MULTIPLIER: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub index: usize,
    pub value: f64,
}

/// Immutable band → tier table. Each transition profile owns its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierTable {
    ladder:     Vec<f64>,
    band_tiers: Vec<usize>,
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self::basel()
    }
}

impl MultiplierTable {
    /// The regulatory ladder {3.0, 3.4, 3.5, 3.65, 3.75, 3.85, 4.0, sentinel}.
    pub fn basel() -> Self {
        Self {
            ladder:     vec![3.0, 3.4, 3.5, 3.65, 3.75, 3.85, 4.0, SENTINEL_MULTIPLIER],
            band_tiers: vec![0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7],
        }
    }

    /// Tier for a final exceedance band. Bands past the table saturate
    /// to the bankrupt tier.
    pub fn lookup(&self, band: usize) -> Tier {
        let band = band.min(self.max_band());
        let index = self.band_tiers[band];
        Tier { index, value: self.ladder[index] }
    }

    /// Tier for a band and bankruptcy state together.
    pub fn tier_for(&self, band: usize, bankrupt: bool) -> Tier {
        if bankrupt {
            self.lookup(self.max_band())
        } else {
            self.lookup(band)
        }
    }

    pub fn base(&self) -> Tier {
        self.lookup(0)
    }

    pub fn max_band(&self) -> usize {
        self.band_tiers.len() - 1
    }
}
