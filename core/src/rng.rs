//! Deterministic random number generation and the daily return source.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SimRng instances derived from the single
//! master seed in the configuration.
//!
//! Each simulated year gets its own stream, seeded from
//! (master_seed XOR mixed year index). A year's returns are therefore
//! reproducible in isolation, whatever ran before it.

use crate::{
    error::{SimError, SimResult},
    types::Year,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG stream.
pub struct SimRng {
    inner: Pcg64Mcg,
}

impl SimRng {
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn sample<D: Distribution<f64>>(&mut self, dist: &D) -> f64 {
        dist.sample(&mut self.inner)
    }
}

/// Per-year streams for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_year(&self, year: Year) -> SimRng {
        SimRng::new(self.master_seed, year)
    }
}

/// Supplies the exogenous daily return batch, one scalar per path.
pub trait ReturnSource: Send {
    /// Called before the first day of every year.
    fn start_year(&mut self, _year: Year) {}

    fn next_batch(&mut self, paths: usize) -> Vec<f64>;
}

/// i.i.d. N(mean, std²) daily returns.
pub struct NormalReturns {
    bank:   RngBank,
    normal: Normal<f64>,
    rng:    SimRng,
}

impl NormalReturns {
    pub fn new(seed: u64, mean: f64, std: f64) -> SimResult<Self> {
        let normal = Normal::new(mean, std).map_err(|e| {
            SimError::Configuration(format!("invalid return distribution N({mean}, {std}): {e}"))
        })?;
        let bank = RngBank::new(seed);
        Ok(Self { bank, normal, rng: bank.for_year(0) })
    }
}

impl ReturnSource for NormalReturns {
    fn start_year(&mut self, year: Year) {
        self.rng = self.bank.for_year(year);
    }

    fn next_batch(&mut self, paths: usize) -> Vec<f64> {
        (0..paths).map(|_| self.rng.sample(&self.normal)).collect()
    }
}

/// Uniform [0, 1) returns.
pub struct UniformReturns {
    bank: RngBank,
    rng:  SimRng,
}

impl UniformReturns {
    pub fn new(seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self { bank, rng: bank.for_year(0) }
    }
}

impl ReturnSource for UniformReturns {
    fn start_year(&mut self, year: Year) {
        self.rng = self.bank.for_year(year);
    }

    fn next_batch(&mut self, paths: usize) -> Vec<f64> {
        (0..paths).map(|_| self.rng.next_f64()).collect()
    }
}
