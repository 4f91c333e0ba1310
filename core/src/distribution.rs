//! Disclosure policies.
//!
//! A DistributionProvider maps each path's observation to the fraction of
//! the one-day VaR it discloses. The discrete variant gathers from a
//! precomputed tensor, the continuous variant evaluates a function.
//! Both are deterministic: the same observations always give the same
//! fractions, whatever the return stream does.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Per-path features fed to the policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Observation {
    pub tier_index: usize,
    pub exceedances: usize,
    /// Elapsed days in the year, 0 on the first processed day.
    pub day_index: usize,
}

impl Observation {
    pub fn as_array(&self) -> [usize; 3] {
        [self.tier_index, self.exceedances, self.day_index]
    }
}

pub trait DistributionProvider: Send {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// One disclosed fraction per observation, order preserved.
    fn get_action(&self, observations: &[Observation]) -> SimResult<Vec<f64>>;
}

// ── Discrete ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct DiscreteTableFile {
    shape:  [usize; 3],
    values: Vec<f64>,
}

/// Lookup table indexed by (tier, exceedances, day), stored flat in
/// row-major order.
#[derive(Debug, Clone)]
pub struct DiscreteDistribution {
    shape:  [usize; 3],
    values: Vec<f64>,
}

impl DiscreteDistribution {
    pub fn new(shape: [usize; 3], values: Vec<f64>) -> SimResult<Self> {
        if values.is_empty() {
            return Err(SimError::NullInput(
                "discrete distribution requires a non-empty table".into(),
            ));
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(SimError::Configuration(format!(
                "discrete table has {} values, shape {:?} needs {expected}",
                values.len(),
                shape
            )));
        }
        Ok(Self { shape, values })
    }

    /// Same fraction in every cell.
    pub fn filled(shape: [usize; 3], value: f64) -> SimResult<Self> {
        Self::new(shape, vec![value; shape.iter().product()])
    }

    /// Load `{ "shape": [t, e, d], "values": [...] }` from disk.
    pub fn from_json_file(path: &str) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: DiscreteTableFile = serde_json::from_str(&content)?;
        Self::new(file.shape, file.values)
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Flat row-major offset for `coords`.
    pub fn ravel_index(&self, coords: [usize; 3]) -> SimResult<usize> {
        let mut flat = 0;
        for (axis, (&c, &dim)) in coords.iter().zip(self.shape.iter()).enumerate() {
            if c >= dim {
                return Err(SimError::IndexOutOfBounds {
                    category: format!("discrete distribution axis {axis}"),
                    index:    c,
                    len:      dim,
                });
            }
            flat = flat * dim + c;
        }
        Ok(flat)
    }
}

impl DistributionProvider for DiscreteDistribution {
    fn name(&self) -> &'static str { "discrete" }

    fn get_action(&self, observations: &[Observation]) -> SimResult<Vec<f64>> {
        observations
            .iter()
            .map(|obs| self.ravel_index(obs.as_array()).map(|i| self.values[i]))
            .collect()
    }
}

// ── Continuous ─────────────────────────────────────────────────────

pub type PolicyFn = Box<dyn Fn(&Observation) -> f64 + Send>;

/// Policy given by an arbitrary deterministic function.
pub struct ContinuousDistribution {
    func: PolicyFn,
}

impl ContinuousDistribution {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Observation) -> f64 + Send + 'static,
    {
        Self { func: Box::new(func) }
    }

    /// Rejects a missing function up front.
    pub fn from_option(func: Option<PolicyFn>) -> SimResult<Self> {
        func.map(|func| Self { func })
            .ok_or_else(|| SimError::NullInput("continuous distribution requires a function".into()))
    }

    /// Discloses the same fraction regardless of state.
    pub fn constant(fraction: f64) -> Self {
        Self::new(move |_| fraction)
    }
}

impl std::fmt::Debug for ContinuousDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuousDistribution").finish_non_exhaustive()
    }
}

impl DistributionProvider for ContinuousDistribution {
    fn name(&self) -> &'static str { "continuous" }

    fn get_action(&self, observations: &[Observation]) -> SimResult<Vec<f64>> {
        Ok(observations.iter().map(|obs| (self.func)(obs)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(tier_index: usize, exceedances: usize, day_index: usize) -> Observation {
        Observation { tier_index, exceedances, day_index }
    }

    #[test]
    fn discrete_gathers_row_major() {
        let values: Vec<f64> = (0..24).map(f64::from).collect();
        let dist = DiscreteDistribution::new([2, 3, 4], values).unwrap();

        assert_eq!(dist.ravel_index([0, 0, 0]).unwrap(), 0);
        assert_eq!(dist.ravel_index([1, 2, 3]).unwrap(), 23);
        assert_eq!(dist.ravel_index([1, 0, 2]).unwrap(), 14);

        let actions = dist.get_action(&[obs(0, 2, 1), obs(1, 1, 0)]).unwrap();
        assert_eq!(actions, vec![9.0, 16.0]);
    }

    #[test]
    fn discrete_rejects_out_of_range_observation() {
        let dist = DiscreteDistribution::filled([8, 12, 250], 1.0).unwrap();
        let err = dist.get_action(&[obs(8, 0, 0)]).unwrap_err();
        assert!(matches!(err, SimError::IndexOutOfBounds { index: 8, len: 8, .. }));
    }

    #[test]
    fn discrete_rejects_empty_or_mismatched_table() {
        assert!(matches!(
            DiscreteDistribution::new([1, 1, 1], vec![]),
            Err(SimError::NullInput(_))
        ));
        assert!(matches!(
            DiscreteDistribution::new([2, 2, 2], vec![0.0; 7]),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn continuous_requires_function() {
        assert!(matches!(
            ContinuousDistribution::from_option(None),
            Err(SimError::NullInput(_))
        ));
    }

    #[test]
    fn continuous_is_deterministic() {
        let dist = ContinuousDistribution::new(|o| 0.5 + 0.1 * o.exceedances as f64);
        let batch = [obs(0, 0, 3), obs(2, 4, 10)];
        let first = dist.get_action(&batch).unwrap();
        let second = dist.get_action(&batch).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], 0.5);
    }
}
