//! Trailing disclosure window.
//!
//! A per-path circular buffer of the most recent reported VaR values.
//! It is not reset at year boundaries: the first days of a year still
//! average over the tail of the previous one.

use crate::error::{SimError, SimResult};

/// Backtesting window length in trading days.
pub const DISCLOSURE_WINDOW: usize = 60;

#[derive(Debug, Clone)]
pub struct DisclosureWindow {
    capacity: usize,
    paths:    usize,
    /// `capacity` slots of `paths` values each.
    slots:    Vec<f64>,
    next:     usize,
    len:      usize,
}

impl DisclosureWindow {
    pub fn new(paths: usize) -> Self {
        Self::with_capacity(DISCLOSURE_WINDOW, paths)
    }

    pub fn with_capacity(capacity: usize, paths: usize) -> Self {
        assert!(capacity > 0, "window capacity must be > 0");
        Self {
            capacity,
            paths,
            slots: vec![0.0; capacity * paths],
            next:  0,
            len:   0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Filled slots, at most `capacity`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Overwrite the oldest slot with one day's values.
    pub fn push(&mut self, values: &[f64]) -> SimResult<()> {
        if values.len() != self.paths {
            return Err(SimError::Configuration(format!(
                "disclosure batch has {} values, window tracks {} paths",
                values.len(),
                self.paths
            )));
        }
        let start = self.next * self.paths;
        self.slots[start..start + self.paths].copy_from_slice(values);
        self.next = (self.next + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
        Ok(())
    }

    /// Per-path mean over the filled slots; zeros while empty.
    pub fn mean(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.paths];
        if self.len == 0 {
            return sums;
        }
        for slot in self.filled_slots() {
            let start = slot * self.paths;
            for (sum, v) in sums.iter_mut().zip(&self.slots[start..start + self.paths]) {
                *sum += v;
            }
        }
        let n = self.len as f64;
        sums.iter_mut().for_each(|s| *s /= n);
        sums
    }

    /// One path's values, oldest first.
    pub fn history(&self, path: usize) -> Vec<f64> {
        self.filled_slots()
            .map(|slot| self.slots[slot * self.paths + path])
            .collect()
    }

    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.next = 0;
        self.len = 0;
    }

    fn filled_slots(&self) -> impl Iterator<Item = usize> + '_ {
        let oldest = (self.next + self.capacity - self.len) % self.capacity;
        (0..self.len).map(move |i| (oldest + i) % self.capacity)
    }
}
