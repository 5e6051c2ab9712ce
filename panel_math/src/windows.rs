//! Window calculations over a single ordered series
//!
//! Contains the stateful accumulators the feature builder walks along each
//! (product, shop) series:
//! - Lag window (the last N observations, most recent first)
//! - Expanding mean (mean of everything seen so far)

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Fixed-depth window of previous observations
///
/// After pushing `a, b, c` into a window of depth 3, `lag(1)` is `c`,
/// `lag(2)` is `b` and `lag(3)` is `a`.
#[derive(Debug, Clone)]
pub struct LagWindow {
    depth: usize,
    values: VecDeque<f64>,
}

impl LagWindow {
    /// Create a new lag window remembering `depth` observations
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(MathError::InvalidInput(
                "Lag depth must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            depth,
            values: VecDeque::with_capacity(depth),
        })
    }

    /// Record a new observation, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        self.values.push_front(value);
        if self.values.len() > self.depth {
            self.values.pop_back();
        }
    }

    /// Value observed `k` steps ago, if the window has seen that far back
    pub fn lag(&self, k: usize) -> Option<f64> {
        if k == 0 {
            return None;
        }
        self.values.get(k - 1).copied()
    }

    /// All lags from 1 up to the window depth
    pub fn lags(&self) -> Vec<Option<f64>> {
        (1..=self.depth).map(|k| self.lag(k)).collect()
    }

    /// Mean of the lags that are available
    pub fn mean_available(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// True once every lag up to the depth is defined
    pub fn is_full(&self) -> bool {
        self.values.len() == self.depth
    }

    /// Get the window depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Clear all observations, e.g. when a new series starts
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Running mean over every value seen so far
#[derive(Debug, Clone, Default)]
pub struct ExpandingMean {
    sum: f64,
    count: usize,
}

impl ExpandingMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the mean with a new value
    pub fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Get the current mean
    pub fn value(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(MathError::InsufficientData(
                "Expanding mean has not seen any values".to_string(),
            ));
        }

        Ok(self.sum / self.count as f64)
    }

    /// Number of values seen
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}
