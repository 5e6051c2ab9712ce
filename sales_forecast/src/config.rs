//! Pipeline configuration
//!
//! Every tunable constant of the pipeline lives here so that calibration does
//! not require touching prediction code. Values can be loaded from a TOML file;
//! anything left out falls back to the defaults.
//!
//! ```toml
//! [calendar]
//! holiday_months = [11, 12]
//! summer_months = [6, 7, 8]
//!
//! [forest]
//! n_trees = 100
//! seed = 42
//! ```

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one forecasting session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub calendar: CalendarConfig,
    pub forest: ForestConfig,
    pub scenario: ScenarioConfig,
    pub analytics: AnalyticsConfig,
    pub evaluation: EvaluationConfig,
}

/// Month sets behind the calendar flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub holiday_months: Vec<u32>,
    pub summer_months: Vec<u32>,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth, unlimited when absent
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node
    pub min_samples_split: usize,
    /// Minimum number of samples in each leaf
    pub min_samples_leaf: usize,
    /// Fraction of features considered at each split, in (0, 1]
    pub max_features: f64,
    /// Draw a bootstrap sample for every tree
    pub bootstrap: bool,
    /// Seed for bootstrap and feature sampling
    pub seed: u64,
}

/// What-if simulation constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Share of the marketing boost passed through to last month's quantity
    pub marketing_sensitivity: f64,
}

/// Constants for the read-only analytics views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Assumed % change in sales per % change in price
    pub price_elasticity: f64,
    /// Number of entries in benchmarking rankings
    pub top_n: usize,
}

/// Holdout evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Number of most recent months held out from training
    pub holdout_months: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            holiday_months: vec![11, 12],
            summer_months: vec![6, 7, 8],
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1.0,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            marketing_sensitivity: 0.2,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            price_elasticity: -0.5,
            top_n: 5,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { holdout_months: 2 }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file and validate it
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        for month in self
            .calendar
            .holiday_months
            .iter()
            .chain(&self.calendar.summer_months)
        {
            if !(1..=12).contains(month) {
                return Err(ForecastError::Config(format!(
                    "Month {} is outside 1..=12",
                    month
                )));
            }
        }

        // A month can carry at most one season flag
        if let Some(month) = self
            .calendar
            .holiday_months
            .iter()
            .find(|m| self.calendar.summer_months.contains(m))
        {
            return Err(ForecastError::Config(format!(
                "Month {} is both a holiday and a summer month",
                month
            )));
        }

        self.forest.validate()?;

        if !self.scenario.marketing_sensitivity.is_finite() {
            return Err(ForecastError::Config(
                "Marketing sensitivity must be finite".to_string(),
            ));
        }
        if !self.analytics.price_elasticity.is_finite() {
            return Err(ForecastError::Config(
                "Price elasticity must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(ForecastError::Config(
                "Forest needs at least one tree".to_string(),
            ));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(ForecastError::Config(format!(
                "max_features must be in (0, 1], got {}",
                self.max_features
            )));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::Config(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::Config(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ForecastError::Config(
                "max_depth must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
