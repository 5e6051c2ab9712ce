//! What-if scenario simulation
//!
//! A scenario rewrites three parts of a row's feature vector and compares the
//! model's output before and after:
//!
//! - `price_difference` through a [`PricePolicy`]
//! - `last_month_qty` through a [`MarketingPolicy`]
//! - the holiday/summer flags through the chosen [`Season`]
//!
//! Both predictions go through the same model with the same column ordering,
//! so the difference is attributable to the perturbations alone.

use crate::config::ScenarioConfig;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureColumn, FeatureRow, FeatureVector};
use crate::models::{FittedRegressor, ForecastModel};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Season override for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Season {
    #[default]
    Normal,
    Holiday,
    Summer,
    Winter,
}

impl Season {
    /// Season implied by a row's calendar flags
    pub fn from_flags(is_holiday_month: bool, is_summer: bool) -> Self {
        match (is_holiday_month, is_summer) {
            (true, false) => Season::Holiday,
            (false, true) => Season::Summer,
            _ => Season::Normal,
        }
    }

    /// The (is_holiday_month, is_summer) pair this season writes
    pub fn flags(&self) -> (f64, f64) {
        match self {
            Season::Holiday => (1.0, 0.0),
            Season::Summer => (0.0, 1.0),
            Season::Normal | Season::Winter => (0.0, 0.0),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Normal => "Normal",
            Season::Holiday => "Holiday",
            Season::Summer => "Summer",
            Season::Winter => "Winter",
        };
        f.write_str(name)
    }
}

impl FromStr for Season {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Season::Normal),
            "holiday" => Ok(Season::Holiday),
            "summer" => Ok(Season::Summer),
            "winter" => Ok(Season::Winter),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown season {:?}",
                other
            ))),
        }
    }
}

/// Perturbations applied to a base row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    /// Price change in percent, e.g. -10 for a 10% cut
    pub price_change_pct: f64,
    /// Relative marketing investment, 0 meaning none
    pub marketing_boost: f64,
    pub season: Season,
}

impl ScenarioInput {
    pub fn new(price_change_pct: f64, marketing_boost: f64, season: Season) -> Self {
        Self {
            price_change_pct,
            marketing_boost,
            season,
        }
    }

    /// Input that leaves the row's features unchanged
    pub fn neutral_for(row: &FeatureRow) -> Self {
        Self::new(
            0.0,
            0.0,
            Season::from_flags(row.is_holiday_month, row.is_summer),
        )
    }
}

/// Baseline and counterfactual predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub baseline_prediction: f64,
    pub scenario_prediction: f64,
}

impl ScenarioOutcome {
    /// Scenario minus baseline
    pub fn delta(&self) -> f64 {
        self.scenario_prediction - self.baseline_prediction
    }
}

/// How a price change moves the `price_difference` feature
pub trait PricePolicy: Debug {
    fn adjust_price_difference(&self, price_difference: f64, price_change_pct: f64) -> f64;
}

/// How marketing spend moves the `last_month_qty` feature
pub trait MarketingPolicy: Debug {
    fn adjust_last_month_qty(&self, last_month_qty: f64, marketing_boost: f64) -> f64;
}

/// Scales the price difference by the price change
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProportionalPrice;

impl PricePolicy for ProportionalPrice {
    fn adjust_price_difference(&self, price_difference: f64, price_change_pct: f64) -> f64 {
        price_difference * (1.0 + price_change_pct / 100.0)
    }
}

/// Lifts last month's quantity linearly with the boost
///
/// With the default sensitivity of 0.2 a boost of 100 adds 20%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMarketing {
    pub sensitivity: f64,
}

impl Default for LinearMarketing {
    fn default() -> Self {
        Self::from_config(&ScenarioConfig::default())
    }
}

impl LinearMarketing {
    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self {
            sensitivity: config.marketing_sensitivity,
        }
    }
}

impl MarketingPolicy for LinearMarketing {
    fn adjust_last_month_qty(&self, last_month_qty: f64, marketing_boost: f64) -> f64 {
        last_month_qty * (1.0 + self.sensitivity * marketing_boost / 100.0)
    }
}

/// Runs scenarios with a fixed pair of policies
#[derive(Debug, Clone, Default)]
pub struct ScenarioEvaluator<P = ProportionalPrice, M = LinearMarketing> {
    price_policy: P,
    marketing_policy: M,
}

impl ScenarioEvaluator {
    /// Evaluator with the default price and marketing policies
    pub fn new() -> Self {
        Self::from_config(&ScenarioConfig::default())
    }

    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self {
            price_policy: ProportionalPrice,
            marketing_policy: LinearMarketing::from_config(config),
        }
    }
}

impl<P: PricePolicy, M: MarketingPolicy> ScenarioEvaluator<P, M> {
    pub fn with_policies(price_policy: P, marketing_policy: M) -> Self {
        Self {
            price_policy,
            marketing_policy,
        }
    }

    /// Apply the perturbations to a copy of `base`
    ///
    /// Columns the vector does not carry are left alone.
    pub fn scenario_vector(&self, base: &FeatureVector, input: &ScenarioInput) -> FeatureVector {
        let mut vector = base.clone();

        if let Some(price_difference) = vector.get(FeatureColumn::PriceDifference) {
            let adjusted = self
                .price_policy
                .adjust_price_difference(price_difference, input.price_change_pct);
            vector.set(FeatureColumn::PriceDifference, adjusted);
        }

        if let Some(last_month_qty) = vector.get(FeatureColumn::LastMonthQty) {
            let adjusted = self
                .marketing_policy
                .adjust_last_month_qty(last_month_qty, input.marketing_boost);
            vector.set(FeatureColumn::LastMonthQty, adjusted);
        }

        let (holiday, summer) = input.season.flags();
        vector.set(FeatureColumn::IsHolidayMonth, holiday);
        vector.set(FeatureColumn::IsSummer, summer);

        vector
    }

    /// Predict the base row as-is and under the scenario
    pub fn simulate<F: FittedRegressor>(
        &self,
        model: &ForecastModel<F>,
        base_row: &FeatureRow,
        input: &ScenarioInput,
    ) -> Result<ScenarioOutcome> {
        let base = base_row.vector_with_defaults(model.feature_columns());
        let modified = self.scenario_vector(&base, input);

        Ok(ScenarioOutcome {
            baseline_prediction: model.predict(&base)?,
            scenario_prediction: model.predict(&modified)?,
        })
    }
}

/// Simulate a scenario with the default policies
pub fn simulate<F: FittedRegressor>(
    model: &ForecastModel<F>,
    base_row: &FeatureRow,
    price_change_pct: f64,
    marketing_boost: f64,
    season: Season,
) -> Result<ScenarioOutcome> {
    ScenarioEvaluator::new().simulate(
        model,
        base_row,
        &ScenarioInput::new(price_change_pct, marketing_boost, season),
    )
}
