//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Regression quality of a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Mean Absolute Percentage Error, in percent
    ///
    /// `None` when any actual value is zero.
    pub mape: Option<f64>,
}

impl RegressionMetrics {
    /// Metrics keyed by name; an undefined MAPE is left out
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        let mut map = BTreeMap::new();
        map.insert("mae", self.mae);
        map.insert("rmse", self.rmse);
        map.insert("r2", self.r2);
        if let Some(mape) = self.mape {
            map.insert("mape", mape);
        }
        map
    }
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Performance Metrics:")?;
        writeln!(f, "  MAE:     {:.4}", self.mae)?;
        writeln!(f, "  RMSE:    {:.4}", self.rmse)?;
        writeln!(f, "  R2:      {:.4}", self.r2)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE:    {:.4}%", mape)?,
            None => writeln!(f, "  MAPE:    undefined (zero actuals)")?,
        }
        Ok(())
    }
}

/// Compute every metric for a pair of equally long series
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    check_lengths(y_true, y_pred)?;

    let mape = match mean_absolute_percentage_error(y_true, y_pred) {
        Ok(mape) => Some(mape),
        Err(ForecastError::DivisionByZero(_)) => None,
        Err(e) => return Err(e),
    };

    Ok(RegressionMetrics {
        mae: mean_absolute_error(y_true, y_pred)?,
        rmse: root_mean_squared_error(y_true, y_pred)?,
        r2: r2_score(y_true, y_pred)?,
        mape,
    })
}

/// Mean of |y_true - y_pred|
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    Ok(y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .mean())
}

/// Square root of the mean squared error
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .mean();
    Ok(mse.sqrt())
}

/// 1 - SS_res / SS_tot
///
/// A constant `y_true` has no variance to explain: a perfect fit scores 1.0
/// and anything else 0.0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let mean = y_true.iter().mean();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Mean of |(y_true - y_pred) / y_true| in percent
pub fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    if let Some(index) = y_true.iter().position(|&t| t == 0.0) {
        return Err(ForecastError::DivisionByZero(format!(
            "MAPE is undefined: actual value at index {} is zero",
            index
        )));
    }

    let mape = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| ((t - p) / t).abs())
        .mean();
    Ok(mape * 100.0)
}

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() || y_true.is_empty() {
        return Err(ForecastError::InvalidParameter(format!(
            "Actual and predicted values must have the same non-zero length (got {} and {})",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}
