//! Forecasting models for the monthly panel
//!
//! A [`Regressor`] is an untrained configuration; fitting it yields a
//! [`FittedRegressor`]. [`ForecastModel`] pairs a fitted regressor with the
//! feature ordering it was trained on and validates every prediction request
//! against that ordering.

use crate::calendar::YearMonth;
use crate::config::ForestConfig;
use crate::error::{ForecastError, Result};
use crate::features::{column_list, FeatureColumn, FeatureMatrix, FeaturePanel, FeatureVector};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use tracing::info;

pub mod forest;
pub mod tree;

pub use forest::{RandomForest, TrainedForest};

/// Relative width of the band reported around a next-month prediction
pub const PREDICTION_BAND: f64 = 0.1;

/// Regression model that can be trained on a feature matrix
pub trait Regressor: Debug + Clone {
    /// The type of trained model produced
    type Fitted: FittedRegressor;

    /// Fit the model to rows `x` and targets `y`
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Trained regression model
pub trait FittedRegressor: Debug {
    /// Predict one row whose values follow the training column order
    fn predict_row(&self, row: &[f64]) -> f64;

    /// Non-negative importance per training column
    fn feature_importances(&self) -> Vec<f64>;

    /// Number of columns the model was trained on
    fn n_features(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Outcome of a next-month lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    Success,
    /// The (product, shop) pair is absent from the panel
    NoData,
}

/// Next-month prediction for one (product, shop) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub product_id: String,
    pub shop_id: String,
    /// Month the prediction is for
    pub target_month: Option<YearMonth>,
    pub predicted_quantity: Option<f64>,
    /// Lower and upper bound of the reporting band
    pub band: Option<(f64, f64)>,
    pub status: PredictionStatus,
}

impl PredictionResult {
    fn no_data(product_id: &str, shop_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            shop_id: shop_id.to_string(),
            target_month: None,
            predicted_quantity: None,
            band: None,
            status: PredictionStatus::NoData,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PredictionStatus::Success
    }
}

/// Importance score of one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: FeatureColumn,
    pub importance: f64,
}

/// A trained regressor bound to its feature ordering
#[derive(Debug, Clone)]
pub struct ForecastModel<F = TrainedForest> {
    regressor: F,
    feature_columns: Vec<FeatureColumn>,
    training_rows: usize,
}

impl ForecastModel<TrainedForest> {
    /// Train a random forest on the panel's training view
    pub fn train(
        panel: &FeaturePanel,
        feature_columns: &[FeatureColumn],
        config: &ForestConfig,
    ) -> Result<Self> {
        let forest = RandomForest::new(config.clone())?;
        Self::train_with(&forest, panel, feature_columns)
    }
}

impl<F: FittedRegressor> ForecastModel<F> {
    /// Train any regressor on the panel's training view
    pub fn train_with<R>(
        regressor: &R,
        panel: &FeaturePanel,
        feature_columns: &[FeatureColumn],
    ) -> Result<Self>
    where
        R: Regressor<Fitted = F>,
    {
        if feature_columns.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one feature column is required".to_string(),
            ));
        }
        let distinct: HashSet<&FeatureColumn> = feature_columns.iter().collect();
        if distinct.len() != feature_columns.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Duplicate feature columns in {}",
                column_list(feature_columns)
            )));
        }

        let (matrix, targets) = panel.training_matrix(feature_columns)?;
        if matrix.is_empty() {
            return Err(ForecastError::InsufficientData(format!(
                "No training rows: every one of the {} panel rows lacks a lag feature",
                panel.len()
            )));
        }

        let fitted = regressor.fit(matrix.rows(), &targets)?;
        info!(
            model = regressor.name(),
            training_rows = matrix.len(),
            features = feature_columns.len(),
            "trained forecast model"
        );

        Ok(Self {
            regressor: fitted,
            feature_columns: feature_columns.to_vec(),
            training_rows: matrix.len(),
        })
    }

    /// Column ordering the model was trained with
    pub fn feature_columns(&self) -> &[FeatureColumn] {
        &self.feature_columns
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    pub fn regressor(&self) -> &F {
        &self.regressor
    }

    /// Predict a single feature vector
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64> {
        self.check_columns(vector.columns())?;
        check_finite(vector.values(), 0)?;
        Ok(self.regressor.predict_row(vector.values()))
    }

    /// Predict every row of a feature matrix
    pub fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_columns(matrix.columns())?;
        for (index, row) in matrix.rows().iter().enumerate() {
            check_finite(row, index)?;
        }

        Ok(matrix
            .rows()
            .iter()
            .map(|row| self.regressor.predict_row(row))
            .collect())
    }

    /// Predict every row of a panel, undefined features defaulted
    pub fn predict_panel(&self, panel: &FeaturePanel) -> Result<Vec<f64>> {
        self.predict_batch(&panel.matrix(&self.feature_columns))
    }

    /// Importance per feature, in training column order
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        self.feature_columns
            .iter()
            .zip(self.regressor.feature_importances())
            .map(|(&feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect()
    }

    /// Importances sorted from most to least important
    pub fn ranked_importances(&self) -> Vec<FeatureImportance> {
        let mut ranked = self.feature_importances();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked
    }

    /// Predict the month after the latest observation of a (product, shop) pair
    ///
    /// An absent pair is a normal outcome and yields `PredictionStatus::NoData`.
    pub fn predict_next(
        &self,
        panel: &FeaturePanel,
        product_id: &str,
        shop_id: &str,
    ) -> Result<PredictionResult> {
        let Some(latest) = panel.latest_row(product_id, shop_id) else {
            return Ok(PredictionResult::no_data(product_id, shop_id));
        };

        let vector = latest.vector_with_defaults(&self.feature_columns);
        let prediction = round_to(self.predict(&vector)?, 2);

        Ok(PredictionResult {
            product_id: product_id.to_string(),
            shop_id: shop_id.to_string(),
            target_month: Some(latest.year_month().next()),
            predicted_quantity: Some(prediction),
            band: Some((
                prediction * (1.0 - PREDICTION_BAND),
                prediction * (1.0 + PREDICTION_BAND),
            )),
            status: PredictionStatus::Success,
        })
    }

    fn check_columns(&self, columns: &[FeatureColumn]) -> Result<()> {
        if columns != self.feature_columns.as_slice() {
            return Err(ForecastError::FeatureMismatch(format!(
                "model expects {} but input has {}",
                column_list(&self.feature_columns),
                column_list(columns)
            )));
        }
        if columns.len() != self.regressor.n_features() {
            return Err(ForecastError::FeatureMismatch(format!(
                "regressor was fitted on {} features, input has {}",
                self.regressor.n_features(),
                columns.len()
            )));
        }
        Ok(())
    }
}

fn check_finite(values: &[f64], row: usize) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(col) => Err(ForecastError::FeatureMismatch(format!(
            "non-numeric value {} at row {}, column {}",
            values[col], row, col
        ))),
        None => Ok(()),
    }
}
