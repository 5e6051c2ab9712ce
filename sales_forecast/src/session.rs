//! Forecasting session
//!
//! A [`ForecastSession`] runs the whole pipeline once (load, aggregate, build
//! features, train) and then answers prediction, scenario and evaluation
//! requests against that fixed state. Nothing is global: two sessions over
//! different data never share anything.

use crate::aggregate::{AggregationReport, MonthlyAggregator, MonthlyPanel};
use crate::analytics::{self, DatasetSummary};
use crate::calendar::SeasonCalendar;
use crate::config::PipelineConfig;
use crate::data::{DataLoader, JoinReport, MergedTable, RawTables};
use crate::error::{ForecastError, Result};
use crate::export::PredictionTable;
use crate::features::{FeatureBuilder, FeatureColumn, FeaturePanel, DEFAULT_FEATURES};
use crate::metrics::{evaluate, RegressionMetrics};
use crate::models::{FeatureImportance, FittedRegressor, ForecastModel, PredictionResult};
use crate::scenario::{ScenarioEvaluator, ScenarioInput, ScenarioOutcome};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Overview of a built session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub dataset: DatasetSummary,
    pub join: JoinReport,
    pub aggregation: AggregationReport,
    pub panel_rows: usize,
    pub training_rows: usize,
    pub feature_columns: Vec<FeatureColumn>,
    pub model: String,
}

/// Loaded data plus the model trained on it
#[derive(Debug, Clone)]
pub struct ForecastSession {
    config: PipelineConfig,
    merged: MergedTable,
    monthly: MonthlyPanel,
    panel: FeaturePanel,
    model: ForecastModel,
}

impl ForecastSession {
    /// Build a session from the three CSV files
    pub fn from_csv<P: AsRef<Path>>(
        transactions: P,
        products: P,
        shops: P,
        config: PipelineConfig,
    ) -> Result<Self> {
        let merged = DataLoader::from_csv(transactions, products, shops)?;
        Self::from_merged(merged, config)
    }

    /// Build a session from tables already in memory
    pub fn from_tables(tables: RawTables, config: PipelineConfig) -> Result<Self> {
        Self::from_merged(DataLoader::merge(tables)?, config)
    }

    pub fn from_merged(merged: MergedTable, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let monthly = MonthlyAggregator::aggregate(&merged);
        let builder = FeatureBuilder::new(SeasonCalendar::from_config(&config.calendar));
        let panel = builder.build(&monthly)?;
        let model = ForecastModel::train(&panel, &DEFAULT_FEATURES, &config.forest)?;

        info!(
            transactions = merged.len(),
            panel_rows = panel.len(),
            training_rows = model.training_rows(),
            "forecast session ready"
        );

        Ok(Self {
            config,
            merged,
            monthly,
            panel,
            model,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn merged(&self) -> &MergedTable {
        &self.merged
    }

    pub fn monthly(&self) -> &MonthlyPanel {
        &self.monthly
    }

    pub fn panel(&self) -> &FeaturePanel {
        &self.panel
    }

    pub fn model(&self) -> &ForecastModel {
        &self.model
    }

    pub fn feature_columns(&self) -> &[FeatureColumn] {
        self.model.feature_columns()
    }

    /// Next-month prediction for a (product, shop) pair
    pub fn predict_next(&self, product_id: &str, shop_id: &str) -> Result<PredictionResult> {
        self.model.predict_next(&self.panel, product_id, shop_id)
    }

    /// Run a scenario on the latest month of a (product, shop) pair
    ///
    /// Returns `None` when the pair has no history.
    pub fn simulate(
        &self,
        product_id: &str,
        shop_id: &str,
        input: &ScenarioInput,
    ) -> Result<Option<ScenarioOutcome>> {
        let Some(base_row) = self.panel.latest_row(product_id, shop_id) else {
            return Ok(None);
        };
        let evaluator = ScenarioEvaluator::from_config(&self.config.scenario);
        evaluator.simulate(&self.model, base_row, input).map(Some)
    }

    /// Actual and predicted quantity for every training row
    pub fn bulk_predictions(&self) -> Result<PredictionTable> {
        PredictionTable::from_model(&self.model, &self.panel)
    }

    /// Metrics of the trained model on its own training rows
    pub fn in_sample_metrics(&self) -> Result<RegressionMetrics> {
        let table = self.bulk_predictions()?;
        evaluate(&table.actuals(), &table.predictions())
    }

    /// Retrain on all but the most recent months and score the held-out part
    pub fn holdout_metrics(&self) -> Result<RegressionMetrics> {
        let (train, test) = self
            .panel
            .split_holdout(self.config.evaluation.holdout_months)?;

        let model = ForecastModel::train(&train, self.model.feature_columns(), &self.config.forest)?;
        let table = PredictionTable::from_model(&model, &test)?;
        if table.is_empty() {
            return Err(ForecastError::InsufficientData(
                "Holdout months contain no rows with complete lags".to_string(),
            ));
        }

        info!(
            train_rows = model.training_rows(),
            holdout_rows = table.len(),
            "holdout evaluation"
        );
        evaluate(&table.actuals(), &table.predictions())
    }

    /// Importances from most to least important
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        self.model.ranked_importances()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            dataset: analytics::dataset_summary(&self.merged),
            join: self.merged.join_report(),
            aggregation: self.monthly.report(),
            panel_rows: self.panel.len(),
            training_rows: self.model.training_rows(),
            feature_columns: self.model.feature_columns().to_vec(),
            model: self.model.regressor().name().to_string(),
        }
    }
}
