//! Random forest regressor

use crate::config::ForestConfig;
use crate::error::{ForecastError, Result};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{FittedRegressor, Regressor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Random forest model (untrained)
#[derive(Debug, Clone)]
pub struct RandomForest {
    /// Name of the model
    name: String,
    config: ForestConfig,
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct TrainedForest {
    /// Name of the model
    name: String,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Create a new random forest from its configuration
    pub fn new(config: ForestConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            name: format!("Random Forest (trees={}, seed={})", config.n_trees, config.seed),
            config,
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        let max_features = (self.config.max_features * n_features as f64).ceil() as usize;
        TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: max_features.clamp(1, n_features),
        }
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        let config = ForestConfig::default();
        Self {
            name: format!("Random Forest (trees={}, seed={})", config.n_trees, config.seed),
            config,
        }
    }
}

impl Regressor for RandomForest {
    type Fitted = TrainedForest;

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted> {
        if x.is_empty() {
            return Err(ForecastError::InsufficientData(
                "Random forest needs at least one training row".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }

        let n_samples = x.len();
        let n_features = x[0].len();
        let params = self.tree_params(n_features);

        // Every tree draws from its own generator seeded off the master one, so
        // the ensemble only depends on the configured seed.
        let mut master = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_trees);

        for _ in 0..self.config.n_trees {
            let mut rng = StdRng::seed_from_u64(master.gen::<u64>());
            let indices: Vec<usize> = if self.config.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            trees.push(RegressionTree::fit(x, y, indices, &params, &mut rng)?);
        }

        debug!(
            trees = trees.len(),
            samples = n_samples,
            features = n_features,
            max_features = params.max_features,
            "fitted random forest"
        );

        Ok(TrainedForest {
            name: self.name.clone(),
            trees,
            n_features,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForest {
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl FittedRegressor for TrainedForest {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (total, importance) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += importance;
            }
        }
        let n_trees = self.trees.len() as f64;
        totals.into_iter().map(|t| t / n_trees).collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &str {
        &self.name
    }
}
