mod common;

use rstest::rstest;
use sales_forecast::aggregate::MonthlyAggregator;
use sales_forecast::calendar::YearMonth;
use sales_forecast::config::ForestConfig;
use sales_forecast::data::DataLoader;
use sales_forecast::error::ForecastError;
use sales_forecast::features::{FeatureBuilder, FeatureColumn, FeaturePanel, FeatureVector, DEFAULT_FEATURES};
use sales_forecast::models::{FittedRegressor, ForecastModel, PredictionStatus, RandomForest, Regressor};

fn sample_panel() -> FeaturePanel {
    let merged = DataLoader::merge(common::sample_tables()).unwrap();
    FeatureBuilder::default()
        .build(&MonthlyAggregator::aggregate(&merged))
        .unwrap()
}

fn trained_model(panel: &FeaturePanel) -> ForecastModel {
    ForecastModel::train(panel, &DEFAULT_FEATURES, &common::test_config().forest).unwrap()
}

#[test]
fn test_batch_prediction_matches_single_rows() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let (matrix, _) = panel.training_matrix(model.feature_columns()).unwrap();
    let batch = model.predict_batch(&matrix).unwrap();

    assert_eq!(batch.len(), matrix.len());
    for (i, predicted) in batch.iter().enumerate() {
        let single = model.predict(&matrix.row_vector(i).unwrap()).unwrap();
        assert_eq!(*predicted, single);
    }
}

#[test]
fn test_training_is_deterministic_for_a_seed() {
    let panel = sample_panel();
    let first = trained_model(&panel);
    let second = trained_model(&panel);

    assert_eq!(first.predict_panel(&panel).unwrap(), second.predict_panel(&panel).unwrap());
    assert_eq!(first.feature_importances(), second.feature_importances());
}

#[test]
fn test_fit_follows_training_targets() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let (matrix, targets) = panel.training_matrix(model.feature_columns()).unwrap();
    let predictions = model.predict_batch(&matrix).unwrap();
    let mae: f64 = targets
        .iter()
        .zip(&predictions)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / targets.len() as f64;

    assert!(mae < 10.0, "in-sample MAE too large: {mae}");
}

#[test]
fn test_feature_importances() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let importances = model.feature_importances();
    assert_eq!(importances.len(), DEFAULT_FEATURES.len());
    assert!(importances.iter().all(|f| f.importance >= 0.0));
    let total: f64 = importances.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);

    let ranked = model.ranked_importances();
    assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
}

#[test]
fn test_column_mismatch_is_rejected() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let reordered = FeatureVector::new(
        vec![FeatureColumn::CityCode, FeatureColumn::LastMonthQty],
        vec![0.0, 10.0],
    )
    .unwrap();
    assert!(matches!(
        model.predict(&reordered),
        Err(ForecastError::FeatureMismatch(_))
    ));

    let mut values = vec![1.0; DEFAULT_FEATURES.len()];
    values[0] = f64::NAN;
    let non_finite = FeatureVector::new(DEFAULT_FEATURES.to_vec(), values).unwrap();
    assert!(matches!(
        model.predict(&non_finite),
        Err(ForecastError::FeatureMismatch(_))
    ));
}

#[rstest]
#[case(vec![])]
#[case(vec![FeatureColumn::Trend, FeatureColumn::Trend])]
fn test_invalid_feature_lists(#[case] columns: Vec<FeatureColumn>) {
    let panel = sample_panel();
    let result = ForecastModel::train(&panel, &columns, &ForestConfig::default());
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_invalid_forest_config() {
    let config = ForestConfig {
        n_trees: 0,
        ..ForestConfig::default()
    };
    assert!(RandomForest::new(config).is_err());
}

#[test]
fn test_training_without_complete_lags_fails() {
    let mut tables = common::sample_tables();
    tables
        .transactions
        .retain(|t| t.timestamp.starts_with("2023-01") || t.timestamp.starts_with("2023-02"));
    let merged = DataLoader::merge(tables).unwrap();
    let panel = FeatureBuilder::default()
        .build(&MonthlyAggregator::aggregate(&merged))
        .unwrap();

    let result = ForecastModel::train(&panel, &DEFAULT_FEATURES, &ForestConfig::default());
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_predict_next_for_known_pair() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let result = model.predict_next(&panel, "P1", "S1").unwrap();

    assert_eq!(result.status, PredictionStatus::Success);
    assert!(result.is_success());
    assert_eq!(result.target_month, Some(YearMonth::new(2024, 1).unwrap()));

    let quantity = result.predicted_quantity.unwrap();
    assert_eq!(quantity, (quantity * 100.0).round() / 100.0);
    let (low, high) = result.band.unwrap();
    assert!((low - quantity * 0.9).abs() < 1e-9);
    assert!((high - quantity * 1.1).abs() < 1e-9);
}

#[test]
fn test_predict_next_for_unknown_pair() {
    let panel = sample_panel();
    let model = trained_model(&panel);

    let result = model.predict_next(&panel, "P2", "S2").unwrap();

    assert_eq!(result.status, PredictionStatus::NoData);
    assert_eq!(result.predicted_quantity, None);
    assert_eq!(result.band, None);
    assert_eq!(result.target_month, None);
}

#[test]
fn test_regressor_trait_directly() {
    let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
    let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 9.0 }).collect();
    let forest = RandomForest::new(ForestConfig {
        n_trees: 10,
        bootstrap: false,
        ..ForestConfig::default()
    })
    .unwrap();

    let fitted = forest.fit(&x, &y).unwrap();

    assert_eq!(fitted.n_features(), 1);
    assert_eq!(fitted.predict_row(&[2.0]), 1.0);
    assert_eq!(fitted.predict_row(&[15.0]), 9.0);
    assert_eq!(fitted.feature_importances(), vec![1.0]);
    assert!(forest.fit(&x, &y[..5]).is_err());
}
