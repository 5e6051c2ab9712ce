mod common;

use pretty_assertions::assert_eq;
use sales_forecast::config::PipelineConfig;
use sales_forecast::error::ForecastError;
use sales_forecast::scenario::{ScenarioInput, Season};
use sales_forecast::{ForecastSession, PredictionStatus};
use tempfile::tempdir;

#[test]
fn test_full_pipeline_from_csv() {
    let dir = tempdir().unwrap();
    let (transactions, products, shops) = common::write_sample_csvs(dir.path());

    let session = ForecastSession::from_csv(&transactions, &products, &shops, common::test_config())
        .unwrap();

    let summary = session.summary();
    assert_eq!(summary.dataset.transactions, 96);
    assert!(summary.join.is_clean());
    assert_eq!(summary.aggregation.panel_rows, 48);
    assert_eq!(summary.panel_rows, 48);
    assert_eq!(summary.training_rows, 36);
    assert_eq!(summary.feature_columns.len(), 10);
    assert!(summary.model.contains("Random Forest"));

    let prediction = session.predict_next("P2", "S1").unwrap();
    assert_eq!(prediction.status, PredictionStatus::Success);
    assert!(prediction.predicted_quantity.unwrap() > 0.0);

    let missing = session.predict_next("P2", "S2").unwrap();
    assert_eq!(missing.status, PredictionStatus::NoData);
}

#[test]
fn test_in_sample_and_holdout_metrics() {
    let session = ForecastSession::from_tables(common::sample_tables(), common::test_config()).unwrap();

    let in_sample = session.in_sample_metrics().unwrap();
    assert!(in_sample.mae >= 0.0);
    assert!(in_sample.rmse >= in_sample.mae);
    assert!(in_sample.r2 > 0.5);
    assert!(in_sample.mape.is_some());

    let holdout = session.holdout_metrics().unwrap();
    assert!(holdout.mae.is_finite());
    assert!(holdout.rmse >= holdout.mae);
}

#[test]
fn test_holdout_needs_enough_months() {
    let mut config = common::test_config();
    config.evaluation.holdout_months = 12;
    let session = ForecastSession::from_tables(common::sample_tables(), config).unwrap();

    assert!(matches!(
        session.holdout_metrics(),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_ranked_importances_from_session() {
    let session = ForecastSession::from_tables(common::sample_tables(), common::test_config()).unwrap();

    let importances = session.feature_importances();
    assert_eq!(importances.len(), 10);
    assert!(importances.windows(2).all(|w| w[0].importance >= w[1].importance));
}

#[test]
fn test_sessions_are_reproducible() {
    let a = ForecastSession::from_tables(common::sample_tables(), common::test_config()).unwrap();
    let b = ForecastSession::from_tables(common::sample_tables(), common::test_config()).unwrap();

    let input = ScenarioInput::new(-15.0, 40.0, Season::Holiday);
    assert_eq!(
        a.simulate("P1", "S1", &input).unwrap(),
        b.simulate("P1", "S1", &input).unwrap()
    );
    assert_eq!(a.bulk_predictions().unwrap(), b.bulk_predictions().unwrap());
}

#[test]
fn test_invalid_config_aborts_session() {
    let mut config = PipelineConfig::default();
    config.calendar.summer_months = vec![0];

    let result = ForecastSession::from_tables(common::sample_tables(), config);
    assert!(matches!(result, Err(ForecastError::Config(_))));
}
