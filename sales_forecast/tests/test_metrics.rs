use assert_approx_eq::assert_approx_eq;
use rstest::rstest;
use sales_forecast::error::ForecastError;
use sales_forecast::metrics::{
    evaluate, mean_absolute_error, mean_absolute_percentage_error, r2_score,
    root_mean_squared_error,
};

#[test]
fn test_perfect_predictions() {
    let y = [10.0, 20.0, 30.0];

    let metrics = evaluate(&y, &y).unwrap();

    assert_eq!(metrics.mae, 0.0);
    assert_eq!(metrics.rmse, 0.0);
    assert_eq!(metrics.r2, 1.0);
    assert_eq!(metrics.mape, Some(0.0));
}

#[test]
fn test_error_metrics() {
    let y_true = [3.0, -0.5, 2.0, 7.0];
    let y_pred = [2.5, 0.0, 2.0, 8.0];

    assert_approx_eq!(mean_absolute_error(&y_true, &y_pred).unwrap(), 0.5);
    assert_approx_eq!(root_mean_squared_error(&y_true, &y_pred).unwrap(), 0.375f64.sqrt());
    assert_approx_eq!(r2_score(&y_true, &y_pred).unwrap(), 0.9486, 1e-4);
}

#[test]
fn test_mape_in_percent() {
    let mape = mean_absolute_percentage_error(&[100.0, 200.0], &[110.0, 180.0]).unwrap();
    assert_approx_eq!(mape, 10.0);
}

#[test]
fn test_mape_with_zero_actual() {
    let result = mean_absolute_percentage_error(&[0.0, 5.0], &[1.0, 5.0]);
    assert!(matches!(result, Err(ForecastError::DivisionByZero(_))));

    let metrics = evaluate(&[0.0, 5.0], &[1.0, 5.0]).unwrap();
    assert_eq!(metrics.mape, None);
    assert!(metrics.mae.is_finite());
    assert!(metrics.r2.is_finite());
}

#[rstest]
#[case(&[1.0, 2.0], &[1.0])]
#[case(&[], &[])]
fn test_invalid_lengths(#[case] y_true: &[f64], #[case] y_pred: &[f64]) {
    assert!(matches!(
        evaluate(y_true, y_pred),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(mean_absolute_error(y_true, y_pred).is_err());
}

#[test]
fn test_metrics_display_and_map() {
    let metrics = evaluate(&[1.0, 2.0, 4.0], &[1.0, 3.0, 4.0]).unwrap();

    let text = metrics.to_string();
    assert!(text.contains("MAE"));
    assert!(text.contains("MAPE"));

    let map = metrics.as_map();
    assert_eq!(map.len(), 4);
    assert_approx_eq!(map["mae"], 1.0 / 3.0);
}
