mod common;

use rstest::rstest;
use sales_forecast::config::{CalendarConfig, PipelineConfig, ScenarioConfig};
use sales_forecast::features::DEFAULT_FEATURES;
use sales_forecast::scenario::{
    simulate, LinearMarketing, MarketingPolicy, PricePolicy, ProportionalPrice, ScenarioEvaluator,
    ScenarioInput, Season,
};
use sales_forecast::{ForecastError, ForecastSession};

fn session() -> ForecastSession {
    ForecastSession::from_tables(common::sample_tables(), common::test_config()).unwrap()
}

#[test]
fn test_neutral_scenario_reproduces_baseline() {
    let session = session();
    let model = session.model();

    for row in session.panel().rows() {
        let outcome = ScenarioEvaluator::new()
            .simulate(model, row, &ScenarioInput::neutral_for(row))
            .unwrap();

        assert_eq!(outcome.baseline_prediction, outcome.scenario_prediction);
        assert_eq!(outcome.delta(), 0.0);
    }
}

fn config_with_calendar(holiday_months: Vec<u32>, summer_months: Vec<u32>) -> PipelineConfig {
    PipelineConfig {
        calendar: CalendarConfig {
            holiday_months,
            summer_months,
        },
        ..common::test_config()
    }
}

#[test]
fn test_overlapping_season_months_are_rejected() {
    let config = config_with_calendar(vec![11, 12], vec![12, 1, 2]);

    let result = ForecastSession::from_tables(common::sample_tables(), config);
    assert!(matches!(result, Err(ForecastError::Config(_))));
}

#[test]
fn test_neutral_scenario_with_southern_calendar() {
    let config = config_with_calendar(vec![11], vec![12, 1, 2]);
    let session = ForecastSession::from_tables(common::sample_tables(), config).unwrap();

    for row in session.panel().rows() {
        assert!(!(row.is_holiday_month && row.is_summer));

        let base = row.vector_with_defaults(session.feature_columns());
        let neutral = ScenarioEvaluator::new()
            .scenario_vector(&base, &ScenarioInput::neutral_for(row));
        assert_eq!(base, neutral);
    }
}

#[test]
fn test_baseline_matches_model_prediction() {
    let session = session();
    let row = session.panel().latest_row("P2", "S1").unwrap();

    let outcome = simulate(session.model(), row, -20.0, 50.0, Season::Summer).unwrap();
    let direct = session
        .model()
        .predict(&row.vector_with_defaults(&DEFAULT_FEATURES))
        .unwrap();

    assert_eq!(outcome.baseline_prediction, direct);
}

#[rstest]
#[case(Season::Holiday, 1.0, 0.0)]
#[case(Season::Summer, 0.0, 1.0)]
#[case(Season::Winter, 0.0, 0.0)]
#[case(Season::Normal, 0.0, 0.0)]
fn test_season_sets_exclusive_flags(#[case] season: Season, #[case] holiday: f64, #[case] summer: f64) {
    let session = session();
    let row = session.panel().latest_row("P1", "S2").unwrap();
    let base = row.vector_with_defaults(&DEFAULT_FEATURES);

    let vector = ScenarioEvaluator::new()
        .scenario_vector(&base, &ScenarioInput::new(0.0, 0.0, season));

    use sales_forecast::features::FeatureColumn::{IsHolidayMonth, IsSummer};
    assert_eq!(vector.get(IsHolidayMonth), Some(holiday));
    assert_eq!(vector.get(IsSummer), Some(summer));
}

#[test]
fn test_configured_marketing_sensitivity() {
    let evaluator = ScenarioEvaluator::from_config(&ScenarioConfig {
        marketing_sensitivity: 0.5,
    });
    let session = session();
    let row = session.panel().latest_row("P1", "S1").unwrap();
    let base = row.vector_with_defaults(&DEFAULT_FEATURES);

    let vector = evaluator.scenario_vector(&base, &ScenarioInput::new(0.0, 100.0, Season::Normal));

    use sales_forecast::features::FeatureColumn::LastMonthQty;
    let before = base.get(LastMonthQty).unwrap();
    assert!((vector.get(LastMonthQty).unwrap() - before * 1.5).abs() < 1e-9);
}

#[derive(Debug)]
struct FlatPrice;

impl PricePolicy for FlatPrice {
    fn adjust_price_difference(&self, _price_difference: f64, price_change_pct: f64) -> f64 {
        price_change_pct
    }
}

#[derive(Debug)]
struct NoMarketing;

impl MarketingPolicy for NoMarketing {
    fn adjust_last_month_qty(&self, last_month_qty: f64, _marketing_boost: f64) -> f64 {
        last_month_qty
    }
}

#[test]
fn test_custom_policies() {
    let session = session();
    let row = session.panel().latest_row("P1", "S1").unwrap();
    let base = row.vector_with_defaults(&DEFAULT_FEATURES);

    let evaluator = ScenarioEvaluator::with_policies(FlatPrice, NoMarketing);
    let vector = evaluator.scenario_vector(&base, &ScenarioInput::new(7.0, 100.0, Season::Normal));

    use sales_forecast::features::FeatureColumn::{LastMonthQty, PriceDifference};
    assert_eq!(vector.get(PriceDifference), Some(7.0));
    assert_eq!(vector.get(LastMonthQty), base.get(LastMonthQty));

    // Default policies are still usable side by side
    assert_eq!(ProportionalPrice.adjust_price_difference(1.0, 100.0), 2.0);
    assert_eq!(LinearMarketing::default().sensitivity, 0.2);
}

#[test]
fn test_session_simulate_unknown_pair() {
    let session = session();
    let input = ScenarioInput::new(10.0, 0.0, Season::Normal);

    assert!(session.simulate("P3", "S1", &input).unwrap().is_none());
    assert!(session.simulate("P3", "S2", &input).unwrap().is_some());
}
