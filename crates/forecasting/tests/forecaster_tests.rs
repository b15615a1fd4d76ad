use approx::assert_relative_eq;
use forecasting::{
    rolling_forecast, ArimaOrder, ForecastMethod, Forecaster, ForecasterConfig, PredictionType,
    SeasonalOrder, Smoother, SmootherConfig, TrendKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Noisy upward drift with a weekly cycle.
fn seasonal_prices(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|t| {
            let cycle = 2.0 * (2.0 * std::f64::consts::PI * t as f64 / 7.0).sin();
            100.0 + 0.3 * t as f64 + cycle + rng.gen_range(-0.5..0.5)
        })
        .collect()
}

#[test]
fn test_config_driven_smoother_forecast() {
    let smoother = SmootherConfig {
        method: "holt_winter".to_string(),
        trend: Some("additive".to_string()),
        ..Default::default()
    }
    .build()
    .unwrap();

    let mut forecaster = ForecasterConfig {
        forecast_horizon: 7,
        ..Default::default()
    }
    .build(Some(smoother))
    .unwrap();

    let series = seasonal_prices(120, 11);
    let forecast = forecaster.forecast(&series).unwrap();
    assert_eq!(forecast.len(), 7);

    // An additive trend keeps climbing past the last observation.
    assert!(forecast[6] > forecast[0]);
    assert!(forecaster.is_fitted());
    assert_eq!(
        forecaster.description(),
        "Smoothing based forecast: Holt-Winter Smoothing: trend = additive"
    );
}

#[test]
fn test_smoother_state_is_reused_until_reset() {
    let mut forecaster = Forecaster::new(
        ForecastMethod::Smoother(Smoother::exponential(0.3, false).unwrap()),
        3,
        false,
    )
    .unwrap();

    let first = seasonal_prices(60, 1);
    let second: Vec<f64> = first.iter().map(|v| v + 50.0).collect();

    let a = forecaster.forecast(&first).unwrap();
    let cached = forecaster.forecast(&second).unwrap();
    assert_eq!(a, cached);

    forecaster.reset();
    let refreshed = forecaster.forecast(&second).unwrap();
    for (r, v) in refreshed.iter().zip(a.iter()) {
        assert_relative_eq!(*r, *v + 50.0, epsilon = 1e-9);
    }
}

#[test]
fn test_sarimax_tracks_weekly_cycle() {
    let series = seasonal_prices(140, 5);
    let (train, test) = series.split_at(133);

    let mut forecaster = Forecaster::new(
        ForecastMethod::Sarimax {
            order: ArimaOrder::new(0, 1, 0),
            seasonal_order: SeasonalOrder::new(0, 1, 0, 7),
        },
        7,
        false,
    )
    .unwrap();
    let forecast = forecaster.forecast(train).unwrap();

    let mae = forecast
        .iter()
        .zip(test.iter())
        .map(|(f, a)| (f - a).abs())
        .sum::<f64>()
        / test.len() as f64;
    assert!(mae < 2.0, "mae = {}", mae);
}

#[test]
fn test_arima_linear_predictions_are_differences() {
    let series: Vec<f64> = (0..50).map(|t| 3.0 * t as f64).collect();
    let mut forecaster = Forecaster::new(
        ForecastMethod::Arima {
            order: ArimaOrder::new(0, 1, 0),
            prediction_type: PredictionType::Linear,
        },
        4,
        false,
    )
    .unwrap();

    for value in forecaster.forecast(&series).unwrap() {
        assert_relative_eq!(value, 3.0, epsilon = 1e-3);
    }
    let model = forecaster.model().unwrap();
    assert_eq!(model.nobs(), 50);
    assert_eq!(model.differencing_lag(), 1);
}

#[test]
fn test_rolling_backtest_prefers_trend_model_on_trending_data() {
    let series = seasonal_prices(150, 3);

    let mut flat = Forecaster::new(
        ForecastMethod::Smoother(Smoother::holt_winters(TrendKind::None).unwrap()),
        5,
        false,
    )
    .unwrap();
    let mut trended = Forecaster::new(
        ForecastMethod::Smoother(Smoother::polyfit(1).unwrap()),
        5,
        false,
    )
    .unwrap();

    let flat_summary = rolling_forecast(&mut flat, &series, 60, 10).unwrap();
    let trend_summary = rolling_forecast(&mut trended, &series, 60, 10).unwrap();

    assert_eq!(flat_summary.windows.len(), trend_summary.windows.len());
    assert!(trend_summary.mae < flat_summary.mae);
    assert!(trend_summary.rmse >= trend_summary.mae);

    let json = serde_json::to_value(&trend_summary).unwrap();
    assert_eq!(json["forecast_horizon"], 5);
    assert!(json["windows"].as_array().is_some());
}
