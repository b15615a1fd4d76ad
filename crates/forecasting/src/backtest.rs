//! Rolling-window forecast evaluation.

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::forecaster::Forecaster;

/// One fitting window and the horizon that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowForecast {
    pub start: usize,
    pub forecast: Vec<f64>,
    pub actual: Vec<f64>,
    pub mae: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub method: String,
    pub window_len: usize,
    pub step: usize,
    pub forecast_horizon: usize,
    pub windows: Vec<WindowForecast>,
    pub mae: f64,
    pub rmse: f64,
}

/// Slide a `window_len` window over `series` in steps of `step`, forecast the
/// following horizon from each window with a freshly reset forecaster and
/// score it against the observed values.
pub fn rolling_forecast(
    forecaster: &mut Forecaster,
    series: &[f64],
    window_len: usize,
    step: usize,
) -> AnalysisResult<BacktestSummary> {
    if window_len == 0 || step == 0 {
        return Err(AnalysisError::Config(format!(
            "Rolling forecast needs a positive window length and step, got {} and {}",
            window_len, step
        )));
    }

    let horizon = forecaster.forecast_horizon();
    if series.len() < window_len + horizon {
        return Err(AnalysisError::InsufficientData(format!(
            "A window of {} plus a horizon of {} does not fit in {} observations",
            window_len,
            horizon,
            series.len()
        )));
    }

    let mut windows = Vec::new();
    let mut abs_error_sum = 0.0;
    let mut sq_error_sum = 0.0;
    let mut n_points = 0usize;

    for start in (0..=series.len() - window_len - horizon).step_by(step) {
        forecaster.reset();
        let fit_end = start + window_len;
        let forecast = forecaster.forecast(&series[start..fit_end])?;
        let actual = series[fit_end..fit_end + horizon].to_vec();

        let errors: Vec<f64> = forecast.iter().zip(actual.iter()).map(|(f, a)| f - a).collect();
        let window_abs = errors.iter().map(|e| e.abs()).sum::<f64>();
        abs_error_sum += window_abs;
        sq_error_sum += errors.iter().map(|e| e * e).sum::<f64>();
        n_points += errors.len();

        windows.push(WindowForecast {
            start,
            forecast,
            actual,
            mae: window_abs / horizon as f64,
        });
    }

    let mae = abs_error_sum / n_points as f64;
    let rmse = (sq_error_sum / n_points as f64).sqrt();

    info!(
        "Rolling forecast over {} windows ({}): MAE = {:.6}, RMSE = {:.6}",
        windows.len(),
        forecaster.description(),
        mae,
        rmse
    );

    Ok(BacktestSummary {
        method: forecaster.description(),
        window_len,
        step,
        forecast_horizon: horizon,
        windows,
        mae,
        rmse,
    })
}
