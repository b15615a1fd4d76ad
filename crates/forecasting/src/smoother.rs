use std::fmt;

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exp_smoothing::{check_unit_interval, ExponentialSmoothing, TrendKind};
use crate::polyfit::Polynomial;
use crate::state::ModelState;

/// Smoothing strategy with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Mean over a running window of `length` observations.
    #[serde(rename = "avg")]
    RunningAverage { length: usize },
    /// Simple exponential smoothing; `alpha` is replaced by the fitted value
    /// when `optimize` is set.
    #[serde(rename = "exp")]
    Exponential { alpha: f64, optimize: bool },
    #[serde(rename = "holt_winter")]
    HoltWinters { trend: TrendKind },
    #[serde(rename = "polyfit")]
    PolyFit { degree: usize },
}

impl SmoothingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SmoothingMethod::RunningAverage { .. } => "avg",
            SmoothingMethod::Exponential { .. } => "exp",
            SmoothingMethod::HoltWinters { .. } => "holt_winter",
            SmoothingMethod::PolyFit { .. } => "polyfit",
        }
    }

    fn validate(&self) -> AnalysisResult<()> {
        match self {
            SmoothingMethod::RunningAverage { length: 0 } => Err(AnalysisError::Config(
                "Running average length must be at least 1".to_string(),
            )),
            SmoothingMethod::Exponential { alpha, .. } => check_unit_interval("alpha", *alpha),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingMethod::RunningAverage { length } => {
                write!(f, "Average Window: Length = {}", length)
            }
            SmoothingMethod::Exponential { alpha, .. } => {
                write!(f, "Exponential Smoothing: alpha = {}", alpha)
            }
            SmoothingMethod::HoltWinters { trend } => {
                write!(f, "Holt-Winter Smoothing: trend = {}", trend)
            }
            SmoothingMethod::PolyFit { degree } => write!(f, "PolyFit: Order = {}", degree),
        }
    }
}

/// Model retained by a [`Smoother`] after fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum SmootherModel {
    Exponential(ExponentialSmoothing),
    Polynomial(Polynomial),
}

/// One smoothing strategy plus the model it last fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoother {
    method: SmoothingMethod,
    state: ModelState<SmootherModel>,
}

impl Smoother {
    pub fn new(method: SmoothingMethod) -> AnalysisResult<Self> {
        method.validate()?;
        Ok(Self {
            method,
            state: ModelState::Unfitted,
        })
    }

    pub fn running_average(length: usize) -> AnalysisResult<Self> {
        Self::new(SmoothingMethod::RunningAverage { length })
    }

    pub fn exponential(alpha: f64, optimize: bool) -> AnalysisResult<Self> {
        Self::new(SmoothingMethod::Exponential { alpha, optimize })
    }

    pub fn holt_winters(trend: TrendKind) -> AnalysisResult<Self> {
        Self::new(SmoothingMethod::HoltWinters { trend })
    }

    pub fn polyfit(degree: usize) -> AnalysisResult<Self> {
        Self::new(SmoothingMethod::PolyFit { degree })
    }

    pub fn method(&self) -> &SmoothingMethod {
        &self.method
    }

    pub fn model(&self) -> Option<&SmootherModel> {
        self.state.get()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    /// Drop the retained model.
    pub fn reset(&mut self) {
        self.state.clear();
    }

    pub fn description(&self) -> String {
        self.method.to_string()
    }

    /// Fit the strategy on `series`, retain the fitted model and return the
    /// smoothed series.
    ///
    /// The running average yields `n - length + 1` points; every other
    /// strategy yields `n`.
    pub fn smooth(&mut self, series: &[f64]) -> AnalysisResult<Vec<f64>> {
        if series.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "Cannot smooth an empty series".to_string(),
            ));
        }

        match self.method {
            SmoothingMethod::RunningAverage { length } => running_mean(series, length),
            SmoothingMethod::Exponential { alpha, optimize } => {
                let model = if optimize {
                    let model = ExponentialSmoothing::fit_simple_optimized(series)?;
                    self.method = SmoothingMethod::Exponential {
                        alpha: model.alpha(),
                        optimize,
                    };
                    model
                } else {
                    ExponentialSmoothing::fit_simple(series, alpha)?
                };
                let smoothed = model.fitted_values().to_vec();
                self.state.set(SmootherModel::Exponential(model));
                Ok(smoothed)
            }
            SmoothingMethod::HoltWinters { trend } => {
                let model = ExponentialSmoothing::fit_optimized(series, trend)?;
                let smoothed = model.fitted_values().to_vec();
                self.state.set(SmootherModel::Exponential(model));
                Ok(smoothed)
            }
            SmoothingMethod::PolyFit { degree } => {
                let poly = Polynomial::fit_series(series, degree)?;
                let smoothed = poly.eval_many((0..series.len()).map(|i| i as f64));
                self.state.set(SmootherModel::Polynomial(poly));
                Ok(smoothed)
            }
        }
    }

    /// Predict positions `n..n + horizon` of `series` (length `n`) from the
    /// retained model, fitting it on `series` first when nothing is retained.
    pub fn extend(&mut self, series: &[f64], horizon: usize) -> AnalysisResult<Vec<f64>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }
        if let SmoothingMethod::RunningAverage { .. } = self.method {
            return recursive_mean_forecast(series, horizon);
        }

        if !self.is_fitted() {
            debug!("No retained {} model, fitting before forecasting", self.method.name());
            self.smooth(series)?;
        }

        let n = series.len();
        match self.state.get() {
            Some(SmootherModel::Exponential(model)) => model.predict(n, n + horizon - 1),
            Some(SmootherModel::Polynomial(poly)) => {
                Ok(poly.eval_many((n..n + horizon).map(|i| i as f64)))
            }
            None => Err(AnalysisError::CalculationError(format!(
                "{} smoother retained no model",
                self.method.name()
            ))),
        }
    }
}

/// Calculate the running mean over windows of `length` (valid positions only).
pub fn running_mean(series: &[f64], length: usize) -> AnalysisResult<Vec<f64>> {
    if length == 0 {
        return Err(AnalysisError::Config(
            "Running average length must be at least 1".to_string(),
        ));
    }
    if series.len() < length {
        return Err(AnalysisError::InsufficientData(format!(
            "Running average of length {} needs at least {} observations, got {}",
            length,
            length,
            series.len()
        )));
    }
    Ok(series
        .windows(length)
        .map(|w| w.iter().sum::<f64>() / length as f64)
        .collect())
}

/// Each forecast is the mean of the trailing `n` values of the series
/// extended by the forecasts made so far.
fn recursive_mean_forecast(series: &[f64], horizon: usize) -> AnalysisResult<Vec<f64>> {
    let n = series.len();
    if n == 0 {
        return Err(AnalysisError::InsufficientData(
            "Cannot forecast from an empty series".to_string(),
        ));
    }

    let mut extended = series.to_vec();
    for _ in 0..horizon {
        let window = &extended[extended.len() - n..];
        let next = window.iter().sum::<f64>() / n as f64;
        extended.push(next);
    }
    Ok(extended.split_off(n))
}

/// String-keyed smoother settings as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    pub method: String,
    pub length: usize,
    pub alpha: f64,
    pub optimize: bool,
    pub trend: Option<String>,
    pub poly_degree: usize,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            method: "avg".to_string(),
            length: 5,
            alpha: 0.6,
            optimize: false,
            trend: None,
            poly_degree: 2,
        }
    }
}

impl SmootherConfig {
    pub fn build(&self) -> AnalysisResult<Smoother> {
        let method = match self.method.trim().to_ascii_lowercase().as_str() {
            "avg" => SmoothingMethod::RunningAverage {
                length: self.length,
            },
            "exp" => SmoothingMethod::Exponential {
                alpha: self.alpha,
                optimize: self.optimize,
            },
            "holt_winter" => SmoothingMethod::HoltWinters {
                trend: match &self.trend {
                    Some(t) => t.parse()?,
                    None => TrendKind::None,
                },
            },
            "polyfit" => SmoothingMethod::PolyFit {
                degree: self.poly_degree,
            },
            other => {
                return Err(AnalysisError::Config(format!(
                    "The {} smoothing method is not supported, use one of: avg, exp, holt_winter, polyfit",
                    other
                )))
            }
        };
        Smoother::new(method)
    }
}

impl TryFrom<SmootherConfig> for Smoother {
    type Error = AnalysisError;

    fn try_from(config: SmootherConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_running_average_scenario() {
        let mut smoother = Smoother::running_average(3).unwrap();
        assert_eq!(smoother.smooth(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), vec![2.0, 3.0, 4.0]);
        assert!(!smoother.is_fitted());
    }

    #[test]
    fn test_output_lengths() {
        let series: Vec<f64> = (0..30).map(|t| 10.0 + (t as f64 * 0.7).sin()).collect();

        let mut avg = Smoother::running_average(5).unwrap();
        assert_eq!(avg.smooth(&series).unwrap().len(), 26);

        let mut exp = Smoother::exponential(0.6, false).unwrap();
        assert_eq!(exp.smooth(&series).unwrap().len(), 30);

        let mut holt = Smoother::holt_winters(TrendKind::Additive).unwrap();
        assert_eq!(holt.smooth(&series).unwrap().len(), 30);

        let mut poly = Smoother::polyfit(3).unwrap();
        assert_eq!(poly.smooth(&series).unwrap().len(), 30);
    }

    #[test]
    fn test_polyfit_reproduces_line() {
        let series: Vec<f64> = (0..10).map(|t| t as f64).collect();
        let mut smoother = Smoother::polyfit(1).unwrap();
        let smoothed = smoother.smooth(&series).unwrap();
        for (s, v) in smoothed.iter().zip(series.iter()) {
            assert_relative_eq!(*s, *v, epsilon = 1e-9);
        }
        assert!(matches!(smoother.model(), Some(SmootherModel::Polynomial(_))));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(Smoother::running_average(5).unwrap().description(), "Average Window: Length = 5");
        assert_eq!(
            Smoother::exponential(0.6, false).unwrap().description(),
            "Exponential Smoothing: alpha = 0.6"
        );
        assert_eq!(
            Smoother::holt_winters(TrendKind::Additive).unwrap().description(),
            "Holt-Winter Smoothing: trend = additive"
        );
        assert_eq!(Smoother::polyfit(2).unwrap().description(), "PolyFit: Order = 2");
    }

    #[test]
    fn test_optimized_alpha_is_reported() {
        let mut smoother = Smoother::exponential(0.6, true).unwrap();
        smoother.smooth(&[1.0, 2.0, 4.0, 7.0, 11.0, 16.0, 22.0]).unwrap();
        match smoother.method() {
            SmoothingMethod::Exponential { alpha, optimize } => {
                assert!(*optimize);
                assert_relative_eq!(*alpha, 1.0, epsilon = 1e-6);
            }
            other => panic!("unexpected method {:?}", other),
        }
    }

    #[test]
    fn test_smooth_always_refits() {
        let mut smoother = Smoother::polyfit(1).unwrap();
        smoother.smooth(&[0.0, 1.0, 2.0]).unwrap();
        let first = smoother.model().cloned();
        smoother.smooth(&[0.0, 2.0, 4.0]).unwrap();
        assert_ne!(smoother.model().cloned(), first);
    }

    #[test]
    fn test_too_short_inputs() {
        let mut avg = Smoother::running_average(4).unwrap();
        assert!(matches!(avg.smooth(&[1.0, 2.0]), Err(AnalysisError::InsufficientData(_))));

        let mut poly = Smoother::polyfit(3).unwrap();
        assert!(matches!(poly.smooth(&[1.0, 2.0, 3.0]), Err(AnalysisError::InsufficientData(_))));

        let mut exp = Smoother::exponential(0.5, false).unwrap();
        assert!(matches!(exp.smooth(&[]), Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_cached_models_forecast_past_the_new_series() {
        let short: Vec<f64> = (0..20).map(|t| t as f64).collect();
        let long: Vec<f64> = (0..30).map(|t| t as f64).collect();

        let mut holt = Smoother::holt_winters(TrendKind::Additive).unwrap();
        let mut poly = Smoother::polyfit(1).unwrap();
        holt.smooth(&short).unwrap();
        poly.smooth(&short).unwrap();

        let from_holt = holt.extend(&long, 2).unwrap();
        let from_poly = poly.extend(&long, 2).unwrap();
        for (h, p) in from_holt.iter().zip(from_poly.iter()) {
            assert_relative_eq!(*h, *p, epsilon = 1e-6);
        }
        assert_relative_eq!(from_holt[0], 30.0, epsilon = 1e-6);
        assert_relative_eq!(from_holt[1], 31.0, epsilon = 1e-6);

        let mut exp = Smoother::exponential(0.5, false).unwrap();
        exp.smooth(&[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(exp.extend(&[4.0; 6], 3).unwrap(), vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_recursive_mean_forecast() {
        let forecast = recursive_mean_forecast(&[1.0, 2.0, 3.0], 2).unwrap();
        assert_relative_eq!(forecast[0], 2.0);
        assert_relative_eq!(forecast[1], (2.0 + 3.0 + 2.0) / 3.0);
    }

    #[test]
    fn test_config_building() {
        let config = SmootherConfig {
            method: "holt_winter".to_string(),
            trend: Some("mul".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.build().unwrap().method(),
            &SmoothingMethod::HoltWinters {
                trend: TrendKind::Multiplicative
            }
        );

        let bad = SmootherConfig {
            method: "kalman".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad.build(), Err(AnalysisError::Config(_))));

        let zero = SmootherConfig {
            length: 0,
            ..Default::default()
        };
        assert!(matches!(Smoother::try_from(zero), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_method_serde_tags() {
        let json = serde_json::to_value(SmoothingMethod::RunningAverage { length: 3 }).unwrap();
        assert_eq!(json["method"], "avg");
        assert_eq!(json["length"], 3);
    }
}
