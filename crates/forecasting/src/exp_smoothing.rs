//! Exponential smoothing without seasonality or damping.
//!
//! Level/trend recursions, with `l` the level and `b` the trend:
//!
//! * none: `l_t = a y_t + (1 - a) l_{t-1}`, forecast `l`
//! * additive: `l_t = a y_t + (1 - a)(l_{t-1} + b_{t-1})`,
//!   `b_t = c (l_t - l_{t-1}) + (1 - c) b_{t-1}`, forecast `l + h b`
//! * multiplicative: `l_t = a y_t + (1 - a) l_{t-1} b_{t-1}`,
//!   `b_t = c (l_t / l_{t-1}) + (1 - c) b_{t-1}`, forecast `l b^h`
//!
//! The initial level is the first observation, which is also its own fitted
//! value; the initial trend is the first difference (additive) or ratio
//! (multiplicative).

use std::fmt;
use std::str::FromStr;

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::optimize::{nelder_mead, Bounds, NelderMeadOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    #[default]
    None,
    Additive,
    Multiplicative,
}

impl TrendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendKind::None => "none",
            TrendKind::Additive => "additive",
            TrendKind::Multiplicative => "multiplicative",
        }
    }
}

impl fmt::Display for TrendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(TrendKind::None),
            "add" | "additive" => Ok(TrendKind::Additive),
            "mul" | "multiplicative" => Ok(TrendKind::Multiplicative),
            other => Err(AnalysisError::Config(format!(
                "Unsupported trend '{}', expected none, add, additive, mul or multiplicative",
                other
            ))),
        }
    }
}

/// Fitted exponential smoothing model.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialSmoothing {
    trend: TrendKind,
    alpha: f64,
    beta: Option<f64>,
    fitted: Vec<f64>,
    level: f64,
    slope: f64,
    sse: f64,
}

impl ExponentialSmoothing {
    /// Simple exponential smoothing with a fixed smoothing factor.
    pub fn fit_simple(series: &[f64], alpha: f64) -> AnalysisResult<Self> {
        check_unit_interval("alpha", alpha)?;
        Self::fit_with_params(series, TrendKind::None, alpha, None)
    }

    /// Simple exponential smoothing with the smoothing factor chosen by SSE.
    pub fn fit_simple_optimized(series: &[f64]) -> AnalysisResult<Self> {
        Self::fit_optimized(series, TrendKind::None)
    }

    /// Fit with every smoothing parameter chosen by SSE minimization.
    pub fn fit_optimized(series: &[f64], trend: TrendKind) -> AnalysisResult<Self> {
        validate_series(series, trend)?;

        let (initial, bounds) = match trend {
            TrendKind::None => (vec![0.5], Bounds::new(vec![0.0], vec![1.0])?),
            TrendKind::Additive | TrendKind::Multiplicative => (
                vec![0.5, 0.1],
                Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0])?,
            ),
        };

        let minimum = nelder_mead(&initial, &bounds, &NelderMeadOptions::default(), |p| {
            match recursion(series, trend, p[0], p.get(1).copied()) {
                Ok(run) => run.sse,
                Err(_) => f64::INFINITY,
            }
        })?;

        debug!(
            "Exponential smoothing ({}) fitted params {:?} with SSE {:.6} after {} iterations",
            trend, minimum.x, minimum.value, minimum.iterations
        );

        Self::fit_with_params(series, trend, minimum.x[0], minimum.x.get(1).copied())
    }

    fn fit_with_params(
        series: &[f64],
        trend: TrendKind,
        alpha: f64,
        beta: Option<f64>,
    ) -> AnalysisResult<Self> {
        validate_series(series, trend)?;
        let run = recursion(series, trend, alpha, beta)?;
        if !run.sse.is_finite() {
            return Err(AnalysisError::CalculationError(format!(
                "Exponential smoothing diverged with alpha = {} and beta = {:?}",
                alpha, beta
            )));
        }

        Ok(Self {
            trend,
            alpha,
            beta: match trend {
                TrendKind::None => None,
                _ => beta,
            },
            fitted: run.fitted,
            level: run.level,
            slope: run.slope,
            sse: run.sse,
        })
    }

    pub fn trend(&self) -> TrendKind {
        self.trend
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// One-step-ahead fitted values, same length as the fitted series.
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Forecast `horizon` steps past the end of the fitted series.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon).map(|h| self.forecast_step(h)).collect()
    }

    fn forecast_step(&self, h: usize) -> f64 {
        match self.trend {
            TrendKind::None => self.level,
            TrendKind::Additive => self.level + h as f64 * self.slope,
            TrendKind::Multiplicative => self.level * self.slope.powi(h as i32),
        }
    }

    /// Predictions for indices `start..=end` of the fitted series; indices past
    /// its end are forecasts.
    pub fn predict(&self, start: usize, end: usize) -> AnalysisResult<Vec<f64>> {
        if end < start {
            return Err(AnalysisError::InvalidData(format!(
                "Prediction end {} precedes start {}",
                end, start
            )));
        }
        let n = self.fitted.len();
        let ahead = if end >= n { self.forecast(end + 1 - n) } else { Vec::new() };
        Ok((start..=end)
            .map(|i| if i < n { self.fitted[i] } else { ahead[i - n] })
            .collect())
    }
}

struct Recursion {
    fitted: Vec<f64>,
    level: f64,
    slope: f64,
    sse: f64,
}

fn recursion(
    series: &[f64],
    trend: TrendKind,
    alpha: f64,
    beta: Option<f64>,
) -> AnalysisResult<Recursion> {
    let beta = beta.unwrap_or(0.0);
    let mut level = series[0];
    let mut slope = match trend {
        TrendKind::None => 0.0,
        TrendKind::Additive => series[1] - series[0],
        TrendKind::Multiplicative => series[1] / series[0],
    };

    let mut fitted = Vec::with_capacity(series.len());
    fitted.push(series[0]);
    let mut sse = 0.0;

    for &y in &series[1..] {
        let prediction = match trend {
            TrendKind::None => level,
            TrendKind::Additive => level + slope,
            TrendKind::Multiplicative => level * slope,
        };
        fitted.push(prediction);
        sse += (y - prediction).powi(2);

        let previous = level;
        level = alpha * y + (1.0 - alpha) * prediction;
        slope = match trend {
            TrendKind::None => 0.0,
            TrendKind::Additive => beta * (level - previous) + (1.0 - beta) * slope,
            TrendKind::Multiplicative => {
                if previous == 0.0 {
                    return Err(AnalysisError::CalculationError(
                        "Multiplicative trend hit a zero level".to_string(),
                    ));
                }
                beta * (level / previous) + (1.0 - beta) * slope
            }
        };
    }

    Ok(Recursion {
        fitted,
        level,
        slope,
        sse,
    })
}

fn validate_series(series: &[f64], trend: TrendKind) -> AnalysisResult<()> {
    let needed = match trend {
        TrendKind::None => 1,
        _ => 2,
    };
    if series.len() < needed {
        return Err(AnalysisError::InsufficientData(format!(
            "Exponential smoothing with trend {} needs at least {} observations, got {}",
            trend,
            needed,
            series.len()
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidData(
            "Exponential smoothing requires finite observations".to_string(),
        ));
    }
    if trend == TrendKind::Multiplicative && series.iter().any(|v| *v <= 0.0) {
        return Err(AnalysisError::InvalidData(
            "A multiplicative trend requires strictly positive data".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> AnalysisResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AnalysisError::Config(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}
