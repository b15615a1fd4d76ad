//! Seasonal ARIMA fitted by conditional sum of squares.
//!
//! The series is differenced by `(1 - L)^d (1 - L^s)^D` and the differenced
//! series `w` follows
//!
//! `phi(L) PHI(L^s) (w_t - mu) = theta(L) THETA(L^s) e_t`
//!
//! Residuals before the full autoregressive lag are fixed at zero and the
//! remaining squared residuals are minimized with bounded Nelder-Mead.

use std::fmt;
use std::str::FromStr;

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::optimize::{nelder_mead, Bounds, NelderMeadOptions};

const COEF_BOUND: f64 = 0.99;

/// Non-seasonal orders `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// Seasonal orders `(P, D, Q, s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub s: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, s: usize) -> Self {
        Self { p, d, q, s }
    }

    pub fn is_active(&self) -> bool {
        self.p > 0 || self.d > 0 || self.q > 0
    }

    pub(crate) fn validate(&self) -> AnalysisResult<()> {
        if self.is_active() && self.s < 2 {
            return Err(AnalysisError::Config(format!(
                "Seasonal period must be at least 2 when seasonal orders are set, got {}",
                self.s
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.p, self.d, self.q, self.s)
    }
}

/// Whether predictions are returned as levels of the original series or as
/// values of the differenced series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    #[default]
    Levels,
    Linear,
}

impl FromStr for PredictionType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levels" => Ok(PredictionType::Levels),
            "linear" => Ok(PredictionType::Linear),
            other => Err(AnalysisError::Config(format!(
                "Unknown prediction type '{}', expected levels or linear",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    /// Estimated `[phi.., PHI.., theta.., THETA.., mu?]`.
    params: Vec<f64>,
    mean: f64,
    /// Lag coefficients `a_k` of the expanded autoregressive polynomial.
    ar: Vec<f64>,
    /// Lag coefficients `b_k` of the expanded moving-average polynomial.
    ma: Vec<f64>,
    /// Differencing polynomial, `diff[0] == 1`.
    diff: Vec<f64>,
    series: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    css: f64,
    sigma2: f64,
}

impl ArimaModel {
    /// Estimate the model on `series`.
    pub fn fit(
        series: &[f64],
        order: ArimaOrder,
        seasonal: SeasonalOrder,
        include_mean: bool,
    ) -> AnalysisResult<Self> {
        seasonal.validate()?;
        if series.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData(
                "ARIMA input must be finite".to_string(),
            ));
        }

        let diff = differencing_polynomial(order.d, seasonal.d, seasonal.s);
        let m = diff.len() - 1;
        let ar_order = order.p + seasonal.p * seasonal.s;
        let n_params = order.p + seasonal.p + order.q + seasonal.q + usize::from(include_mean);

        if series.len() <= m + ar_order + n_params {
            return Err(AnalysisError::InsufficientData(format!(
                "ARIMA{}x{} needs more than {} observations, got {}",
                order,
                seasonal,
                m + ar_order + n_params,
                series.len()
            )));
        }

        let differenced = apply_differencing(series, &diff);

        let mut initial = vec![0.0; n_params];
        let mut lower = vec![-COEF_BOUND; n_params];
        let mut upper = vec![COEF_BOUND; n_params];
        if include_mean {
            let lo = differenced.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = differenced.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let (lo, hi) = if hi - lo < 1e-12 { (lo - 1.0, hi + 1.0) } else { (lo, hi) };
            initial[n_params - 1] = differenced.iter().mean();
            lower[n_params - 1] = lo;
            upper[n_params - 1] = hi;
        }
        let bounds = Bounds::new(lower, upper)?;

        let minimum = nelder_mead(&initial, &bounds, &NelderMeadOptions::default(), |p| {
            let (ar, ma, mean) = expand(p, order, seasonal, include_mean);
            css_residuals(&differenced, &ar, &ma, mean).1
        })?;

        let params = minimum.x;
        let (ar, ma, mean) = expand(&params, order, seasonal, include_mean);
        let (residuals, css) = css_residuals(&differenced, &ar, &ma, mean);
        if !css.is_finite() {
            return Err(AnalysisError::CalculationError(format!(
                "ARIMA{}x{} produced a non-finite sum of squares",
                order, seasonal
            )));
        }
        let n_eff = differenced.len() - ar.len();
        let sigma2 = css / n_eff as f64;

        info!(
            "Fitted ARIMA{}x{} on {} observations, CSS = {:.6}, sigma2 = {:.6}",
            order,
            seasonal,
            series.len(),
            css,
            sigma2
        );
        debug!("ARIMA parameters {:?} after {} iterations", params, minimum.iterations);

        Ok(Self {
            order,
            seasonal,
            params,
            mean,
            ar,
            ma,
            diff,
            series: series.to_vec(),
            differenced,
            residuals,
            css,
            sigma2,
        })
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn ar_params(&self) -> &[f64] {
        &self.params[..self.order.p]
    }

    pub fn ma_params(&self) -> &[f64] {
        let start = self.order.p + self.seasonal.p;
        &self.params[start..start + self.order.q]
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn css(&self) -> f64 {
        self.css
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn nobs(&self) -> usize {
        self.series.len()
    }

    /// Number of leading observations consumed by differencing.
    pub fn differencing_lag(&self) -> usize {
        self.diff.len() - 1
    }

    /// Predict positions `start..=end` of the series.
    ///
    /// Positions inside the sample get one-step-ahead predictions; positions
    /// past the end are forecast recursively with future shocks set to zero.
    pub fn predict(&self, start: usize, end: usize, typ: PredictionType) -> AnalysisResult<Vec<f64>> {
        let m = self.differencing_lag();
        if start < m {
            return Err(AnalysisError::InvalidData(format!(
                "Predictions start at index {} after differencing, got {}",
                m, start
            )));
        }
        if end < start {
            return Err(AnalysisError::InvalidData(format!(
                "Prediction end {} precedes start {}",
                end, start
            )));
        }

        let n = self.series.len();
        let mut w_ext = self.differenced.clone();
        let mut e_ext = self.residuals.clone();
        let mut y_ext = self.series.clone();
        for t in n..=end.max(n.saturating_sub(1)) {
            let w_hat = self.one_step(&w_ext, &e_ext, t - m);
            w_ext.push(w_hat);
            e_ext.push(0.0);
            let level = w_hat - self.lagged_levels(&y_ext, t);
            y_ext.push(level);
        }

        let out = (start..=end)
            .map(|t| {
                let k = t - m;
                if t < n {
                    let w_hat = self.one_step(&self.differenced, &self.residuals, k);
                    match typ {
                        PredictionType::Linear => w_hat,
                        PredictionType::Levels => w_hat - self.lagged_levels(&self.series, t),
                    }
                } else {
                    match typ {
                        PredictionType::Linear => w_ext[k],
                        PredictionType::Levels => y_ext[t],
                    }
                }
            })
            .collect();
        Ok(out)
    }

    /// Forecast `horizon` levels past the end of the sample.
    pub fn forecast(&self, horizon: usize) -> AnalysisResult<Vec<f64>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }
        let n = self.series.len();
        self.predict(n, n + horizon - 1, PredictionType::Levels)
    }

    fn one_step(&self, w: &[f64], e: &[f64], k: usize) -> f64 {
        let mut value = self.mean;
        for (j, a) in self.ar.iter().enumerate() {
            if let Some(idx) = k.checked_sub(j + 1) {
                value += a * (w[idx] - self.mean);
            }
        }
        for (j, b) in self.ma.iter().enumerate() {
            if let Some(idx) = k.checked_sub(j + 1) {
                value += b * e[idx];
            }
        }
        value
    }

    /// `sum_{j>=1} diff_j y_{t-j}`
    fn lagged_levels(&self, y: &[f64], t: usize) -> f64 {
        self.diff
            .iter()
            .enumerate()
            .skip(1)
            .map(|(j, c)| c * y[t - j])
            .sum()
    }
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `(1 - L)^d (1 - L^s)^D` as coefficients in ascending lag order.
fn differencing_polynomial(d: usize, seasonal_d: usize, s: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    for _ in 0..seasonal_d {
        let mut seasonal = vec![0.0; s + 1];
        seasonal[0] = 1.0;
        seasonal[s] = -1.0;
        poly = poly_mul(&poly, &seasonal);
    }
    poly
}

fn apply_differencing(series: &[f64], diff: &[f64]) -> Vec<f64> {
    let m = diff.len() - 1;
    (m..series.len())
        .map(|t| diff.iter().enumerate().map(|(j, c)| c * series[t - j]).sum())
        .collect()
}

/// Lag polynomial `1 + sign * (c_1 L + .. ) ` times its seasonal counterpart,
/// returned without the leading one and with `sign` folded back out.
fn seasonal_product(regular: &[f64], seasonal: &[f64], s: usize, sign: f64) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend(regular.iter().map(|c| sign * c));
    let mut b = vec![0.0; seasonal.len() * s + 1];
    b[0] = 1.0;
    for (i, c) in seasonal.iter().enumerate() {
        b[(i + 1) * s] = sign * c;
    }
    poly_mul(&a, &b)
        .into_iter()
        .skip(1)
        .map(|c| sign * c)
        .collect()
}

/// Split a parameter vector into expanded AR lags, MA lags and the mean.
fn expand(
    params: &[f64],
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    include_mean: bool,
) -> (Vec<f64>, Vec<f64>, f64) {
    let (phi, rest) = params.split_at(order.p);
    let (big_phi, rest) = rest.split_at(seasonal.p);
    let (theta, rest) = rest.split_at(order.q);
    let (big_theta, rest) = rest.split_at(seasonal.q);
    let mean = if include_mean { rest.first().copied().unwrap_or(0.0) } else { 0.0 };

    let ar = seasonal_product(phi, big_phi, seasonal.s, -1.0);
    let ma = seasonal_product(theta, big_theta, seasonal.s, 1.0);
    (ar, ma, mean)
}

/// Conditional residuals and their sum of squares.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64], mean: f64) -> (Vec<f64>, f64) {
    let r = ar.len();
    let mut residuals = vec![0.0; w.len()];
    let mut css = 0.0;
    for t in r..w.len() {
        let mut e = w[t] - mean;
        for (j, a) in ar.iter().enumerate() {
            e -= a * (w[t - j - 1] - mean);
        }
        for (j, b) in ma.iter().enumerate() {
            if let Some(idx) = t.checked_sub(j + 1) {
                e -= b * residuals[idx];
            }
        }
        residuals[t] = e;
        css += e * e;
    }
    (residuals, css)
}
