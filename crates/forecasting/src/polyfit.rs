use analysis_core::{AnalysisError, AnalysisResult};
use nalgebra::{DMatrix, DVector};

const SVD_EPS: f64 = 1e-12;

/// Least-squares polynomial with its x-domain mapped onto [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients in the mapped variable, lowest degree first.
    coefficients: Vec<f64>,
    domain: (f64, f64),
}

impl Polynomial {
    /// Fit a polynomial of `degree` to the points `(x, y)`.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> AnalysisResult<Self> {
        if x.len() != y.len() {
            return Err(AnalysisError::InvalidData(format!(
                "Polynomial fit needs paired samples, got {} x and {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.len() <= degree {
            return Err(AnalysisError::InsufficientData(format!(
                "A degree {} polynomial needs more than {} points, got {}",
                degree,
                degree,
                x.len()
            )));
        }
        if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData(
                "Polynomial fit requires finite samples".to_string(),
            ));
        }

        let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let domain = (lo, hi);

        let vandermonde = DMatrix::from_fn(x.len(), degree + 1, |i, j| {
            map_to_window(x[i], domain).powi(j as i32)
        });
        let rhs = DVector::from_column_slice(y);

        let solution = vandermonde
            .svd(true, true)
            .solve(&rhs, SVD_EPS)
            .map_err(|e| AnalysisError::CalculationError(format!("Polynomial fit failed: {}", e)))?;

        let coefficients: Vec<f64> = solution.iter().copied().collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AnalysisError::CalculationError(
                "Polynomial fit produced non-finite coefficients".to_string(),
            ));
        }

        Ok(Self {
            coefficients,
            domain,
        })
    }

    /// Fit over the implicit axis `0..series.len()`.
    pub fn fit_series(series: &[f64], degree: usize) -> AnalysisResult<Self> {
        let x: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
        Self::fit(&x, series, degree)
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Evaluate with Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        let t = map_to_window(x, self.domain);
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }

    pub fn eval_many(&self, xs: impl IntoIterator<Item = f64>) -> Vec<f64> {
        xs.into_iter().map(|x| self.eval(x)).collect()
    }
}

fn map_to_window(x: f64, (lo, hi): (f64, f64)) -> f64 {
    if hi == lo {
        return 0.0;
    }
    (2.0 * x - (lo + hi)) / (hi - lo)
}
