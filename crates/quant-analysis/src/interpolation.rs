//! Gap filling for quote series.
//!
//! NaN samples are removed, a one-dimensional interpolant is built over the
//! remaining `(position, value)` nodes and evaluated back on the requested
//! axis. Evaluation outside the node range extrapolates: step kinds repeat the
//! boundary value, `Linear` continues the boundary segment.

use std::fmt;
use std::str::FromStr;

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    /// Step function holding the nearest preceding sample.
    #[default]
    Previous,
    /// Step function taking the nearest following sample.
    Next,
    /// Closest sample, ties resolved towards the earlier one.
    Nearest,
    Linear,
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpolationKind::Previous => "previous",
            InterpolationKind::Next => "next",
            InterpolationKind::Nearest => "nearest",
            InterpolationKind::Linear => "linear",
        };
        f.write_str(name)
    }
}

impl FromStr for InterpolationKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "previous" => Ok(InterpolationKind::Previous),
            "next" => Ok(InterpolationKind::Next),
            "nearest" => Ok(InterpolationKind::Nearest),
            "linear" => Ok(InterpolationKind::Linear),
            other => Err(AnalysisError::Config(format!(
                "Unsupported interpolation kind '{}', expected previous, next, nearest or linear",
                other
            ))),
        }
    }
}

/// Interpolant over the finite samples of a series.
#[derive(Debug, Clone)]
pub struct Interpolator {
    kind: InterpolationKind,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Interpolator {
    /// Build from sample positions and values; NaN values are skipped.
    ///
    /// Positions must be increasing.
    pub fn new(x_axis: &[f64], y: &[f64], kind: InterpolationKind) -> AnalysisResult<Self> {
        if x_axis.len() != y.len() {
            return Err(AnalysisError::InvalidData(format!(
                "Interpolation axis has {} points for {} samples",
                x_axis.len(),
                y.len()
            )));
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = x_axis
            .iter()
            .zip(y.iter())
            .filter(|(_, v)| !v.is_nan())
            .map(|(x, v)| (*x, *v))
            .unzip();

        if xs.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "Cannot interpolate a series without any valid sample".to_string(),
            ));
        }

        Ok(Self { kind, xs, ys })
    }

    /// Evaluate the interpolant at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        // Number of nodes at or before x.
        let upto = self.xs.partition_point(|&xi| xi <= x);

        match self.kind {
            InterpolationKind::Previous => self.ys[upto.saturating_sub(1)],
            InterpolationKind::Next => {
                let from = self.xs.partition_point(|&xi| xi < x);
                self.ys[from.min(last)]
            }
            InterpolationKind::Nearest => {
                if upto == 0 {
                    return self.ys[0];
                }
                if upto > last {
                    return self.ys[last];
                }
                let (lo, hi) = (upto - 1, upto);
                if x - self.xs[lo] <= self.xs[hi] - x {
                    self.ys[lo]
                } else {
                    self.ys[hi]
                }
            }
            InterpolationKind::Linear => {
                if last == 0 {
                    return self.ys[0];
                }
                let hi = upto.clamp(1, last);
                let lo = hi - 1;
                let slope = (self.ys[hi] - self.ys[lo]) / (self.xs[hi] - self.xs[lo]);
                self.ys[lo] + (x - self.xs[lo]) * slope
            }
        }
    }

    pub fn eval_many(&self, x_axis: &[f64]) -> Vec<f64> {
        x_axis.iter().map(|&x| self.eval(x)).collect()
    }
}

/// Replace the NaNs of a series sampled at positions `0..n`.
pub fn fill_gaps(values: &[f64], kind: InterpolationKind) -> AnalysisResult<Vec<f64>> {
    if !values.iter().any(|v| v.is_nan()) {
        return Ok(values.to_vec());
    }
    let x_axis = integer_axis(values.len());
    Ok(Interpolator::new(&x_axis, values, kind)?.eval_many(&x_axis))
}

/// Resample a series onto the integer axis `0..target_len`.
///
/// Sample `i` sits at position `i`. Samples past the end of the target axis
/// still act as interpolation nodes, and missing trailing positions are
/// extrapolated.
pub fn align_to_length(
    values: &[f64],
    target_len: usize,
    kind: InterpolationKind,
) -> AnalysisResult<Vec<f64>> {
    let interpolator = Interpolator::new(&integer_axis(values.len()), values, kind)?;
    Ok(interpolator.eval_many(&integer_axis(target_len)))
}

fn integer_axis(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_series_without_gaps_is_unchanged() {
        let values = vec![1.0, 2.5, 2.0, 4.0];
        for kind in [
            InterpolationKind::Previous,
            InterpolationKind::Next,
            InterpolationKind::Nearest,
            InterpolationKind::Linear,
        ] {
            assert_eq!(fill_gaps(&values, kind).unwrap(), values);
        }
    }

    #[test]
    fn test_previous_fills_from_earlier_sample() {
        let values = [f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        let filled = fill_gaps(&values, InterpolationKind::Previous).unwrap();
        assert_eq!(filled, vec![1.0, 1.0, 1.0, 1.0, 4.0, 4.0]);
    }

    #[test]
    fn test_next_and_nearest() {
        let values = [1.0, f64::NAN, f64::NAN, f64::NAN, 5.0, f64::NAN];
        let next = fill_gaps(&values, InterpolationKind::Next).unwrap();
        assert_eq!(next, vec![1.0, 5.0, 5.0, 5.0, 5.0, 5.0]);

        let nearest = fill_gaps(&values, InterpolationKind::Nearest).unwrap();
        assert_eq!(nearest, vec![1.0, 1.0, 1.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_linear_interpolates_and_extrapolates() {
        let values = [f64::NAN, 2.0, f64::NAN, 4.0, f64::NAN];
        let filled = fill_gaps(&values, InterpolationKind::Linear).unwrap();
        let expected = [1.0, 2.0, 3.0, 4.0, 5.0];
        for (a, b) in filled.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_all_nan_is_insufficient() {
        let result = fill_gaps(&[f64::NAN, f64::NAN], InterpolationKind::Previous);
        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_align_to_shorter_and_longer_axis() {
        let rates = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(
            align_to_length(&rates, 2, InterpolationKind::Previous).unwrap(),
            vec![0.1, 0.2]
        );
        assert_eq!(
            align_to_length(&rates, 6, InterpolationKind::Previous).unwrap(),
            vec![0.1, 0.2, 0.3, 0.4, 0.4, 0.4]
        );
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Linear".parse::<InterpolationKind>().unwrap(), InterpolationKind::Linear);
        assert!("cubic".parse::<InterpolationKind>().is_err());
    }
}
