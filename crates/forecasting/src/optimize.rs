//! Bounded Nelder-Mead simplex search used to fit smoothing and ARIMA
//! parameters by minimizing a sum of squared errors.

use analysis_core::{AnalysisError, AnalysisResult};
use tracing::warn;

/// Box constraints on the parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> AnalysisResult<Self> {
        if lower.len() != upper.len() {
            return Err(AnalysisError::Config(format!(
                "Bounds dimension mismatch: {} lower and {} upper",
                lower.len(),
                upper.len()
            )));
        }
        for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(AnalysisError::Config(format!(
                    "Invalid bound at index {}: [{}, {}]",
                    i, lo, hi
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, v)| v.clamp(self.lower[i], self.upper[i]))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    /// Initial simplex offset as a fraction of each bound's width.
    pub initial_step: f64,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
    /// Relative tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Absolute tolerance on the distance of vertices from the centroid.
    pub x_tolerance: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            initial_step: 0.08,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            tolerance: 1e-10,
            x_tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Minimize `objective` inside `bounds` starting from `initial`.
///
/// Non-finite objective values rank as worst. Reaching the iteration cap
/// logs a warning and returns the best vertex found.
pub fn nelder_mead<F>(
    initial: &[f64],
    bounds: &Bounds,
    options: &NelderMeadOptions,
    mut objective: F,
) -> AnalysisResult<Minimum>
where
    F: FnMut(&[f64]) -> f64,
{
    let dim = bounds.dimension();
    if initial.len() != dim {
        return Err(AnalysisError::InvalidData(format!(
            "Initial point has {} parameters, bounds have {}",
            initial.len(),
            dim
        )));
    }

    let x0 = bounds.clamp(initial);
    let f0 = objective(&x0);
    if dim == 0 {
        return finish(x0, f0, 0, 1, true);
    }

    let mut simplex = Vec::with_capacity(dim + 1);
    let mut values = Vec::with_capacity(dim + 1);
    let mut evaluations = 1usize;
    simplex.push(x0.clone());
    values.push(f0);

    for d in 0..dim {
        let mut x = x0.clone();
        let step = (bounds.upper[d] - bounds.lower[d]).abs() * options.initial_step.max(1e-4);
        x[d] = (x[d] + step).min(bounds.upper[d]);
        if (x[d] - x0[d]).abs() < 1e-14 {
            x[d] = (x[d] - step).max(bounds.lower[d]);
        }
        values.push(objective(&x));
        simplex.push(x);
        evaluations += 1;
    }

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let mut order: Vec<usize> = (0..simplex.len()).collect();
        order.sort_by(|&i, &j| rank(values[i]).total_cmp(&rank(values[j])));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[dim];

        let centroid: Vec<f64> = (0..dim)
            .map(|d| simplex.iter().take(dim).map(|x| x[d]).sum::<f64>() / dim as f64)
            .collect();
        let max_vertex_dist = simplex
            .iter()
            .map(|x| {
                x.iter()
                    .zip(centroid.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0_f64, f64::max);

        let spread = (worst - best).abs();
        if spread <= options.tolerance * (1.0 + best.abs())
            && max_vertex_dist <= options.x_tolerance
        {
            converged = true;
            break;
        }

        let xr = bounds.clamp(
            &(0..dim)
                .map(|d| centroid[d] + options.reflection * (centroid[d] - simplex[dim][d]))
                .collect::<Vec<_>>(),
        );
        let fr = objective(&xr);
        evaluations += 1;

        if rank(fr) < rank(values[0]) {
            let xe = bounds.clamp(
                &(0..dim)
                    .map(|d| centroid[d] + options.expansion * (xr[d] - centroid[d]))
                    .collect::<Vec<_>>(),
            );
            let fe = objective(&xe);
            evaluations += 1;

            if rank(fe) < rank(fr) {
                simplex[dim] = xe;
                values[dim] = fe;
            } else {
                simplex[dim] = xr;
                values[dim] = fr;
            }
            continue;
        }

        if rank(fr) < rank(values[dim - 1]) {
            simplex[dim] = xr;
            values[dim] = fr;
            continue;
        }

        let xc = bounds.clamp(
            &(0..dim)
                .map(|d| centroid[d] + options.contraction * (simplex[dim][d] - centroid[d]))
                .collect::<Vec<_>>(),
        );
        let fc = objective(&xc);
        evaluations += 1;

        if rank(fc) < rank(values[dim]) {
            simplex[dim] = xc;
            values[dim] = fc;
            continue;
        }

        for i in 1..=dim {
            for d in 0..dim {
                simplex[i][d] = simplex[0][d] + options.shrink * (simplex[i][d] - simplex[0][d]);
            }
            simplex[i] = bounds.clamp(&simplex[i]);
            values[i] = objective(&simplex[i]);
            evaluations += 1;
        }
    }

    if !converged {
        warn!(
            "Nelder-Mead stopped after {} iterations without converging, keeping the best point",
            iterations
        );
    }

    let best = (0..values.len())
        .min_by(|&i, &j| rank(values[i]).total_cmp(&rank(values[j])))
        .unwrap_or(0);
    finish(simplex[best].clone(), values[best], iterations, evaluations, converged)
}

fn rank(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::INFINITY
    }
}

fn finish(
    x: Vec<f64>,
    value: f64,
    iterations: usize,
    evaluations: usize,
    converged: bool,
) -> AnalysisResult<Minimum> {
    if !value.is_finite() {
        return Err(AnalysisError::CalculationError(format!(
            "Objective is not finite at the best point {:?}",
            x
        )));
    }
    Ok(Minimum {
        x,
        value,
        iterations,
        evaluations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_inside_bounds() {
        let bounds = Bounds::new(vec![-1.0, -1.0], vec![1.0, 1.0]).unwrap();
        let out = nelder_mead(&[0.9, 0.9], &bounds, &NelderMeadOptions::default(), |x| {
            (x[0] - 0.25).powi(2) + (x[1] + 0.4).powi(2)
        })
        .unwrap();

        assert!(out.converged);
        assert!((out.x[0] - 0.25).abs() < 1e-4);
        assert!((out.x[1] + 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_minimum_on_boundary() {
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let out = nelder_mead(&[0.5], &bounds, &NelderMeadOptions::default(), |x| {
            (x[0] - 3.0).powi(2)
        })
        .unwrap();
        assert!((out.x[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_regions_are_avoided() {
        let bounds = Bounds::new(vec![-2.0], vec![2.0]).unwrap();
        let out = nelder_mead(&[1.0], &bounds, &NelderMeadOptions::default(), |x| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 0.5).powi(2)
            }
        })
        .unwrap();
        assert!((out.x[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_dimensional_problem() {
        let bounds = Bounds::new(vec![], vec![]).unwrap();
        let out = nelder_mead(&[], &bounds, &NelderMeadOptions::default(), |_| 4.0).unwrap();
        assert_eq!(out.value, 4.0);
        assert!(out.x.is_empty());
    }

    #[test]
    fn test_everywhere_nan_is_a_calculation_error() {
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let result = nelder_mead(&[0.5], &bounds, &NelderMeadOptions::default(), |_| f64::NAN);
        assert!(matches!(result, Err(AnalysisError::CalculationError(_))));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(Bounds::new(vec![1.0], vec![0.0]).is_err());
        assert!(Bounds::new(vec![0.0], vec![1.0, 2.0]).is_err());
    }
}
