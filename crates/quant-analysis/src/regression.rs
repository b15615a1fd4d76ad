use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Ordinary least-squares line through a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Calculate the OLS fit of `y` on `x`.
///
/// R² is reported as 0 when either variable has no variance.
pub fn linear_regression(x: &[f64], y: &[f64]) -> AnalysisResult<LinearFit> {
    if x.len() != y.len() {
        return Err(AnalysisError::InvalidData(format!(
            "Regression needs paired samples, got {} x and {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "Need at least 2 points for a linear regression".to_string(),
        ));
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    let mut ss_xy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
        ss_xy += dx * dy;
    }

    if ss_xx == 0.0 {
        return Err(AnalysisError::CalculationError(
            "All x values are identical, the regression slope is undefined".to_string(),
        ));
    }

    let slope = ss_xy / ss_xx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if ss_yy == 0.0 {
        0.0
    } else {
        let r = (ss_xy / (ss_xx * ss_yy).sqrt()).clamp(-1.0, 1.0);
        r * r
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}
