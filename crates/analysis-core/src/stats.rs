//! Population statistics shared by the analysis crates.
//!
//! Standard deviations here use the population convention (divide by `n`),
//! which is what the return and trend metrics are defined against.

use statrs::statistics::Statistics;

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    data.mean()
}

/// Population standard deviation, NaN for an empty slice.
pub fn population_std(data: &[f64]) -> f64 {
    data.population_std_dev()
}

/// Median of a slice of lengths, rounded down like an integer cast.
pub fn median_len(lengths: &[usize]) -> usize {
    if lengths.is_empty() {
        return 0;
    }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

/// Simple fractional returns between consecutive observations.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}
