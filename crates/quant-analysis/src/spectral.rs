//! Spectral decomposition of quote series.
//!
//! Power spectral densities come from Welch's method with a periodic Hann
//! window, half-overlapping segments, constant detrending and one-sided
//! density scaling at a sampling frequency of 1.

use std::f64::consts::PI;
use std::sync::Arc;

use analysis_core::stats::{mean, population_std};
use analysis_core::{AnalysisError, AnalysisResult};
use nalgebra::DMatrix;
use rayon::prelude::*;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_SEGMENT_LEN: usize = 256;

/// Retained spectral components of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralComponents {
    pub frequencies: Vec<f64>,
    /// Normalized energies, aligned with `frequencies`.
    pub energies: Vec<f64>,
}

impl SpectralComponents {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Average of `energy * sin(2 pi f x)` over the components.
    pub fn wave_at(&self, x: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .frequencies
            .iter()
            .zip(self.energies.iter())
            .map(|(f, e)| e * (2.0 * PI * f * x).sin())
            .sum();
        sum / self.len() as f64
    }
}

/// Per-asset spectral components, in asset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralDecomposition {
    pub assets: Vec<SpectralComponents>,
}

impl SpectralDecomposition {
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }
}

/// One-sided power spectral density estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    pub frequencies: Vec<f64>,
    pub density: Vec<f64>,
}

/// Welch estimator for a fixed segment length.
pub struct WelchEstimator {
    segment_len: usize,
    window: Vec<f64>,
    scale: f64,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl WelchEstimator {
    /// Estimator for signals of `signal_len` samples.
    pub fn new(signal_len: usize) -> AnalysisResult<Self> {
        if signal_len < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "Need at least 2 observations for a spectral estimate, got {}",
                signal_len
            )));
        }

        let segment_len = signal_len.min(MAX_SEGMENT_LEN);
        let window = hann_window(segment_len);
        let scale = 1.0 / window.iter().map(|w| w * w).sum::<f64>();
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(segment_len);

        Ok(Self {
            segment_len,
            window,
            scale,
            fft,
        })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..=self.segment_len / 2)
            .map(|k| k as f64 / self.segment_len as f64)
            .collect()
    }

    pub fn estimate(&self, signal: &[f64]) -> AnalysisResult<PowerSpectrum> {
        let n = self.segment_len;
        if signal.len() < n {
            return Err(AnalysisError::InsufficientData(format!(
                "Signal of {} observations is shorter than the segment length {}",
                signal.len(),
                n
            )));
        }

        let overlap = n / 2;
        let step = n - overlap;
        let n_segments = (signal.len() - overlap) / step;
        let n_bins = n / 2 + 1;

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut density = vec![0.0; n_bins];

        for s in 0..n_segments {
            let segment = &signal[s * step..s * step + n];
            let offset = mean(segment);
            for ((slot, x), w) in input.iter_mut().zip(segment.iter()).zip(self.window.iter()) {
                *slot = (x - offset) * w;
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| AnalysisError::CalculationError(format!("FFT failed: {}", e)))?;

            for (k, value) in spectrum.iter().enumerate() {
                let mut power = value.norm_sqr() * self.scale;
                let is_nyquist = n % 2 == 0 && k == n / 2;
                if k != 0 && !is_nyquist {
                    power *= 2.0;
                }
                density[k] += power;
            }
        }

        for d in density.iter_mut() {
            *d /= n_segments as f64;
        }

        Ok(PowerSpectrum {
            frequencies: self.frequencies(),
            density,
        })
    }
}

/// Periodic (DFT-even) Hann window.
fn hann_window(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / len as f64).cos())
        .collect()
}

/// Decompose every column of `quotes` into the frequency bins whose
/// normalized energy exceeds `threshold`.
pub fn spectral_decomposition(
    quotes: &DMatrix<f64>,
    threshold: f64,
) -> AnalysisResult<SpectralDecomposition> {
    if quotes.iter().any(|v| v.is_nan()) {
        return Err(AnalysisError::InvalidData(
            "Detected NaNs in the quotes, please check the inputs".to_string(),
        ));
    }

    let estimator = WelchEstimator::new(quotes.nrows())?;

    let assets = (0..quotes.ncols())
        .into_par_iter()
        .map(|a| {
            let column: Vec<f64> = quotes.column(a).iter().copied().collect();
            let spectrum = estimator.estimate(&column)?;

            let total: f64 = spectrum.density.iter().sum();
            let normalized: Vec<f64> = spectrum.density.iter().map(|d| d / total).collect();
            if normalized.iter().any(|e| e.is_nan()) {
                return Err(AnalysisError::InvalidData(format!(
                    "Normalized power spectrum of asset {} contains NaNs",
                    a
                )));
            }

            let (frequencies, energies) = spectrum
                .frequencies
                .iter()
                .zip(normalized.iter())
                .filter(|(_, e)| **e > threshold)
                .map(|(f, e)| (*f, *e))
                .unzip();

            Ok(SpectralComponents {
                frequencies,
                energies,
            })
        })
        .collect::<AnalysisResult<Vec<_>>>()?;

    if assets.iter().any(|c| c.is_empty()) {
        return Err(AnalysisError::InsufficientData(format!(
            "Spectral components were not found for all assets, please try again with a lower spectral energy threshold than {}",
            threshold
        )));
    }

    debug!(
        "Retained {} spectral components across {} assets",
        assets.iter().map(|c| c.len()).sum::<usize>(),
        assets.len()
    );

    Ok(SpectralDecomposition { assets })
}

/// Rebuild a periodic signal on `x_axis` from a decomposition of `quotes`.
///
/// Each asset's averaged sine mixture is scaled by the population std and
/// offset by the mean of the `window` raw quotes ending at `min(x, T - 1)`.
pub fn periodic_signal(
    quotes: &DMatrix<f64>,
    x_axis: &[f64],
    decomposition: &SpectralDecomposition,
    window: usize,
) -> AnalysisResult<DMatrix<f64>> {
    if decomposition.n_assets() != quotes.ncols() {
        return Err(AnalysisError::InvalidData(format!(
            "Decomposition covers {} assets but the quotes hold {}",
            decomposition.n_assets(),
            quotes.ncols()
        )));
    }
    if quotes.nrows() == 0 || window == 0 {
        return Err(AnalysisError::InsufficientData(
            "Cannot rebuild a periodic signal without quotes".to_string(),
        ));
    }

    let last = quotes.nrows() - 1;
    let mut signal = DMatrix::zeros(x_axis.len(), quotes.ncols());

    for (a, components) in decomposition.assets.iter().enumerate() {
        let column: Vec<f64> = quotes.column(a).iter().copied().collect();
        for (row, &x) in x_axis.iter().enumerate() {
            let end = (x.max(0.0).floor() as usize).min(last);
            let trailing = &column[(end + 1).saturating_sub(window)..=end];
            signal[(row, a)] = population_std(trailing) * components.wave_at(x) + mean(trailing);
        }
    }

    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(len: usize, period: f64, amplitude: f64, offset: f64) -> Vec<f64> {
        (0..len)
            .map(|t| offset + amplitude * (2.0 * PI * t as f64 / period).sin())
            .collect()
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(4);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[3], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_welch_segmentation() {
        let estimator = WelchEstimator::new(600).unwrap();
        assert_eq!(estimator.segment_len(), 256);
        let freqs = estimator.frequencies();
        assert_eq!(freqs.len(), 129);
        assert_relative_eq!(freqs[128], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_welch_peak_at_signal_frequency() {
        let signal = sine(512, 16.0, 1.0, 0.0);
        let estimator = WelchEstimator::new(signal.len()).unwrap();
        let spectrum = estimator.estimate(&signal).unwrap();

        let peak = spectrum
            .density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        assert_relative_eq!(spectrum.frequencies[peak], 1.0 / 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_welch_density_is_non_negative() {
        let signal: Vec<f64> = (0..256)
            .map(|t| if t % 2 == 0 { 1.0 } else { -1.0 } + (t as f64 * 0.37).sin())
            .collect();
        let estimator = WelchEstimator::new(signal.len()).unwrap();
        let spectrum = estimator.estimate(&signal).unwrap();
        assert!(spectrum.density.iter().all(|d| d.is_finite() && *d >= 0.0));
    }

    #[test]
    fn test_decomposition_keeps_dominant_frequency() {
        let a = sine(256, 32.0, 2.0, 50.0);
        let b = sine(256, 8.0, 1.0, 20.0);
        let quotes = DMatrix::from_fn(256, 2, |t, c| if c == 0 { a[t] } else { b[t] });

        let decomposition = spectral_decomposition(&quotes, 0.05).unwrap();
        assert_eq!(decomposition.n_assets(), 2);

        let energy_sum: f64 = decomposition.assets[0].energies.iter().sum();
        assert!(energy_sum <= 1.0 + 1e-9);
        assert!(decomposition.assets[0]
            .frequencies
            .iter()
            .any(|f| (f - 1.0 / 32.0).abs() < 1e-12));
        assert!(decomposition.assets[1]
            .frequencies
            .iter()
            .any(|f| (f - 1.0 / 8.0).abs() < 1e-12));
    }

    #[test]
    fn test_decomposition_rejects_nans() {
        let mut quotes = DMatrix::from_element(16, 1, 1.0);
        quotes[(3, 0)] = f64::NAN;
        assert!(matches!(
            spectral_decomposition(&quotes, 0.001),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_high_threshold_asks_for_lower_threshold() {
        let a = sine(128, 16.0, 1.0, 10.0);
        let quotes = DMatrix::from_column_slice(128, 1, &a);
        let err = spectral_decomposition(&quotes, 0.999).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
        assert!(err.to_string().contains("lower"));
    }

    #[test]
    fn test_periodic_signal_offsets_by_trailing_mean() {
        let quotes = DMatrix::from_column_slice(4, 1, &[10.0, 10.0, 10.0, 10.0]);
        let decomposition = SpectralDecomposition {
            assets: vec![SpectralComponents {
                frequencies: vec![0.25],
                energies: vec![1.0],
            }],
        };
        let signal = periodic_signal(&quotes, &[0.0, 1.0, 6.0], &decomposition, 2).unwrap();
        // Flat quotes have no spread, so only the offset remains.
        for row in 0..3 {
            assert_relative_eq!(signal[(row, 0)], 10.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_periodic_signal_checks_asset_count() {
        let quotes = DMatrix::from_element(8, 2, 1.0);
        let decomposition = SpectralDecomposition { assets: vec![] };
        assert!(matches!(
            periodic_signal(&quotes, &[0.0], &decomposition, 3),
            Err(AnalysisError::InvalidData(_))
        ));
    }
}
