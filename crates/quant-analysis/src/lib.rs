pub mod analyzer;
pub mod interpolation;
pub mod regression;
pub mod spectral;

pub use analyzer::{
    compute_returns, histogram, AnalysisReport, Analyzer, AnalyzerConfig, AssetMetrics,
    ReturnsHistogram, TRADING_DAYS_PER_YEAR,
};
pub use interpolation::{align_to_length, fill_gaps, InterpolationKind, Interpolator};
pub use regression::{linear_regression, LinearFit};
pub use spectral::{
    periodic_signal, spectral_decomposition, PowerSpectrum, SpectralComponents,
    SpectralDecomposition, WelchEstimator,
};
