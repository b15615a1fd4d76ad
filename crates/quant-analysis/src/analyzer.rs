use analysis_core::stats::{mean, population_std, simple_returns};
use analysis_core::{
    AnalysisError, AnalysisResult, DateRange, Fundamentals, QuoteChannel, QuoteProvider,
};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

use crate::interpolation::{align_to_length, fill_gaps, InterpolationKind};
use crate::regression::{linear_regression, LinearFit};
use crate::spectral::{periodic_signal, spectral_decomposition, SpectralDecomposition};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 255.0;

/// Converts an annualized percentage yield into a daily fraction.
const RISK_FREE_SCALE: f64 = 100.0 * TRADING_DAYS_PER_YEAR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub quote_channel: QuoteChannel,
    pub adjust_prices: bool,
    pub risk_free_symbol: String,
    pub histogram_bins: usize,
    /// Minimum normalized energy (0..1) for a spectral component to be kept.
    pub spectral_energy_threshold: f64,
    /// Trailing window, in observations, for trend statistics.
    pub trend_period_length: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            quote_channel: QuoteChannel::Close,
            adjust_prices: true,
            risk_free_symbol: "^IRX".to_string(),
            histogram_bins: 10,
            spectral_energy_threshold: 0.001,
            trend_period_length: 22,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.histogram_bins == 0 {
            return Err(AnalysisError::Config(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.trend_period_length < 2 {
            return Err(AnalysisError::Config(format!(
                "trend_period_length must be at least 2, got {}",
                self.trend_period_length
            )));
        }
        if !(0.0..1.0).contains(&self.spectral_energy_threshold) {
            return Err(AnalysisError::Config(format!(
                "spectral_energy_threshold must lie in [0, 1), got {}",
                self.spectral_energy_threshold
            )));
        }
        if self.risk_free_symbol.trim().is_empty() {
            return Err(AnalysisError::Config(
                "risk_free_symbol must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalized histogram of one asset's returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsHistogram {
    /// Bin edges, one more than the number of bins.
    pub edges: Vec<f64>,
    /// Share of the returns falling in each bin; sums to 1.
    pub counts: Vec<f64>,
}

/// Aggregate output of [`Analyzer::analyze`], one entry per asset in every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    pub sr: Vec<f64>,
    pub mean: Vec<f64>,
    pub recent_trend_mean: Vec<f64>,
    pub recent_trend_std: Vec<f64>,
    pub linear_regression_fit: Vec<LinearFit>,
    pub top_k: Vec<usize>,
    pub bottom_k: Vec<usize>,
}

/// Metrics of a single asset extracted from an [`AnalysisReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub symbol: Option<String>,
    pub sr: f64,
    pub mean: f64,
    pub recent_trend_mean: f64,
    pub recent_trend_std: f64,
    pub linear_regression_fit: LinearFit,
    pub top_k: usize,
    pub bottom_k: usize,
}

impl AnalysisReport {
    pub fn n_assets(&self) -> usize {
        self.sr.len()
    }

    pub fn asset_metrics(&self, index: usize) -> Option<AssetMetrics> {
        if index >= self.n_assets() {
            return None;
        }
        Some(AssetMetrics {
            symbol: self.symbols.get(index).cloned(),
            sr: self.sr[index],
            mean: self.mean[index],
            recent_trend_mean: self.recent_trend_mean[index],
            recent_trend_std: self.recent_trend_std[index],
            linear_regression_fit: self.linear_regression_fit[index],
            top_k: self.top_k[index],
            bottom_k: self.bottom_k[index],
        })
    }
}

/// Statistical analysis over a (T, N) quote matrix and a risk-free series.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    fundamentals: Vec<Fundamentals>,
    quotes: DMatrix<f64>,
    returns: DMatrix<f64>,
    cumulative_returns: Vec<f64>,
    risk_free_returns: Vec<f64>,
}

impl Analyzer {
    /// Retrieve the assets and the risk-free reference from `provider`.
    pub fn from_provider<P: QuoteProvider + ?Sized>(
        provider: &P,
        symbols: &[String],
        range: &DateRange,
        config: AnalyzerConfig,
    ) -> AnalysisResult<Self> {
        config.validate()?;

        let channel = config.quote_channel;
        let data = provider.get_multiple_assets(symbols, range, &[channel], config.adjust_prices)?;
        let series = data.channel(channel)?.to_vec();

        let (risk_free, _) = provider.get_asset_data(
            &config.risk_free_symbol,
            range,
            &[channel],
            config.adjust_prices,
        )?;
        let risk_free = risk_free.channel(channel)?.to_vec();

        let mut analyzer = Self::from_series(data.symbols, &series, &risk_free, config)?;
        analyzer.dates = data.dates;
        analyzer.fundamentals = data.fundamentals;
        Ok(analyzer)
    }

    /// Build from per-asset quote series of equal length and a raw risk-free
    /// series quoted as an annualized percentage.
    pub fn from_series(
        symbols: Vec<String>,
        series: &[Vec<f64>],
        risk_free: &[f64],
        config: AnalyzerConfig,
    ) -> AnalysisResult<Self> {
        config.validate()?;

        if series.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "At least one asset is required".to_string(),
            ));
        }
        if !symbols.is_empty() && symbols.len() != series.len() {
            return Err(AnalysisError::InvalidData(format!(
                "{} symbols given for {} series",
                symbols.len(),
                series.len()
            )));
        }

        let quotes = assemble_quotes(series)?;
        let risk_free_returns = risk_free
            .iter()
            .skip(1)
            .map(|v| v / RISK_FREE_SCALE)
            .collect();

        let mut analyzer = Self {
            config,
            symbols,
            dates: Vec::new(),
            fundamentals: Vec::new(),
            quotes: DMatrix::zeros(0, 0),
            returns: DMatrix::zeros(0, 0),
            cumulative_returns: Vec::new(),
            risk_free_returns,
        };
        analyzer.set_quotes(quotes);

        info!(
            "Analyzer initialized with {} assets over {} observations",
            analyzer.n_assets(),
            analyzer.quotes.nrows()
        );

        Ok(analyzer)
    }

    fn set_quotes(&mut self, quotes: DMatrix<f64>) {
        let returns = compute_returns(&quotes);
        self.cumulative_returns = returns
            .column_iter()
            .map(|col| col.iter().map(|r| 1.0 + r).product())
            .collect();
        self.returns = returns;
        self.quotes = quotes;
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn n_assets(&self) -> usize {
        self.quotes.ncols()
    }

    /// Symbols actually analyzed, in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn fundamentals(&self) -> &[Fundamentals] {
        &self.fundamentals
    }

    pub fn quotes(&self) -> &DMatrix<f64> {
        &self.quotes
    }

    /// Simple returns, shape (T - 1, N).
    pub fn returns(&self) -> &DMatrix<f64> {
        &self.returns
    }

    pub fn cumulative_returns(&self) -> &[f64] {
        &self.cumulative_returns
    }

    /// Daily risk-free rates as stored, before alignment.
    pub fn risk_free_returns(&self) -> &[f64] {
        &self.risk_free_returns
    }

    /// Calculate the Sharpe ratio of every asset.
    ///
    /// Excess returns are compounded over time, and the final compounded value
    /// is divided by the population std of the compounded path. A path without
    /// variance yields an infinite ratio carrying the sign of its final value.
    pub fn sharpe_ratio(&self) -> AnalysisResult<Vec<f64>> {
        let horizon = self.returns.nrows();
        let risk_free = if self.risk_free_returns.len() == horizon
            && !self.risk_free_returns.iter().any(|v| v.is_nan())
        {
            self.risk_free_returns.clone()
        } else {
            debug!(
                "Aligning {} risk-free observations to {} returns",
                self.risk_free_returns.len(),
                horizon
            );
            align_to_length(&self.risk_free_returns, horizon, InterpolationKind::Previous)?
        };

        let ratios = self
            .returns
            .column_iter()
            .enumerate()
            .map(|(a, col)| {
                let path: Vec<f64> = col
                    .iter()
                    .zip(risk_free.iter())
                    .scan(1.0, |acc, (r, rf)| {
                        *acc *= 1.0 + r - rf;
                        Some(*acc)
                    })
                    .collect();

                let last = path.last().copied().unwrap_or(1.0);
                let risk = population_std(&path);
                if risk == 0.0 {
                    warn!(
                        "Excess returns of asset {} have zero variance, Sharpe ratio is infinite",
                        self.label(a)
                    );
                    f64::INFINITY.copysign(last)
                } else {
                    last / risk
                }
            })
            .collect();

        Ok(ratios)
    }

    /// Shorthand for [`Analyzer::sharpe_ratio`].
    pub fn sr(&self) -> AnalysisResult<Vec<f64>> {
        self.sharpe_ratio()
    }

    /// Calculate the mean daily return of every asset, annualized.
    pub fn mean_annual_return(&self) -> Vec<f64> {
        self.returns
            .column_iter()
            .map(|col| col.iter().mean() * TRADING_DAYS_PER_YEAR)
            .collect()
    }

    /// Histogram of every asset's returns over `histogram_bins` equal-width bins.
    pub fn returns_histogram(&self) -> AnalysisResult<Vec<ReturnsHistogram>> {
        self.returns
            .column_iter()
            .map(|col| {
                let values: Vec<f64> = col.iter().copied().collect();
                histogram(&values, self.config.histogram_bins)
            })
            .collect()
    }

    /// Spectral components of every column of `quotes`.
    pub fn spectral_components(&self, quotes: &DMatrix<f64>) -> AnalysisResult<SpectralDecomposition> {
        spectral_decomposition(quotes, self.config.spectral_energy_threshold)
    }

    /// Periodic signal at `x_axis` built from `decomposition`, on the scale of `quotes`.
    pub fn generate_periodic_signal(
        &self,
        quotes: &DMatrix<f64>,
        x_axis: &[f64],
        decomposition: &SpectralDecomposition,
    ) -> AnalysisResult<DMatrix<f64>> {
        periodic_signal(quotes, x_axis, decomposition, self.config.trend_period_length)
    }

    /// Decompose `quotes` and rebuild the periodic signal over its own time axis.
    ///
    /// Best-effort only, and therefore left out of [`Analyzer::analyze`].
    pub fn analyze_periodicity(&self, quotes: &DMatrix<f64>) -> AnalysisResult<DMatrix<f64>> {
        let decomposition = self.spectral_components(quotes)?;
        let x_axis: Vec<f64> = (0..quotes.nrows()).map(|t| t as f64).collect();
        self.generate_periodic_signal(quotes, &x_axis, &decomposition)
    }

    /// Mean and population std of the returns over the most recent
    /// `trend_period_length + 1` observations of `quotes`.
    pub fn returns_emerging_trend(
        &self,
        quotes: &DMatrix<f64>,
    ) -> AnalysisResult<(Vec<f64>, Vec<f64>)> {
        let rows = quotes.nrows();
        if rows < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "Need at least 2 observations for trend statistics, got {}",
                rows
            )));
        }

        let window = (self.config.trend_period_length + 1).min(rows);
        let recent = quotes.rows(rows - window, window);

        let (means, stds) = recent
            .column_iter()
            .map(|col| {
                let values: Vec<f64> = col.iter().copied().collect();
                let returns = simple_returns(&values);
                (mean(&returns), population_std(&returns))
            })
            .unzip();

        Ok((means, stds))
    }

    /// Total return over the most recent `trend_period_length - 1` quotes.
    pub fn overall_period_return(&self) -> Vec<f64> {
        let rows = self.quotes.nrows();
        let window = (self.config.trend_period_length - 1).min(rows);
        let first = rows - window;

        self.quotes
            .column_iter()
            .map(|col| col[rows - 1] / col[first] - 1.0)
            .collect()
    }

    /// OLS fit of the last `trend_period_length` quotes of every asset
    /// against `0..trend_period_length`.
    pub fn linear_regression_fit(&self) -> AnalysisResult<Vec<LinearFit>> {
        let period = self.config.trend_period_length;
        let rows = self.quotes.nrows();
        if rows < period {
            return Err(AnalysisError::InsufficientData(format!(
                "Need {} observations for the regression window, got {}",
                period, rows
            )));
        }

        let x: Vec<f64> = (0..period).map(|i| i as f64).collect();
        self.quotes
            .column_iter()
            .map(|col| {
                let y: Vec<f64> = col.iter().skip(rows - period).copied().collect();
                linear_regression(&x, &y)
            })
            .collect()
    }

    /// Rank of every asset by cumulative return, 0 being the best.
    pub fn top_k_performers(&self) -> Vec<usize> {
        let mut order = self.ascending_order();
        order.reverse();
        inverse_permutation(&order)
    }

    /// Rank of every asset by cumulative return, 0 being the worst.
    pub fn bottom_k_performers(&self) -> Vec<usize> {
        inverse_permutation(&self.ascending_order())
    }

    fn ascending_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.cumulative_returns.len()).collect();
        order.sort_by(|&a, &b| {
            self.cumulative_returns[a].total_cmp(&self.cumulative_returns[b])
        });
        order
    }

    /// Run every aggregate analysis over the stored quotes.
    pub fn analyze(&self) -> AnalysisResult<AnalysisReport> {
        let sr = self.sharpe_ratio()?;
        let mean = self.mean_annual_return();
        let (recent_trend_mean, recent_trend_std) = self.returns_emerging_trend(&self.quotes)?;
        let linear_regression_fit = self.linear_regression_fit()?;

        Ok(AnalysisReport {
            symbols: self.symbols.clone(),
            sr,
            mean,
            recent_trend_mean,
            recent_trend_std,
            linear_regression_fit,
            top_k: self.top_k_performers(),
            bottom_k: self.bottom_k_performers(),
        })
    }

    /// Replace the quote matrix and analyze it.
    ///
    /// The new matrix must cover the same assets; gaps are filled the same way
    /// as at construction.
    pub fn analyze_quotes(&mut self, quotes: DMatrix<f64>) -> AnalysisResult<AnalysisReport> {
        if quotes.ncols() != self.n_assets() {
            return Err(AnalysisError::InvalidData(format!(
                "Expected quotes for {} assets, got {}",
                self.n_assets(),
                quotes.ncols()
            )));
        }

        let series: Vec<Vec<f64>> = quotes
            .column_iter()
            .map(|col| col.iter().copied().collect())
            .collect();
        let quotes = assemble_quotes(&series)?;
        self.set_quotes(quotes);
        if self.dates.len() != self.quotes.nrows() {
            self.dates.clear();
        }

        self.analyze()
    }

    fn label(&self, index: usize) -> String {
        self.symbols
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}

/// Fill gaps per asset and stack the series as columns of a (T, N) matrix.
fn assemble_quotes(series: &[Vec<f64>]) -> AnalysisResult<DMatrix<f64>> {
    let rows = series.first().map_or(0, |s| s.len());
    if let Some(bad) = series.iter().find(|s| s.len() != rows) {
        return Err(AnalysisError::InvalidData(format!(
            "Quote series must share one length, got {} and {}",
            rows,
            bad.len()
        )));
    }
    if rows < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Need at least 2 observations per asset, got {}",
            rows
        )));
    }

    let filled = series
        .iter()
        .map(|s| fill_gaps(s, InterpolationKind::Previous))
        .collect::<AnalysisResult<Vec<_>>>()?;

    Ok(DMatrix::from_fn(rows, filled.len(), |t, a| filled[a][t]))
}

/// Calculate simple returns down every column.
pub fn compute_returns(quotes: &DMatrix<f64>) -> DMatrix<f64> {
    let rows = quotes.nrows().saturating_sub(1);
    DMatrix::from_fn(rows, quotes.ncols(), |t, a| {
        (quotes[(t + 1, a)] - quotes[(t, a)]) / quotes[(t, a)]
    })
}

/// Equal-width histogram over `[min, max]` with counts normalized to sum to 1.
///
/// The last bin is closed on the right. A degenerate range is widened by 0.5
/// on each side.
pub fn histogram(values: &[f64], bins: usize) -> AnalysisResult<ReturnsHistogram> {
    if values.is_empty() || bins == 0 {
        return Err(AnalysisError::InsufficientData(
            "Histogram needs at least one value and one bin".to_string(),
        ));
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return Err(AnalysisError::InvalidData(
            "Histogram range is not finite".to_string(),
        ));
    }
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0.0; bins];
    for &v in values {
        let bin = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[bin] += 1.0;
    }
    let total = values.len() as f64;
    for c in counts.iter_mut() {
        *c /= total;
    }

    Ok(ReturnsHistogram { edges, counts })
}

fn inverse_permutation(order: &[usize]) -> Vec<usize> {
    let mut ranks = vec![0; order.len()];
    for (rank, &asset) in order.iter().enumerate() {
        ranks[asset] = rank;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn analyzer(series: Vec<Vec<f64>>, risk_free: Vec<f64>, period: usize) -> Analyzer {
        let config = AnalyzerConfig {
            trend_period_length: period,
            ..Default::default()
        };
        Analyzer::from_series(Vec::new(), &series, &risk_free, config).unwrap()
    }

    #[test]
    fn test_returns_scenario() {
        let a = analyzer(vec![vec![100.0, 102.0, 101.0, 105.0, 110.0]], vec![0.0; 5], 3);
        let r = a.returns();
        assert_eq!(r.shape(), (4, 1));
        assert_relative_eq!(r[(0, 0)], 0.02, epsilon = 1e-12);
        assert_relative_eq!(r[(1, 0)], -0.00980392, epsilon = 1e-6);
        assert_relative_eq!(r[(2, 0)], 0.03960396, epsilon = 1e-6);
        assert_relative_eq!(r[(3, 0)], 0.04761905, epsilon = 1e-6);
        assert_relative_eq!(a.cumulative_returns()[0], 1.10, epsilon = 1e-12);
    }

    #[test]
    fn test_gaps_filled_at_construction() {
        let a = analyzer(vec![vec![f64::NAN, 10.0, f64::NAN, 12.0]], vec![0.0; 4], 2);
        let q = a.quotes();
        assert_eq!(q.column(0).iter().copied().collect::<Vec<_>>(), vec![10.0, 10.0, 10.0, 12.0]);
    }

    #[test]
    fn test_zero_variance_sharpe_is_infinite() {
        let a = analyzer(vec![vec![50.0, 50.0, 50.0, 50.0]], vec![0.0; 4], 2);
        let sr = a.sharpe_ratio().unwrap();
        assert!(sr[0].is_infinite() && sr[0] > 0.0);
    }

    #[test]
    fn test_sharpe_ratio_matches_hand_computation() {
        let a = analyzer(vec![vec![100.0, 110.0, 99.0]], vec![0.0; 3], 2);
        // Path of compounded returns: 1.1, 0.99.
        let expected = 0.99 / 0.055;
        assert_relative_eq!(a.sharpe_ratio().unwrap()[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_risk_free_is_aligned_when_short() {
        // Raw rates of 2.55% annualized give 0.0001 daily after dropping the first.
        let a = analyzer(vec![vec![100.0, 101.0, 102.0, 103.0, 104.0]], vec![2.55, 2.55], 2);
        assert_eq!(a.risk_free_returns().len(), 1);
        assert_relative_eq!(a.risk_free_returns()[0], 0.0001, epsilon = 1e-15);
        assert_eq!(a.sharpe_ratio().unwrap().len(), 1);
    }

    #[test]
    fn test_mean_annual_return() {
        let a = analyzer(vec![vec![100.0, 101.0, 102.01]], vec![0.0; 3], 2);
        assert_relative_eq!(a.mean_annual_return()[0], 0.01 * 255.0, epsilon = 1e-9);
    }

    #[test]
    fn test_histogram_counts_sum_to_one() {
        let h = histogram(&[0.0, 0.1, 0.2, 0.3, 0.4, 1.0], 5).unwrap();
        assert_eq!(h.edges.len(), 6);
        assert_relative_eq!(h.edges[0], 0.0);
        assert_relative_eq!(h.edges[5], 1.0);
        assert_relative_eq!(h.counts.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        // The maximum lands in the closed last bin.
        assert_relative_eq!(h.counts[4], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let h = histogram(&[0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(h.edges, vec![-0.5, 0.0, 0.5]);
        assert_eq!(h.counts, vec![0.0, 1.0]);
    }

    #[test]
    fn test_overall_period_return_uses_recent_window() {
        let a = analyzer(vec![vec![10.0, 20.0, 40.0, 50.0, 60.0]], vec![0.0; 5], 4);
        // Last three quotes: 40 -> 60.
        assert_relative_eq!(a.overall_period_return()[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_emerging_trend_window() {
        let a = analyzer(vec![vec![1.0, 100.0, 100.0, 110.0, 121.0]], vec![0.0; 5], 2);
        let (mean, std) = a.returns_emerging_trend(a.quotes()).unwrap();
        assert_relative_eq!(mean[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(std[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_regression_needs_full_window() {
        let a = analyzer(vec![vec![1.0, 2.0, 3.0]], vec![0.0; 3], 5);
        assert!(matches!(
            a.linear_regression_fit(),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_ranks_are_mirror_images() {
        let a = analyzer(
            vec![
                vec![10.0, 11.0],
                vec![10.0, 9.0],
                vec![10.0, 15.0],
                vec![10.0, 10.0],
            ],
            vec![0.0; 2],
            2,
        );
        let top = a.top_k_performers();
        let bottom = a.bottom_k_performers();
        assert_eq!(top, vec![1, 3, 0, 2]);
        assert_eq!(bottom, vec![2, 0, 3, 1]);
        for (t, b) in top.iter().zip(bottom.iter()) {
            assert_eq!(t + b, 3);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalyzerConfig {
            trend_period_length: 1,
            ..Default::default()
        };
        let err = Analyzer::from_series(Vec::new(), &[vec![1.0, 2.0]], &[0.0, 0.0], config)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_analyze_quotes_rejects_other_asset_count() {
        let mut a = analyzer(vec![vec![1.0, 2.0, 3.0]], vec![0.0; 3], 2);
        let result = a.analyze_quotes(DMatrix::from_element(3, 2, 1.0));
        assert!(matches!(result, Err(AnalysisError::InvalidData(_))));
    }
}
