use std::env;
use std::path::PathBuf;

use analysis_core::DateRange;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use forecasting::{ForecasterConfig, SmootherConfig};
use quant_analysis::AnalyzerConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Input
    pub quotes_file: PathBuf,
    pub symbols: Vec<String>, // empty = every symbol in the file except the risk-free one
    pub date_range: DateRange,

    // Analysis
    pub analyzer: AnalyzerConfig,
    pub include_periodicity: bool,

    // Forecasting
    pub smoother: SmootherConfig,
    pub forecaster: ForecasterConfig,
    pub backtest_window: usize,
    pub backtest_step: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let start: NaiveDate = env::var("ANALYZER_START_DATE")
            .unwrap_or_else(|_| "2000-01-01".to_string())
            .parse()
            .context("ANALYZER_START_DATE must be YYYY-MM-DD")?;
        let end: Option<NaiveDate> = match env::var("ANALYZER_END_DATE") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse()
                    .context("ANALYZER_END_DATE must be YYYY-MM-DD")?,
            ),
            _ => None,
        };

        let config = Self {
            quotes_file: env::var("QUOTES_FILE")
                .unwrap_or_else(|_| "quotes.json".to_string())
                .into(),
            symbols: env::var("ANALYZER_SYMBOLS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            date_range: DateRange::new(start, end)?,

            analyzer: AnalyzerConfig {
                quote_channel: env::var("ANALYZER_QUOTE_CHANNEL")
                    .unwrap_or_else(|_| "Close".to_string())
                    .parse()?,
                adjust_prices: env::var("ANALYZER_ADJUST_PRICES")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                risk_free_symbol: env::var("ANALYZER_RISK_FREE_SYMBOL")
                    .unwrap_or_else(|_| "^IRX".to_string()),
                histogram_bins: env::var("ANALYZER_HISTOGRAM_BINS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                spectral_energy_threshold: env::var("ANALYZER_SPECTRAL_THRESHOLD")
                    .unwrap_or_else(|_| "0.001".to_string())
                    .parse()?,
                trend_period_length: env::var("ANALYZER_TREND_PERIOD")
                    .unwrap_or_else(|_| "22".to_string())
                    .parse()?,
            },
            include_periodicity: env::var("ANALYZER_PERIODICITY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            smoother: SmootherConfig {
                method: env::var("FORECAST_SMOOTHER")
                    .unwrap_or_else(|_| "avg".to_string()),
                length: env::var("FORECAST_SMOOTHER_LENGTH")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                alpha: env::var("FORECAST_SMOOTHER_ALPHA")
                    .unwrap_or_else(|_| "0.6".to_string())
                    .parse()?,
                optimize: env::var("FORECAST_SMOOTHER_OPTIMIZE")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
                trend: env::var("FORECAST_SMOOTHER_TREND").ok(),
                poly_degree: env::var("FORECAST_SMOOTHER_POLY_DEGREE")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
            },
            forecaster: ForecasterConfig {
                method: env::var("FORECAST_METHOD")
                    .unwrap_or_else(|_| "smoother".to_string()),
                forecast_horizon: env::var("FORECAST_HORIZON")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                arima_orders: parse_order3(
                    "FORECAST_ARIMA_ORDER",
                    &env::var("FORECAST_ARIMA_ORDER").unwrap_or_else(|_| "1,0,1".to_string()),
                )?,
                arima_prediction_type: env::var("FORECAST_ARIMA_PREDICTION_TYPE")
                    .unwrap_or_else(|_| "levels".to_string()),
                sarimax_orders: parse_order3(
                    "FORECAST_SARIMAX_ORDER",
                    &env::var("FORECAST_SARIMAX_ORDER").unwrap_or_else(|_| "1,0,1".to_string()),
                )?,
                sarimax_seasonal_order: parse_order4(
                    "FORECAST_SARIMAX_SEASONAL_ORDER",
                    &env::var("FORECAST_SARIMAX_SEASONAL_ORDER")
                        .unwrap_or_else(|_| "0,0,0,0".to_string()),
                )?,
                remove_mean: env::var("FORECAST_REMOVE_MEAN")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
            },
            backtest_window: env::var("FORECAST_BACKTEST_WINDOW")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            backtest_step: env::var("FORECAST_BACKTEST_STEP")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        if self.forecaster.forecast_horizon == 0 {
            bail!("FORECAST_HORIZON must be at least 1");
        }
        if self.backtest_window == 0 || self.backtest_step == 0 {
            bail!(
                "FORECAST_BACKTEST_WINDOW and FORECAST_BACKTEST_STEP must be positive, got {} and {}",
                self.backtest_window,
                self.backtest_step
            );
        }
        if self
            .symbols
            .iter()
            .any(|s| s == &self.analyzer.risk_free_symbol)
        {
            bail!(
                "ANALYZER_SYMBOLS must not contain the risk-free symbol {}",
                self.analyzer.risk_free_symbol
            );
        }
        Ok(())
    }
}

fn parse_orders(name: &str, value: &str, expected: usize) -> Result<Vec<usize>> {
    let parts = value
        .split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{} must be a comma-separated list of integers", name))?;
    if parts.len() != expected {
        bail!("{} needs {} values, got '{}'", name, expected, value);
    }
    Ok(parts)
}

fn parse_order3(name: &str, value: &str) -> Result<(usize, usize, usize)> {
    let p = parse_orders(name, value, 3)?;
    Ok((p[0], p[1], p[2]))
}

fn parse_order4(name: &str, value: &str) -> Result<(usize, usize, usize, usize)> {
    let p = parse_orders(name, value, 4)?;
    Ok((p[0], p[1], p[2], p[3]))
}
