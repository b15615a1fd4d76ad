use std::collections::BTreeMap;

use analysis_core::AnalysisError;
use anyhow::{Context, Result};
use forecasting::{rolling_forecast, BacktestSummary, Forecaster};
use quant_analysis::{AnalysisReport, Analyzer};
use serde::Serialize;

mod config;
mod provider;

use config::AppConfig;
use provider::QuoteFileProvider;

#[derive(Debug, Serialize)]
struct SymbolForecast {
    description: String,
    forecast: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backtest: Option<BacktestSummary>,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    symbols: Vec<String>,
    report: AnalysisReport,
    forecasts: BTreeMap<String, SymbolForecast>,
}

fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let default_filter = "series_analyzer=info,quant_analysis=info,forecasting=info";
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
            )
            .init();
    }

    // 2. Configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Quote file: {}", config.quotes_file.display());
    tracing::info!("  Channel: {}", config.analyzer.quote_channel);
    tracing::info!("  Risk-free symbol: {}", config.analyzer.risk_free_symbol);
    tracing::info!("  Trend period: {}", config.analyzer.trend_period_length);
    tracing::info!(
        "  Forecast: {} (horizon {})",
        config.forecaster.method,
        config.forecaster.forecast_horizon
    );

    // 3. Data
    let provider = QuoteFileProvider::from_path(&config.quotes_file)?;
    let symbols = if config.symbols.is_empty() {
        provider
            .symbols()
            .into_iter()
            .filter(|s| s != &config.analyzer.risk_free_symbol)
            .collect()
    } else {
        config.symbols.clone()
    };

    // 4. Analysis
    let analyzer = Analyzer::from_provider(
        &provider,
        &symbols,
        &config.date_range,
        config.analyzer.clone(),
    )
    .context("Failed to build the analyzer")?;
    let report = analyzer.analyze().context("Analysis failed")?;

    if config.include_periodicity {
        match analyzer.analyze_periodicity(analyzer.quotes()) {
            Ok(signal) => tracing::info!(
                "Periodic signal generated: {} observations x {} assets",
                signal.nrows(),
                signal.ncols()
            ),
            Err(e) => tracing::warn!("Periodicity analysis skipped: {}", e),
        }
    }

    // 5. Forecasts and rolling backtest per asset
    let mut forecasts = BTreeMap::new();
    for (i, symbol) in analyzer.symbols().iter().enumerate() {
        let series: Vec<f64> = analyzer.quotes().column(i).iter().copied().collect();
        let mut forecaster = build_forecaster(&config)?;

        let backtest = match rolling_forecast(
            &mut forecaster,
            &series,
            config.backtest_window,
            config.backtest_step,
        ) {
            Ok(summary) => Some(summary),
            Err(AnalysisError::InsufficientData(msg)) => {
                tracing::warn!("{}: backtest skipped: {}", symbol, msg);
                None
            }
            Err(e) => return Err(e).with_context(|| format!("Backtest failed for {}", symbol)),
        };

        forecaster.reset();
        let forecast = forecaster
            .forecast(&series)
            .with_context(|| format!("Forecast failed for {}", symbol))?;

        forecasts.insert(
            symbol.clone(),
            SymbolForecast {
                description: forecaster.description(),
                forecast,
                backtest,
            },
        );
    }

    let output = RunOutput {
        symbols: analyzer.symbols().to_vec(),
        report,
        forecasts,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("Processed {} assets", output.symbols.len());
    Ok(())
}

fn build_forecaster(config: &AppConfig) -> Result<Forecaster> {
    let smoother = if config.forecaster.method.trim().eq_ignore_ascii_case("smoother") {
        Some(config.smoother.build()?)
    } else {
        None
    };
    Ok(config.forecaster.clone().build(smoother)?)
}
