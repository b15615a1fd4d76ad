use std::fs;
use std::path::Path;

use analysis_core::{
    AnalysisResult, AssetHistory, AssetQuotes, DateRange, Fundamentals, InMemoryQuoteProvider,
    MultiAssetQuotes, QuoteChannel, QuoteProvider,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// On-disk layout: `{ "assets": [AssetHistory, ...] }`.
#[derive(Debug, Deserialize)]
struct QuoteFile {
    assets: Vec<AssetHistory>,
}

/// Quote provider backed by a JSON file loaded once at startup.
pub struct QuoteFileProvider {
    inner: InMemoryQuoteProvider,
}

impl QuoteFileProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read quote file {}", path.display()))?;
        let provider = Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse quote file {}", path.display()))?;
        info!(
            "Loaded {} assets from {}",
            provider.symbols().len(),
            path.display()
        );
        Ok(provider)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: QuoteFile = serde_json::from_str(raw)?;
        Ok(Self {
            inner: InMemoryQuoteProvider::from_histories(file.assets),
        })
    }

    pub fn symbols(&self) -> Vec<String> {
        self.inner.symbols()
    }
}

impl QuoteProvider for QuoteFileProvider {
    fn get_asset_data(
        &self,
        symbol: &str,
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust: bool,
    ) -> AnalysisResult<(AssetQuotes, Fundamentals)> {
        self.inner.get_asset_data(symbol, range, channels, adjust)
    }

    fn get_multiple_assets(
        &self,
        symbols: &[String],
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust: bool,
    ) -> AnalysisResult<MultiAssetQuotes> {
        self.inner.get_multiple_assets(symbols, range, channels, adjust)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
        "assets": [
            {
                "symbol": "ACME",
                "dates": ["2024-01-02", "2024-01-03", "2024-01-04"],
                "channels": { "Close": [10.0, 10.5, 11.0] },
                "fundamentals": { "sector": "Industrials" }
            },
            {
                "symbol": "^IRX",
                "dates": ["2024-01-02", "2024-01-03", "2024-01-04"],
                "channels": { "Close": [5.1, 5.1, 5.2] }
            }
        ]
    }"#;

    #[test]
    fn test_parses_quote_file() {
        let provider = QuoteFileProvider::from_json_str(SAMPLE).unwrap();
        let mut symbols = provider.symbols();
        symbols.sort();
        assert_eq!(symbols, vec!["ACME".to_string(), "^IRX".to_string()]);

        let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), None).unwrap();
        let (quotes, fundamentals) = provider
            .get_asset_data("ACME", &range, &[QuoteChannel::Close], false)
            .unwrap();
        assert_eq!(quotes.channel(QuoteChannel::Close).unwrap(), &[10.5, 11.0]);
        assert_eq!(fundamentals["sector"], "Industrials");
    }

    #[test]
    fn test_rejects_malformed_file() {
        assert!(QuoteFileProvider::from_json_str(r#"{ "assets": 3 }"#).is_err());
    }
}
