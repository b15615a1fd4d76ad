use std::collections::HashMap;

use tracing::{debug, warn};

use crate::stats::median_len;
use crate::{
    AnalysisError, AssetHistory, AssetQuotes, DateRange, Fundamentals, MultiAssetQuotes,
    QuoteChannel, QuoteProvider,
};

/// Quote provider backed by histories held in memory.
///
/// Implements the alignment rules every provider follows: unknown symbols are
/// skipped, the common length is the median of the loaded lengths, shorter
/// assets are dropped and longer ones keep their most recent observations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQuoteProvider {
    assets: HashMap<String, AssetHistory>,
}

impl InMemoryQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_histories(histories: impl IntoIterator<Item = AssetHistory>) -> Self {
        let mut provider = Self::new();
        for history in histories {
            provider.insert(history);
        }
        provider
    }

    pub fn insert(&mut self, history: AssetHistory) {
        self.assets.insert(history.symbol.clone(), history);
    }

    pub fn with_asset(mut self, history: AssetHistory) -> Self {
        self.insert(history);
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.assets.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn load(
        &self,
        symbol: &str,
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust_prices: bool,
    ) -> Result<(AssetQuotes, Fundamentals), AnalysisError> {
        let history = self
            .assets
            .get(symbol)
            .ok_or_else(|| AnalysisError::ProviderError(format!("Unknown symbol {}", symbol)))?;

        let selected: Vec<usize> = history
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| range.contains(**d))
            .map(|(i, _)| i)
            .collect();

        if selected.is_empty() {
            return Err(AnalysisError::ProviderError(format!(
                "No quotes for {} between {} and {}",
                symbol,
                range.start,
                range.end.map_or_else(|| "latest".to_string(), |d| d.to_string())
            )));
        }

        let factors = match (&history.adjustment_factors, adjust_prices) {
            (Some(f), true) => {
                if f.len() != history.dates.len() {
                    return Err(AnalysisError::InvalidData(format!(
                        "{} has {} adjustment factors for {} dates",
                        symbol,
                        f.len(),
                        history.dates.len()
                    )));
                }
                Some(f)
            }
            _ => None,
        };

        let mut quotes = AssetQuotes {
            dates: selected.iter().map(|&i| history.dates[i]).collect(),
            channels: HashMap::with_capacity(channels.len()),
        };

        for &channel in channels {
            let series = history.channels.get(&channel).ok_or_else(|| {
                AnalysisError::ProviderError(format!("{} has no {} channel", symbol, channel))
            })?;
            if series.len() != history.dates.len() {
                return Err(AnalysisError::InvalidData(format!(
                    "{} channel {} has {} values for {} dates",
                    symbol,
                    channel,
                    series.len(),
                    history.dates.len()
                )));
            }

            let values = selected
                .iter()
                .map(|&i| match factors {
                    Some(f) if channel.is_price() => series[i] * f[i],
                    _ => series[i],
                })
                .collect();
            quotes.channels.insert(channel, values);
        }

        Ok((quotes, history.fundamentals.clone()))
    }
}

impl QuoteProvider for InMemoryQuoteProvider {
    fn get_asset_data(
        &self,
        symbol: &str,
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust_prices: bool,
    ) -> Result<(AssetQuotes, Fundamentals), AnalysisError> {
        self.load(symbol, range, channels, adjust_prices)
    }

    fn get_multiple_assets(
        &self,
        symbols: &[String],
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust_prices: bool,
    ) -> Result<MultiAssetQuotes, AnalysisError> {
        let mut loaded = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.load(symbol, range, channels, adjust_prices) {
                Ok((quotes, fundamentals)) => loaded.push((symbol.clone(), quotes, fundamentals)),
                Err(e) => warn!("Could not load the data for {}: {}", symbol, e),
            }
        }

        if loaded.is_empty() {
            return Err(AnalysisError::ProviderError(
                "None of the requested symbols could be loaded".to_string(),
            ));
        }

        let lengths: Vec<usize> = loaded.iter().map(|(_, q, _)| q.len()).collect();
        let valid_len = median_len(&lengths);
        loaded.retain(|(symbol, quotes, _)| {
            let keep = quotes.len() >= valid_len;
            if !keep {
                warn!(
                    "Dropping {}: {} observations, fewer than the common length {}",
                    symbol,
                    quotes.len(),
                    valid_len
                );
            }
            keep
        });

        let tail = |len: usize| len - valid_len..len;
        let first = &loaded[0].1;
        let dates = first.dates[tail(first.len())].to_vec();

        let mut out = MultiAssetQuotes {
            dates,
            channels: HashMap::with_capacity(channels.len()),
            fundamentals: Vec::with_capacity(loaded.len()),
            symbols: Vec::with_capacity(loaded.len()),
        };

        for &channel in channels {
            let mut per_asset = Vec::with_capacity(loaded.len());
            for (_, quotes, _) in &loaded {
                let series = quotes.channel(channel)?;
                per_asset.push(series[tail(series.len())].to_vec());
            }
            out.channels.insert(channel, per_asset);
        }

        for (symbol, _, fundamentals) in loaded {
            out.symbols.push(symbol);
            out.fundamentals.push(fundamentals);
        }

        debug!(
            "Loaded {} of {} requested assets with {} common observations",
            out.symbols.len(),
            symbols.len(),
            valid_len
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn history(symbol: &str, closes: &[f64]) -> AssetHistory {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        AssetHistory {
            symbol: symbol.to_string(),
            dates: (0..closes.len())
                .map(|i| start + Duration::days(i as i64))
                .collect(),
            channels: HashMap::from([(QuoteChannel::Close, closes.to_vec())]),
            adjustment_factors: None,
            fundamentals: Fundamentals::new(),
        }
    }

    fn full_range() -> DateRange {
        DateRange::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), None).unwrap()
    }

    #[test]
    fn test_unknown_symbols_are_dropped() {
        let provider = InMemoryQuoteProvider::new()
            .with_asset(history("AAA", &[1.0, 2.0, 3.0]))
            .with_asset(history("BBB", &[4.0, 5.0, 6.0]));

        let symbols = vec!["AAA".to_string(), "ZZZ".to_string(), "BBB".to_string()];
        let out = provider
            .get_multiple_assets(&symbols, &full_range(), &[QuoteChannel::Close], true)
            .unwrap();

        assert_eq!(out.symbols, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(out.fundamentals.len(), 2);
        assert_eq!(out.channel(QuoteChannel::Close).unwrap()[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_alignment_uses_median_length() {
        let provider = InMemoryQuoteProvider::new()
            .with_asset(history("LONG", &[1.0, 2.0, 3.0, 4.0, 5.0]))
            .with_asset(history("MID", &[10.0, 11.0, 12.0, 13.0]))
            .with_asset(history("SHORT", &[7.0, 8.0]));

        let symbols = vec!["LONG".to_string(), "MID".to_string(), "SHORT".to_string()];
        let out = provider
            .get_multiple_assets(&symbols, &full_range(), &[QuoteChannel::Close], false)
            .unwrap();

        assert_eq!(out.symbols, vec!["LONG".to_string(), "MID".to_string()]);
        assert_eq!(out.dates.len(), 4);
        let closes = out.channel(QuoteChannel::Close).unwrap();
        assert_eq!(closes[0], vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(closes[1], vec![10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_adjustment_factors_apply_to_prices_only() {
        let mut h = history("ADJ", &[10.0, 20.0]);
        h.channels.insert(QuoteChannel::Volume, vec![100.0, 200.0]);
        h.adjustment_factors = Some(vec![0.5, 1.0]);
        let provider = InMemoryQuoteProvider::new().with_asset(h);

        let (quotes, _) = provider
            .get_asset_data(
                "ADJ",
                &full_range(),
                &[QuoteChannel::Close, QuoteChannel::Volume],
                true,
            )
            .unwrap();
        assert_eq!(quotes.channel(QuoteChannel::Close).unwrap(), &[5.0, 20.0]);
        assert_eq!(quotes.channel(QuoteChannel::Volume).unwrap(), &[100.0, 200.0]);
    }

    #[test]
    fn test_no_loadable_symbols_is_an_error() {
        let provider = InMemoryQuoteProvider::new();
        let err = provider
            .get_multiple_assets(&["NOPE".to_string()], &full_range(), &[QuoteChannel::Close], true)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ProviderError(_)));
    }
}
