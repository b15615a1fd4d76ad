use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Free-form fundamentals ("macros") reported by a quote provider for one asset.
pub type Fundamentals = serde_json::Map<String, serde_json::Value>;

/// OHLCV field a computation operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteChannel {
    Close,
    Open,
    High,
    Low,
    Volume,
}

impl QuoteChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteChannel::Close => "Close",
            QuoteChannel::Open => "Open",
            QuoteChannel::High => "High",
            QuoteChannel::Low => "Low",
            QuoteChannel::Volume => "Volume",
        }
    }

    /// Whether split/dividend adjustment applies to this channel.
    pub fn is_price(&self) -> bool {
        !matches!(self, QuoteChannel::Volume)
    }
}

impl fmt::Display for QuoteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteChannel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" => Ok(QuoteChannel::Close),
            "open" => Ok(QuoteChannel::Open),
            "high" => Ok(QuoteChannel::High),
            "low" => Ok(QuoteChannel::Low),
            "volume" => Ok(QuoteChannel::Volume),
            other => Err(AnalysisError::Config(format!(
                "Unknown quote channel '{}', expected one of: Close, Open, High, Low, Volume",
                other
            ))),
        }
    }
}

/// Inclusive date range; an open end means "up to the latest observation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, AnalysisError> {
        if let Some(end) = end {
            if end < start {
                return Err(AnalysisError::Config(format!(
                    "Date range end {} precedes start {}",
                    end, start
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }
}

/// Historical quotes of a single asset, one entry per requested channel.
/// Values may contain NaN for missing observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetQuotes {
    pub dates: Vec<NaiveDate>,
    pub channels: HashMap<QuoteChannel, Vec<f64>>,
}

impl AssetQuotes {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn channel(&self, channel: QuoteChannel) -> Result<&[f64], AnalysisError> {
        self.channels
            .get(&channel)
            .map(|v| v.as_slice())
            .ok_or_else(|| AnalysisError::ProviderError(format!("Channel {} was not provided", channel)))
    }
}

/// Quotes of several assets aligned to a common date axis.
///
/// `channels[channel][asset]` is the series of one asset, every series has
/// `dates.len()` entries, and asset order follows `symbols`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiAssetQuotes {
    pub dates: Vec<NaiveDate>,
    pub channels: HashMap<QuoteChannel, Vec<Vec<f64>>>,
    pub fundamentals: Vec<Fundamentals>,
    pub symbols: Vec<String>,
}

impl MultiAssetQuotes {
    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    pub fn channel(&self, channel: QuoteChannel) -> Result<&[Vec<f64>], AnalysisError> {
        self.channels
            .get(&channel)
            .map(|v| v.as_slice())
            .ok_or_else(|| AnalysisError::ProviderError(format!("Channel {} was not provided", channel)))
    }
}

/// Full stored history of one asset, as held by a provider before any filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetHistory {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub channels: HashMap<QuoteChannel, Vec<f64>>,
    /// Multiplicative adjustment factors (splits/dividends) per observation.
    #[serde(default)]
    pub adjustment_factors: Option<Vec<f64>>,
    #[serde(default)]
    pub fundamentals: Fundamentals,
}
