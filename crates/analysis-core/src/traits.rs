use crate::{AnalysisError, AssetQuotes, DateRange, Fundamentals, MultiAssetQuotes, QuoteChannel};

/// Source of historical quotes and fundamentals.
///
/// Calls are ordinary blocking calls returning fully materialized data; any
/// network access or caching lives behind the implementation.
pub trait QuoteProvider {
    /// Quotes and fundamentals of a single asset.
    fn get_asset_data(
        &self,
        symbol: &str,
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust_prices: bool,
    ) -> Result<(AssetQuotes, Fundamentals), AnalysisError>;

    /// Quotes of several assets aligned to a common date axis.
    ///
    /// Unavailable identifiers are dropped, and `symbols` of the result lists
    /// the assets actually returned, in request order.
    fn get_multiple_assets(
        &self,
        symbols: &[String],
        range: &DateRange,
        channels: &[QuoteChannel],
        adjust_prices: bool,
    ) -> Result<MultiAssetQuotes, AnalysisError>;
}
