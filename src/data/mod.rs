pub mod history;
pub mod http_client;
pub mod profile;
pub mod search;

use std::future::Future;

use crate::types::{PriceBar, StockProfile, SymbolMatch};

/// Seam over the external market-data provider. The engine is generic
/// over this so it can be driven by a scripted provider in tests.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> impl Future<Output = Result<Vec<PriceBar>, String>> + Send;

    fn fetch_profile(&self, symbol: &str)
        -> impl Future<Output = Result<StockProfile, String>> + Send;

    fn search(&self, query: &str) -> impl Future<Output = Vec<SymbolMatch>> + Send;
}

/// Production provider backed by the public chart/quote API.
#[derive(Debug, Default, Clone)]
pub struct YahooProvider;

impl MarketDataProvider for YahooProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PriceBar>, String> {
        history::fetch_history(symbol, period, interval).await
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<StockProfile, String> {
        profile::fetch_profile(symbol).await
    }

    async fn search(&self, query: &str) -> Vec<SymbolMatch> {
        search::search_symbols(query).await
    }
}
