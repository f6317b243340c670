use std::time::Duration;

use moka::future::Cache;

use crate::types::{PriceBar, StockProfile};

/// TTL cache over provider responses. Hourly history turns over quickly;
/// daily history and profiles are stable within a session.
pub struct StockCache {
    daily_history: Cache<String, Vec<PriceBar>>,
    hourly_history: Cache<String, Vec<PriceBar>>,
    profiles: Cache<String, StockProfile>,
}

impl StockCache {
    pub fn new() -> Self {
        let daily_history = Cache::builder()
            .time_to_live(Duration::from_secs(6 * 60 * 60))
            .max_capacity(512)
            .build();

        let hourly_history = Cache::builder()
            .time_to_live(Duration::from_secs(60))
            .max_capacity(512)
            .build();

        let profiles = Cache::builder()
            .time_to_live(Duration::from_secs(6 * 60 * 60))
            .max_capacity(512)
            .build();

        Self {
            daily_history,
            hourly_history,
            profiles,
        }
    }

    fn history_key(symbol: &str, period: &str, interval: &str) -> String {
        format!("{}:{}:{}", symbol, period, interval)
    }

    pub async fn get_history(&self, symbol: &str, period: &str, interval: &str) -> Option<Vec<PriceBar>> {
        let key = Self::history_key(symbol, period, interval);
        if interval == "1h" {
            self.hourly_history.get(&key).await
        } else {
            self.daily_history.get(&key).await
        }
    }

    pub async fn set_history(&self, symbol: &str, period: &str, interval: &str, bars: Vec<PriceBar>) {
        let key = Self::history_key(symbol, period, interval);
        if interval == "1h" {
            self.hourly_history.insert(key, bars).await;
        } else {
            self.daily_history.insert(key, bars).await;
        }
    }

    pub async fn get_profile(&self, symbol: &str) -> Option<StockProfile> {
        self.profiles.get(symbol).await
    }

    pub async fn set_profile(&self, symbol: String, profile: StockProfile) {
        self.profiles.insert(symbol, profile).await;
    }
}

impl Default for StockCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }

    #[tokio::test]
    async fn history_is_keyed_by_symbol_period_interval() {
        let cache = StockCache::new();
        cache
            .set_history("AAPL", "1y", "1d", vec![bar("2024-01-02", 100.0)])
            .await;

        assert!(cache.get_history("AAPL", "1y", "1d").await.is_some());
        assert!(cache.get_history("AAPL", "2y", "1d").await.is_none());
        assert!(cache.get_history("MSFT", "1y", "1d").await.is_none());
    }
}
