use futures::future::join_all;

use crate::cache::StockCache;
use crate::data::MarketDataProvider;
use crate::error::{AnalyticsError, Result};
use crate::ledger::{build_comparison, PredictionInput, PredictionLedger, PREDICTION_POINTS};
use crate::prediction::{
    forecast_arima, run_forecasters, ForecastMethod, DEFAULT_DAILY_HORIZON, HOURLY_AR_ORDER,
    HOURLY_HORIZON,
};
use crate::risk_metrics::{
    calculate_returns_distribution, calculate_risk_metrics, calculate_rolling_beta,
};
use crate::technical_indicators::{self, MIN_BARS};
use crate::types::{
    AiComparePoint, AiForecastPoint, ComparisonResult, ForecastBundle, ForecastSeries,
    HourlyForecast, PriceBar, RiskAnalysis, StockOverview, StockProfile, SymbolMatch,
    SymbolRiskSummary, TechnicalSnapshot, UserPrediction,
};
use crate::utils::{add_days, add_hours, parse_date, parse_datetime, round_to, simple_returns};

const MAX_COMPARE_SYMBOLS: usize = 10;

/// Facade over the whole analytics pipeline. Generic over the market
/// data provider so tests can script upstream responses.
pub struct AnalyticsEngine<P: MarketDataProvider> {
    provider: P,
    cache: StockCache,
    ledger: PredictionLedger,
}

impl<P: MarketDataProvider> AnalyticsEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: StockCache::new(),
            ledger: PredictionLedger::new(),
        }
    }

    /// Cached history fetch. Provider errors keep their message under
    /// the upstream kind.
    async fn history(&self, symbol: &str, period: &str, interval: &str) -> Result<Vec<PriceBar>> {
        if let Some(bars) = self.cache.get_history(symbol, period, interval).await {
            return Ok(bars);
        }
        let bars = self
            .provider
            .fetch_history(symbol, period, interval)
            .await
            .map_err(AnalyticsError::Upstream)?;
        self.cache
            .set_history(symbol, period, interval, bars.clone())
            .await;
        Ok(bars)
    }

    /// Profile fetch that never fails: an unreachable profile endpoint
    /// degrades to placeholder fields rather than sinking the request.
    async fn profile(&self, symbol: &str) -> StockProfile {
        if let Some(profile) = self.cache.get_profile(symbol).await {
            return profile;
        }
        match self.provider.fetch_profile(symbol).await {
            Ok(profile) => {
                self.cache.set_profile(symbol.to_string(), profile.clone()).await;
                profile
            }
            Err(e) => {
                eprintln!("Profile fetch failed for {}: {}", symbol, e);
                StockProfile::default()
            }
        }
    }

    pub async fn stock_overview(&self, symbol: &str, period: &str) -> Result<StockOverview> {
        let bars = self.history(symbol, period, "1d").await?;
        if bars.is_empty() {
            return Err(AnalyticsError::DataInsufficient(format!(
                "No price data for {}",
                symbol
            )));
        }

        let profile = self.profile(symbol).await;

        let current_price = bars[bars.len() - 1].close;
        let previous_close = if bars.len() >= 2 {
            bars[bars.len() - 2].close
        } else {
            current_price
        };
        let price_change = current_price - previous_close;
        let price_change_percent = if previous_close != 0.0 {
            price_change / previous_close * 100.0
        } else {
            0.0
        };

        Ok(StockOverview {
            symbol: symbol.to_uppercase(),
            name: profile.name,
            currency: profile.currency,
            exchange: profile.exchange,
            sector: profile.sector,
            industry: profile.industry,
            market_cap: profile.market_cap,
            pe_ratio: profile.pe_ratio,
            dividend_yield: profile.dividend_yield,
            fifty_two_week_high: profile.fifty_two_week_high,
            fifty_two_week_low: profile.fifty_two_week_low,
            current_price: round_to(current_price, 2),
            price_change: round_to(price_change, 2),
            price_change_percent: round_to(price_change_percent, 2),
            chart_data: bars,
        })
    }

    pub async fn risk_analysis(
        &self,
        symbol: &str,
        period: &str,
        benchmark: &str,
    ) -> Result<RiskAnalysis> {
        let stock_bars = self.history(symbol, period, "1d").await?;
        let market_bars = self.history(benchmark, period, "1d").await?;

        if stock_bars.len() < 2 || market_bars.len() < 2 {
            return Err(AnalyticsError::DataInsufficient(format!(
                "Need at least 2 bars for both {} and {}",
                symbol, benchmark
            )));
        }

        let stock_closes: Vec<f64> = stock_bars.iter().map(|b| b.close).collect();
        let market_closes: Vec<f64> = market_bars.iter().map(|b| b.close).collect();

        let metrics = calculate_risk_metrics(&stock_closes, &market_closes);

        let stock_returns = simple_returns(&stock_closes);
        let market_returns = simple_returns(&market_closes);
        let returns_distribution = calculate_returns_distribution(&stock_returns);

        // return i corresponds to the date of bar i+1
        let return_dates: Vec<String> =
            stock_bars[1..].iter().map(|b| b.date.clone()).collect();
        let rolling_beta = calculate_rolling_beta(&stock_returns, &market_returns, &return_dates);

        Ok(RiskAnalysis {
            symbol: symbol.to_uppercase(),
            benchmark: benchmark.to_uppercase(),
            metrics,
            returns_distribution,
            rolling_beta,
        })
    }

    pub async fn technical_snapshot(&self, symbol: &str) -> Result<TechnicalSnapshot> {
        let bars = self.history(symbol, "1y", "1d").await?;
        technical_indicators::calculate_snapshot(symbol, &bars)
            .map_err(AnalyticsError::DataInsufficient)
    }

    /// Daily forecast over 2 years of history. Each requested model
    /// fails independently; the result only errors when nothing at all
    /// could be fitted.
    pub async fn forecast(
        &self,
        symbol: &str,
        horizon: Option<usize>,
        method: &str,
    ) -> Result<ForecastBundle> {
        let method = ForecastMethod::parse(method).map_err(AnalyticsError::Validation)?;
        let horizon = horizon.unwrap_or(DEFAULT_DAILY_HORIZON);
        if horizon == 0 {
            return Err(AnalyticsError::Validation(
                "Forecast horizon must be positive".to_string(),
            ));
        }

        let bars = self.history(symbol, "2y", "1d").await?;
        if bars.is_empty() {
            return Err(AnalyticsError::DataInsufficient(format!(
                "No price data for {}",
                symbol
            )));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let last_bar = &bars[bars.len() - 1];
        let last_price = round_to(last_bar.close, 2);
        let last_date = last_bar.date.clone();

        let anchor = parse_date(&last_date).map_err(AnalyticsError::Upstream)?;
        let prediction_dates: Vec<String> =
            (1..=horizon as i32).map(|i| add_days(&anchor, i)).collect();

        // model fitting is CPU-bound, keep it off the async workers
        let dual = tokio::task::spawn_blocking(move || run_forecasters(&closes, horizon, method))
            .await
            .map_err(|e| AnalyticsError::ModelFit(format!("Forecast task failed: {}", e)))?;

        if dual.arima.is_none() && dual.lstm.is_none() {
            return Err(AnalyticsError::ModelFit(format!(
                "No forecast model could be fitted for {}",
                symbol
            )));
        }

        Ok(ForecastBundle {
            symbol: symbol.to_uppercase(),
            last_price,
            last_date,
            prediction_dates,
            arima: dual.arima.map(round_series),
            lstm: dual.lstm.map(round_series),
        })
    }

    /// 5-hour statistical forecast with open prices chained from the
    /// previous predicted close.
    pub async fn hourly_forecast(&self, symbol: &str) -> Result<HourlyForecast> {
        let bars = self.history(symbol, "1mo", "1h").await?;
        if bars.len() < MIN_BARS {
            return Err(AnalyticsError::DataInsufficient(format!(
                "Need at least {} hourly bars for {}, got {}",
                MIN_BARS,
                symbol,
                bars.len()
            )));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let series = forecast_arima(&closes, HOURLY_AR_ORDER, HOURLY_HORIZON)
            .map_err(AnalyticsError::ModelFit)?;

        let last_bar = &bars[bars.len() - 1];
        let last_time = parse_datetime(&last_bar.date).map_err(AnalyticsError::Upstream)?;

        let mut predictions = Vec::with_capacity(HOURLY_HORIZON);
        let mut prev_close = last_bar.close;
        for (i, &pred) in series.predictions.iter().enumerate() {
            let high = pred.max(prev_close) * 1.005;
            let low = pred.min(prev_close) * 0.995;
            predictions.push(AiForecastPoint {
                time: add_hours(&last_time, (i + 1) as i64),
                hour: i + 1,
                open: round_to(prev_close, 2),
                close: round_to(pred, 2),
                high: round_to(high, 2),
                low: round_to(low, 2),
                upper_bound: round_to(series.upper_bound[i], 2),
                lower_bound: round_to(series.lower_bound[i], 2),
            });
            prev_close = pred;
        }

        Ok(HourlyForecast {
            symbol: symbol.to_uppercase(),
            last_price: round_to(last_bar.close, 2),
            last_time: last_bar.date.clone(),
            predictions,
        })
    }

    /// Record a human 5-hour forecast anchored at the latest hourly bar.
    /// The point count is validated before any network traffic.
    pub async fn submit_prediction(
        &self,
        symbol: &str,
        points: &[PredictionInput],
    ) -> Result<(String, UserPrediction)> {
        if points.len() != PREDICTION_POINTS {
            return Err(AnalyticsError::Validation(format!(
                "Expected {} hourly forecast points, got {}",
                PREDICTION_POINTS,
                points.len()
            )));
        }

        let bars = self.history(symbol, "1d", "1h").await?;
        let last_bar = bars.last().ok_or_else(|| {
            AnalyticsError::DataInsufficient(format!("No hourly data for {}", symbol))
        })?;

        self.ledger
            .submit(symbol, last_bar.close, &last_bar.date, points)
            .await
            .map_err(AnalyticsError::Validation)
    }

    pub async fn latest_prediction(&self, symbol: &str) -> Option<UserPrediction> {
        self.ledger.latest(symbol).await
    }

    /// Score the latest human forecast against realized bars, next to a
    /// reference model fitted on everything but the last 5 closes.
    pub async fn compare_predictions(&self, symbol: &str) -> Result<ComparisonResult> {
        let bars = self.history(symbol, "5d", "1h").await?;
        if bars.len() <= HOURLY_HORIZON {
            return Err(AnalyticsError::DataInsufficient(format!(
                "Need more than {} hourly bars for {}, got {}",
                HOURLY_HORIZON,
                symbol,
                bars.len()
            )));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let train = &closes[..closes.len() - HOURLY_HORIZON];
        let holdout_times = &bars[bars.len() - HOURLY_HORIZON..];

        let ai_prediction = match forecast_arima(train, HOURLY_AR_ORDER, HOURLY_HORIZON) {
            Ok(series) => series
                .predictions
                .iter()
                .zip(holdout_times)
                .map(|(&close, bar)| AiComparePoint {
                    time: bar.date.clone(),
                    close: round_to(close, 2),
                })
                .collect(),
            Err(e) => {
                eprintln!("Reference forecast failed for {}: {}", symbol, e);
                Vec::new()
            }
        };

        let user_prediction = self.ledger.latest(symbol).await;
        Ok(build_comparison(
            symbol,
            &bars,
            ai_prediction,
            user_prediction.as_ref(),
        ))
    }

    /// Risk metrics for up to 10 symbols against one benchmark,
    /// fetched concurrently. Symbols that fail to resolve are skipped.
    pub async fn compare_symbols(
        &self,
        symbols: &[String],
        period: &str,
        benchmark: &str,
    ) -> Result<Vec<SymbolRiskSummary>> {
        let market_bars = self.history(benchmark, period, "1d").await?;
        if market_bars.len() < 2 {
            return Err(AnalyticsError::DataInsufficient(format!(
                "Need at least 2 bars for benchmark {}",
                benchmark
            )));
        }
        let market_closes: Vec<f64> = market_bars.iter().map(|b| b.close).collect();

        let tasks = symbols
            .iter()
            .take(MAX_COMPARE_SYMBOLS)
            .map(|symbol| self.symbol_summary(symbol, period, &market_closes));
        let summaries = join_all(tasks).await;

        Ok(summaries.into_iter().flatten().collect())
    }

    async fn symbol_summary(
        &self,
        symbol: &str,
        period: &str,
        market_closes: &[f64],
    ) -> Option<SymbolRiskSummary> {
        let bars = match self.history(symbol, period, "1d").await {
            Ok(bars) if bars.len() >= 2 => bars,
            Ok(_) => {
                eprintln!("Skipping {}: not enough bars", symbol);
                return None;
            }
            Err(e) => {
                eprintln!("Skipping {}: {}", symbol, e);
                return None;
            }
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let profile = self.profile(symbol).await;

        Some(SymbolRiskSummary {
            symbol: symbol.to_uppercase(),
            name: profile.name,
            current_price: round_to(closes[closes.len() - 1], 2),
            metrics: calculate_risk_metrics(&closes, market_closes),
        })
    }

    /// Symbol lookup. Upstream failures collapse to an empty result.
    pub async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        self.provider.search(query).await
    }
}

fn round_series(series: ForecastSeries) -> ForecastSeries {
    ForecastSeries {
        predictions: series.predictions.iter().map(|&v| round_to(v, 2)).collect(),
        lower_bound: series.lower_bound.iter().map(|&v| round_to(v, 2)).collect(),
        upper_bound: series.upper_bound.iter().map(|&v| round_to(v, 2)).collect(),
    }
}
