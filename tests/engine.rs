use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use equity_analytics::types::{PriceBar, StockProfile, SymbolMatch};
use equity_analytics::{AnalyticsEngine, AnalyticsError, MarketDataProvider, PredictionInput};

/// Provider with canned responses, keyed by `symbol:period:interval`.
/// Unscripted requests fail like an unreachable upstream would.
#[derive(Default)]
struct ScriptedProvider {
    history: HashMap<String, Result<Vec<PriceBar>, String>>,
    profiles: HashMap<String, StockProfile>,
    search_results: Vec<SymbolMatch>,
}

impl ScriptedProvider {
    fn with_history(
        mut self,
        symbol: &str,
        period: &str,
        interval: &str,
        response: Result<Vec<PriceBar>, String>,
    ) -> Self {
        self.history
            .insert(format!("{}:{}:{}", symbol, period, interval), response);
        self
    }

    fn with_profile(mut self, symbol: &str, name: &str) -> Self {
        self.profiles.insert(
            symbol.to_string(),
            StockProfile {
                name: name.to_string(),
                ..StockProfile::default()
            },
        );
        self
    }

    fn with_search_results(mut self, results: Vec<SymbolMatch>) -> Self {
        self.search_results = results;
        self
    }
}

impl MarketDataProvider for ScriptedProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PriceBar>, String> {
        self.history
            .get(&format!("{}:{}:{}", symbol, period, interval))
            .cloned()
            .unwrap_or_else(|| Err(format!("API error: 404 for {}", symbol)))
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<StockProfile, String> {
        self.profiles
            .get(symbol)
            .cloned()
            .ok_or_else(|| format!("API error: 404 for {}", symbol))
    }

    async fn search(&self, _query: &str) -> Vec<SymbolMatch> {
        self.search_results.clone()
    }
}

fn daily_bars(n: usize) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.15 + (i as f64 * 0.7).sin() * 2.0;
            PriceBar {
                date: (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000,
            }
        })
        .collect()
}

fn hourly_bars(start: &str, n: usize) -> Vec<PriceBar> {
    let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
    (0..n)
        .map(|i| {
            let close = 50.0 + (i as f64 * 0.9).sin() * 1.5 + i as f64 * 0.05;
            PriceBar {
                date: (start + Duration::hours(i as i64))
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
                open: close - 0.2,
                high: close + 0.4,
                low: close - 0.4,
                close,
                volume: 50_000,
            }
        })
        .collect()
}

fn five_points(base: f64) -> Vec<PredictionInput> {
    (0..5)
        .map(|i| PredictionInput {
            open: base + i as f64 * 0.1,
            high: base + 0.5 + i as f64 * 0.1,
            low: base - 0.5 + i as f64 * 0.1,
            close: base + 0.2 + i as f64 * 0.1,
        })
        .collect()
}

#[tokio::test]
async fn overview_computes_change_and_defaults_missing_profile() {
    let mut bars = daily_bars(5);
    bars[3].close = 100.0;
    bars[4].close = 105.0;
    let provider = ScriptedProvider::default().with_history("AAPL", "1mo", "1d", Ok(bars));
    let engine = AnalyticsEngine::new(provider);

    let overview = engine.stock_overview("AAPL", "1mo").await.unwrap();
    assert_eq!(overview.symbol, "AAPL");
    assert_eq!(overview.current_price, 105.0);
    assert_eq!(overview.price_change, 5.0);
    assert_eq!(overview.price_change_percent, 5.0);
    assert_eq!(overview.name, "N/A");
    assert_eq!(overview.currency, "USD");
    assert_eq!(overview.chart_data.len(), 5);
}

#[tokio::test]
async fn empty_history_maps_to_data_insufficient() {
    let provider = ScriptedProvider::default().with_history("XYZ", "1mo", "1d", Ok(Vec::new()));
    let engine = AnalyticsEngine::new(provider);

    let err = engine.stock_overview("XYZ", "1mo").await.unwrap_err();
    assert_eq!(err.kind(), "data_insufficient");
}

#[tokio::test]
async fn provider_failure_surfaces_as_upstream_with_message() {
    let provider = ScriptedProvider::default().with_history(
        "XYZ",
        "1mo",
        "1d",
        Err("API error: 502".to_string()),
    );
    let engine = AnalyticsEngine::new(provider);

    let err = engine.stock_overview("XYZ", "1mo").await.unwrap_err();
    match err {
        AnalyticsError::Upstream(msg) => assert_eq!(msg, "API error: 502"),
        other => panic!("expected upstream error, got {}", other),
    }
}

#[tokio::test]
async fn risk_analysis_produces_aligned_outputs() {
    let provider = ScriptedProvider::default()
        .with_history("AAPL", "1y", "1d", Ok(daily_bars(120)))
        .with_history("SPY", "1y", "1d", Ok(daily_bars(120)));
    let engine = AnalyticsEngine::new(provider);

    let analysis = engine.risk_analysis("AAPL", "1y", "SPY").await.unwrap();
    assert_eq!(analysis.benchmark, "SPY");
    // identical series against itself has unit beta
    assert!((analysis.metrics.beta - 1.0).abs() < 1e-6);
    // 119 returns, 30-observation window
    assert_eq!(analysis.rolling_beta.len(), 119 - 30);
    assert_eq!(analysis.returns_distribution.values.len(), 119);
}

#[tokio::test]
async fn risk_analysis_rejects_short_series() {
    let provider = ScriptedProvider::default()
        .with_history("AAPL", "1y", "1d", Ok(daily_bars(120)))
        .with_history("SPY", "1y", "1d", Ok(daily_bars(1)));
    let engine = AnalyticsEngine::new(provider);

    let err = engine.risk_analysis("AAPL", "1y", "SPY").await.unwrap_err();
    assert_eq!(err.kind(), "data_insufficient");
}

#[tokio::test]
async fn technical_snapshot_requires_thirty_bars() {
    let provider = ScriptedProvider::default()
        .with_history("THIN", "1y", "1d", Ok(daily_bars(20)))
        .with_history("FULL", "1y", "1d", Ok(daily_bars(70)));
    let engine = AnalyticsEngine::new(provider);

    let err = engine.technical_snapshot("THIN").await.unwrap_err();
    assert_eq!(err.kind(), "data_insufficient");

    let snapshot = engine.technical_snapshot("FULL").await.unwrap();
    assert!(snapshot.moving_averages.ma60.is_some());
    assert_eq!(snapshot.signals.len(), 3);
    assert!(snapshot.trend == "bullish" || snapshot.trend == "bearish");
}

#[tokio::test]
async fn forecast_returns_both_models_with_consecutive_dates() {
    let provider =
        ScriptedProvider::default().with_history("AAPL", "2y", "1d", Ok(daily_bars(200)));
    let engine = AnalyticsEngine::new(provider);

    let bundle = engine.forecast("AAPL", None, "both").await.unwrap();
    assert_eq!(bundle.prediction_dates.len(), 30);

    let last = NaiveDate::parse_from_str(&bundle.last_date, "%Y-%m-%d").unwrap();
    let first_pred =
        NaiveDate::parse_from_str(&bundle.prediction_dates[0], "%Y-%m-%d").unwrap();
    assert_eq!(first_pred, last + Duration::days(1));

    for series in [bundle.arima.as_ref().unwrap(), bundle.lstm.as_ref().unwrap()] {
        assert_eq!(series.predictions.len(), 30);
        for i in 0..30 {
            assert!(series.predictions[i].is_finite());
            assert!(series.lower_bound[i] <= series.upper_bound[i]);
        }
    }
}

#[tokio::test]
async fn forecast_single_model_request_omits_the_other() {
    let provider =
        ScriptedProvider::default().with_history("AAPL", "2y", "1d", Ok(daily_bars(200)));
    let engine = AnalyticsEngine::new(provider);

    let bundle = engine.forecast("AAPL", Some(10), "arima").await.unwrap();
    assert!(bundle.arima.is_some());
    assert!(bundle.lstm.is_none());
    assert_eq!(bundle.prediction_dates.len(), 10);
}

#[tokio::test]
async fn forecast_with_no_fittable_model_is_model_fit_failure() {
    // 10 bars is below every model's minimum history
    let provider =
        ScriptedProvider::default().with_history("TINY", "2y", "1d", Ok(daily_bars(10)));
    let engine = AnalyticsEngine::new(provider);

    let err = engine.forecast("TINY", None, "both").await.unwrap_err();
    assert_eq!(err.kind(), "model_fit_failure");
}

#[tokio::test]
async fn forecast_rejects_unknown_method() {
    let provider = ScriptedProvider::default();
    let engine = AnalyticsEngine::new(provider);

    let err = engine.forecast("AAPL", None, "fourier").await.unwrap_err();
    assert_eq!(err.kind(), "validation_failure");
}

#[tokio::test]
async fn hourly_forecast_chains_opens_from_previous_close() {
    let provider = ScriptedProvider::default().with_history(
        "AAPL",
        "1mo",
        "1h",
        Ok(hourly_bars("2024-03-01 09:00", 60)),
    );
    let engine = AnalyticsEngine::new(provider);

    let forecast = engine.hourly_forecast("AAPL").await.unwrap();
    assert_eq!(forecast.predictions.len(), 5);

    assert_eq!(forecast.predictions[0].open, forecast.last_price);
    for i in 1..5 {
        assert_eq!(forecast.predictions[i].hour, i + 1);
        assert_eq!(
            forecast.predictions[i].open,
            forecast.predictions[i - 1].close
        );
    }
    for point in &forecast.predictions {
        assert!(point.high >= point.close);
        assert!(point.low <= point.close);
        assert!(point.lower_bound <= point.upper_bound);
    }
}

#[tokio::test]
async fn hourly_forecast_requires_thirty_bars() {
    let provider = ScriptedProvider::default().with_history(
        "AAPL",
        "1mo",
        "1h",
        Ok(hourly_bars("2024-03-01 09:00", 10)),
    );
    let engine = AnalyticsEngine::new(provider);

    let err = engine.hourly_forecast("AAPL").await.unwrap_err();
    assert_eq!(err.kind(), "data_insufficient");
}

#[tokio::test]
async fn submit_rejects_wrong_point_count_before_fetching() {
    // provider has nothing scripted, so any fetch would fail as upstream
    let provider = ScriptedProvider::default();
    let engine = AnalyticsEngine::new(provider);

    let err = engine
        .submit_prediction("AAPL", &five_points(100.0)[..3])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_failure");
}

#[tokio::test]
async fn submit_anchors_at_latest_hourly_bar() {
    let provider = ScriptedProvider::default().with_history(
        "aapl",
        "1d",
        "1h",
        Ok(hourly_bars("2024-03-01 09:00", 7)),
    );
    let engine = AnalyticsEngine::new(provider);

    let (key, stored) = engine
        .submit_prediction("aapl", &five_points(52.0))
        .await
        .unwrap();
    assert!(key.starts_with("AAPL_"));
    assert_eq!(stored.base_time, "2024-03-01 15:00");
    assert_eq!(stored.predictions[0].time, "2024-03-01 16:00");
    assert_eq!(stored.predictions[4].time, "2024-03-01 20:00");

    let latest = engine.latest_prediction("AAPL").await.unwrap();
    assert_eq!(latest.base_time, stored.base_time);
    assert!(engine.latest_prediction("MSFT").await.is_none());
}

#[tokio::test]
async fn compare_scores_user_against_reference_model() {
    // hourly history covering the user's forecast window
    let bars = hourly_bars("2024-02-28 09:00", 40);
    let submission_window = hourly_bars("2024-02-28 09:00", 35);
    let provider = ScriptedProvider::default()
        .with_history("AAPL", "5d", "1h", Ok(bars.clone()))
        .with_history("AAPL", "1d", "1h", Ok(submission_window));
    let engine = AnalyticsEngine::new(provider);

    // base is bar 34, so forecast hours land on bars 35..39
    engine
        .submit_prediction("AAPL", &five_points(51.0))
        .await
        .unwrap();

    let comparison = engine.compare_predictions("AAPL").await.unwrap();
    assert_eq!(comparison.actual.len(), 24);
    assert_eq!(comparison.ai_prediction.len(), 5);
    assert_eq!(comparison.user_prediction.len(), 5);
    assert_eq!(comparison.ai_prediction[0].time, bars[35].date);
    assert!(comparison.user_mae.is_some());
    assert!(comparison.ai_mae.is_some());
    assert!(comparison.user_mae.unwrap() >= 0.0);
}

#[tokio::test]
async fn compare_without_submission_reports_no_scores() {
    let provider = ScriptedProvider::default().with_history(
        "AAPL",
        "5d",
        "1h",
        Ok(hourly_bars("2024-02-28 09:00", 40)),
    );
    let engine = AnalyticsEngine::new(provider);

    let comparison = engine.compare_predictions("AAPL").await.unwrap();
    assert!(comparison.user_prediction.is_empty());
    assert!(comparison.user_base_time.is_none());
    assert_eq!(comparison.user_mae, None);
    assert_eq!(comparison.ai_mae, None);
}

#[tokio::test]
async fn compare_symbols_skips_failing_symbols() {
    let provider = ScriptedProvider::default()
        .with_history("SPY", "1y", "1d", Ok(daily_bars(100)))
        .with_history("GOOD", "1y", "1d", Ok(daily_bars(100)))
        .with_history("BAD", "1y", "1d", Err("API error: 500".to_string()))
        .with_profile("GOOD", "Good Corp");
    let engine = AnalyticsEngine::new(provider);

    let summaries = engine
        .compare_symbols(
            &["GOOD".to_string(), "BAD".to_string()],
            "1y",
            "SPY",
        )
        .await
        .unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].symbol, "GOOD");
    assert_eq!(summaries[0].name, "Good Corp");
}

#[tokio::test]
async fn search_passes_provider_results_through() {
    let provider = ScriptedProvider::default().with_search_results(vec![SymbolMatch {
        symbol: "AAPL".to_string(),
        name: "Apple Inc.".to_string(),
        exchange: "NMS".to_string(),
    }]);
    let engine = AnalyticsEngine::new(provider);

    let results = engine.search_symbols("app").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "AAPL");

    let empty_provider = ScriptedProvider::default();
    let engine = AnalyticsEngine::new(empty_provider);
    assert!(engine.search_symbols("app").await.is_empty());
}
