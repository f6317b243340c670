use std::collections::HashMap;

use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use crate::types::{
    AiComparePoint, ComparisonResult, ForecastPoint, PriceBar, UserPrediction,
};
use crate::utils::{add_hours, parse_datetime, round_to};

/// OHLC estimate for one future hour, as submitted by the user; the
/// ledger assigns the hour index and timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PredictionInput {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

pub const PREDICTION_POINTS: usize = 5;

/// In-process store of human-submitted hourly forecasts, keyed by
/// `(symbol, submission-hour bucket)`. Submissions within the same hour
/// overwrite each other; nothing survives a process restart.
pub struct PredictionLedger {
    entries: RwLock<HashMap<String, UserPrediction>>,
}

impl PredictionLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store a new prediction. Rejects any point count other than 5
    /// before touching the store.
    pub async fn submit(
        &self,
        symbol: &str,
        base_price: f64,
        base_time: &str,
        points: &[PredictionInput],
    ) -> Result<(String, UserPrediction), String> {
        self.submit_at(symbol, base_price, base_time, points, Local::now())
            .await
    }

    /// `submit` with an explicit submission instant, so hour-bucket
    /// behavior is testable.
    pub async fn submit_at(
        &self,
        symbol: &str,
        base_price: f64,
        base_time: &str,
        points: &[PredictionInput],
        now: DateTime<Local>,
    ) -> Result<(String, UserPrediction), String> {
        if points.len() != PREDICTION_POINTS {
            return Err(format!(
                "Expected {} hourly forecast points, got {}",
                PREDICTION_POINTS,
                points.len()
            ));
        }

        let symbol = symbol.to_uppercase();
        let base = parse_datetime(base_time)?;

        let predictions: Vec<ForecastPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| ForecastPoint {
                time: add_hours(&base, (i + 1) as i64),
                hour: i + 1,
                open: p.open,
                high: p.high,
                low: p.low,
                close: p.close,
            })
            .collect();

        let prediction = UserPrediction {
            symbol: symbol.clone(),
            created_at: now.to_rfc3339(),
            base_price: round_to(base_price, 2),
            base_time: base_time.to_string(),
            predictions,
        };

        let key = format!("{}_{}", symbol, now.format("%Y%m%d%H"));

        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), prediction.clone());

        Ok((key, prediction))
    }

    /// Most recently created prediction for a symbol across all hour
    /// buckets, by creation timestamp descending.
    pub async fn latest(&self, symbol: &str) -> Option<UserPrediction> {
        let symbol = symbol.to_uppercase();
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|p| p.symbol == symbol)
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
            .cloned()
    }
}

impl Default for PredictionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Join user and AI forecasts against realized bars and score both by
/// mean absolute error over exactly timestamp-matched closes. Unmatched
/// points are excluded from the mean; zero matches leaves the MAE field
/// absent rather than zero.
pub fn build_comparison(
    symbol: &str,
    actual: &[PriceBar],
    ai_prediction: Vec<AiComparePoint>,
    user_prediction: Option<&UserPrediction>,
) -> ComparisonResult {
    let mut result = ComparisonResult {
        symbol: symbol.to_uppercase(),
        actual: actual[actual.len().saturating_sub(24)..].to_vec(),
        ai_prediction,
        user_prediction: user_prediction.map(|p| p.predictions.clone()).unwrap_or_default(),
        user_base_time: user_prediction.map(|p| p.base_time.clone()),
        user_base_price: user_prediction.map(|p| p.base_price),
        user_mae: None,
        ai_mae: None,
    };

    if user_prediction.is_some() && !result.ai_prediction.is_empty() {
        result.user_mae = mean_absolute_error(
            result.user_prediction.iter().map(|p| (p.time.as_str(), p.close)),
            actual,
        );
        result.ai_mae = mean_absolute_error(
            result.ai_prediction.iter().map(|p| (p.time.as_str(), p.close)),
            actual,
        );
    }

    result
}

fn mean_absolute_error<'a>(
    forecast: impl Iterator<Item = (&'a str, f64)>,
    actual: &[PriceBar],
) -> Option<f64> {
    let mut errors = Vec::new();
    for (time, close) in forecast {
        if let Some(bar) = actual.iter().find(|b| b.date == time) {
            errors.push((close - bar.close).abs());
        }
    }
    if errors.is_empty() {
        None
    } else {
        Some(round_to(errors.iter().sum::<f64>() / errors.len() as f64, 2))
    }
}
