use serde::{Deserialize, Serialize};

/// One OHLCV bar. `date` is "%Y-%m-%d" for daily bars and
/// "%Y-%m-%d %H:%M" for hourly bars; series are ascending with no
/// duplicate dates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockProfile {
    pub name: String,
    pub currency: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: i64,
    pub pe_ratio: f64,
    pub dividend_yield: f64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
}

impl Default for StockProfile {
    fn default() -> Self {
        StockProfile {
            name: "N/A".to_string(),
            currency: "USD".to_string(),
            exchange: "N/A".to_string(),
            sector: "N/A".to_string(),
            industry: "N/A".to_string(),
            market_cap: 0,
            pe_ratio: 0.0,
            dividend_yield: 0.0,
            fifty_two_week_high: 0.0,
            fifty_two_week_low: 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockOverview {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: i64,
    pub pe_ratio: f64,
    pub dividend_yield: f64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub chart_data: Vec<PriceBar>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RiskLevel {
    pub level: String,
    pub color: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RiskMetrics {
    pub beta: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub var_95: f64,
    pub max_drawdown: f64,
    pub alpha: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReturnsDistribution {
    pub values: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    pub skew: f64,
    pub kurtosis: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RollingBetaPoint {
    pub date: String,
    pub beta: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RiskAnalysis {
    pub symbol: String,
    pub benchmark: String,
    pub metrics: RiskMetrics,
    pub returns_distribution: ReturnsDistribution,
    pub rolling_beta: Vec<RollingBetaPoint>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SymbolRiskSummary {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub metrics: RiskMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub indicator: String,
    pub desc: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MovingAverages {
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma60: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IndicatorValues {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub kdj_k: f64,
    pub kdj_d: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DistributionStats {
    pub skewness: f64,
    pub kurtosis: f64,
    pub daily_volatility: f64,
    pub annual_volatility: f64,
    pub avg_daily_return: f64,
    pub cumulative_return: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub moving_averages: MovingAverages,
    pub indicators: IndicatorValues,
    pub bollinger: BollingerBands,
    pub statistics: DistributionStats,
    pub signals: Vec<Signal>,
    pub trend: String,
}

/// Point forecast plus uncertainty bounds; the three sequences always
/// share the requested horizon length.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForecastSeries {
    pub predictions: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForecastBundle {
    pub symbol: String,
    pub last_price: f64,
    pub last_date: String,
    pub prediction_dates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arima: Option<ForecastSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lstm: Option<ForecastSeries>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiForecastPoint {
    pub time: String,
    pub hour: usize,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HourlyForecast {
    pub symbol: String,
    pub last_price: f64,
    pub last_time: String,
    pub predictions: Vec<AiForecastPoint>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForecastPoint {
    pub time: String,
    pub hour: usize,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// A human-submitted 5-hour forecast. Immutable once created; lives only
/// for the process lifetime.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserPrediction {
    pub symbol: String,
    pub created_at: String,
    pub base_price: f64,
    pub base_time: String,
    pub predictions: Vec<ForecastPoint>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AiComparePoint {
    pub time: String,
    pub close: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ComparisonResult {
    pub symbol: String,
    pub actual: Vec<PriceBar>,
    pub ai_prediction: Vec<AiComparePoint>,
    pub user_prediction: Vec<ForecastPoint>,
    pub user_base_time: Option<String>,
    pub user_base_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_mae: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_mae: Option<f64>,
}
