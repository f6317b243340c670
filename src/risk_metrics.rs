use crate::types::{ReturnsDistribution, RiskLevel, RiskMetrics, RollingBetaPoint};
use crate::utils::{
    mean, percentile, round_to, sample_covariance, sample_kurtosis, sample_skewness, sample_std,
    sample_variance, simple_returns,
};

const TRADING_DAYS: f64 = 252.0;
const RISK_FREE_DAILY: f64 = 0.02 / 252.0;
const ROLLING_BETA_WINDOW: usize = 30;

/// Covariance of stock vs benchmark returns over benchmark variance.
/// A flat benchmark (zero variance) yields exactly 0 rather than a
/// division error.
pub fn calculate_beta(stock_returns: &[f64], market_returns: &[f64]) -> f64 {
    let market_variance = sample_variance(market_returns);
    if market_variance == 0.0 {
        return 0.0;
    }
    sample_covariance(stock_returns, market_returns) / market_variance
}

/// Most negative decline from the running peak, as a percentage (<= 0).
pub fn calculate_max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;
    for &price in prices {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            let drawdown = (price - peak) / peak;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }
    max_drawdown * 100.0
}

/// Composite risk score: |beta - 1| * 30 + (volatility / 100) * 70,
/// bucketed into five fixed bands.
pub fn get_risk_level(beta: f64, volatility: f64) -> RiskLevel {
    let score = (beta - 1.0).abs() * 30.0 + volatility / 100.0 * 70.0;
    let (level, color) = if score < 15.0 {
        ("low", "#22c55e")
    } else if score < 30.0 {
        ("medium-low", "#84cc16")
    } else if score < 50.0 {
        ("medium", "#eab308")
    } else if score < 70.0 {
        ("medium-high", "#f97316")
    } else {
        ("high", "#ef4444")
    };
    RiskLevel {
        level: level.to_string(),
        color: color.to_string(),
        score: round_to(score, 1),
    }
}

/// Full risk metric set for a stock series against a benchmark series.
/// Alignment takes the last `min` return observations of each series
/// (suffix overlap, not date-matched). Assumes both series have at least
/// 2 bars; the engine rejects shorter input upstream.
pub fn calculate_risk_metrics(stock_closes: &[f64], market_closes: &[f64]) -> RiskMetrics {
    let stock_returns = simple_returns(stock_closes);
    let market_returns = simple_returns(market_closes);

    let min_len = stock_returns.len().min(market_returns.len());
    let stock_returns = &stock_returns[stock_returns.len() - min_len..];
    let market_returns = &market_returns[market_returns.len() - min_len..];

    let beta = calculate_beta(stock_returns, market_returns);

    let std_daily = sample_std(stock_returns);
    let volatility = std_daily * TRADING_DAYS.sqrt() * 100.0;

    let sharpe_ratio = if std_daily != 0.0 {
        (mean(stock_returns) * TRADING_DAYS) / (std_daily * TRADING_DAYS.sqrt())
    } else {
        0.0
    };

    let negative_returns: Vec<f64> = stock_returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = if negative_returns.is_empty() {
        0.0
    } else {
        sample_std(&negative_returns) * TRADING_DAYS.sqrt()
    };
    let sortino_ratio = if downside_std != 0.0 {
        (mean(stock_returns) * TRADING_DAYS) / downside_std
    } else {
        0.0
    };

    let var_95 = percentile(stock_returns, 5.0) * 100.0;

    let max_drawdown = calculate_max_drawdown(stock_closes);

    let alpha = (mean(stock_returns)
        - RISK_FREE_DAILY
        - beta * (mean(market_returns) - RISK_FREE_DAILY))
        * TRADING_DAYS
        * 100.0;

    RiskMetrics {
        beta: round_to(beta, 4),
        volatility: round_to(volatility, 2),
        sharpe_ratio: round_to(sharpe_ratio, 4),
        sortino_ratio: round_to(sortino_ratio, 4),
        var_95: round_to(var_95, 2),
        max_drawdown: round_to(max_drawdown, 2),
        alpha: round_to(alpha, 4),
        risk_level: get_risk_level(beta, volatility),
    }
}

/// Distribution summary of the daily return sample (last 252 raw values
/// plus whole-sample moments).
pub fn calculate_returns_distribution(stock_returns: &[f64]) -> ReturnsDistribution {
    let tail_start = stock_returns.len().saturating_sub(252);
    ReturnsDistribution {
        values: stock_returns[tail_start..].to_vec(),
        mean: round_to(mean(stock_returns) * 100.0, 4),
        std: round_to(sample_std(stock_returns) * 100.0, 4),
        skew: round_to(sample_skewness(stock_returns), 4),
        kurtosis: round_to(sample_kurtosis(stock_returns), 4),
    }
}

/// 30-observation rolling beta over the aligned return suffix. `dates`
/// must align one-to-one with `stock_returns`.
pub fn calculate_rolling_beta(
    stock_returns: &[f64],
    market_returns: &[f64],
    dates: &[String],
) -> Vec<RollingBetaPoint> {
    let min_len = stock_returns.len().min(market_returns.len());
    let stock_returns = &stock_returns[stock_returns.len() - min_len..];
    let market_returns = &market_returns[market_returns.len() - min_len..];
    let dates = &dates[dates.len() - min_len.min(dates.len())..];

    let mut points = Vec::new();
    for i in ROLLING_BETA_WINDOW..min_len {
        let beta = calculate_beta(
            &stock_returns[i - ROLLING_BETA_WINDOW..i],
            &market_returns[i - ROLLING_BETA_WINDOW..i],
        );
        points.push(RollingBetaPoint {
            date: dates.get(i).cloned().unwrap_or_default(),
            beta: round_to(beta, 4),
        });
    }
    points
}
