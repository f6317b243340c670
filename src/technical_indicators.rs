use crate::types::{
    BollingerBands, DistributionStats, IndicatorValues, MovingAverages, PriceBar, Signal,
    SignalType, TechnicalSnapshot,
};
use crate::utils::{
    mean, round_to, sample_kurtosis, sample_skewness, sample_std, simple_returns,
};

pub const MIN_BARS: usize = 30;

/// Trailing simple moving average evaluated at the latest bar.
pub fn sma_latest(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window || window == 0 {
        return None;
    }
    Some(mean(&closes[closes.len() - window..]))
}

/// Recursive EMA over the whole series, seeded from the first observation.
pub fn calculate_ema(data: &[f64], span: usize) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let multiplier = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    let mut ema = data[0];
    result.push(ema);
    for &value in &data[1..] {
        ema = value * multiplier + ema * (1.0 - multiplier);
        result.push(ema);
    }
    result
}

/// RSI(14) at the latest bar: rolling mean of gains over rolling mean of
/// loss magnitudes. A zero loss mean reports 100.
pub fn rsi_latest(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return 50.0;
    }
    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in closes[closes.len() - period - 1..].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

pub struct MacdLatest {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line (EMA12 - EMA26), signal (EMA9 of the line), histogram, all
/// evaluated at the latest bar.
pub fn macd_latest(closes: &[f64]) -> MacdLatest {
    let ema12 = calculate_ema(closes, 12);
    let ema26 = calculate_ema(closes, 26);
    let macd_line: Vec<f64> = ema12.iter().zip(ema26.iter()).map(|(f, s)| f - s).collect();
    let signal_line = calculate_ema(&macd_line, 9);

    let macd = macd_line.last().copied().unwrap_or(0.0);
    let signal = signal_line.last().copied().unwrap_or(0.0);
    MacdLatest {
        macd,
        signal,
        histogram: macd - signal,
    }
}

/// 20-period Bollinger bands (mean +/- 2 sample std) at the latest bar.
pub fn bollinger_latest(closes: &[f64], window: usize) -> BollingerBands {
    let tail = &closes[closes.len().saturating_sub(window)..];
    let middle = mean(tail);
    let std = sample_std(tail);
    BollingerBands {
        upper: round_to(middle + 2.0 * std, 2),
        middle: round_to(middle, 2),
        lower: round_to(middle - 2.0 * std, 2),
    }
}

/// Stochastic %K at index `idx` from rolling min/max of closes. A zero
/// 14-period range has no defined %K and reports NaN.
fn stochastic_k_at(closes: &[f64], idx: usize, period: usize) -> f64 {
    if idx + 1 < period {
        return f64::NAN;
    }
    let window = &closes[idx + 1 - period..=idx];
    let low = window.iter().copied().fold(f64::INFINITY, f64::min);
    let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if high == low {
        return f64::NAN;
    }
    100.0 * (closes[idx] - low) / (high - low)
}

/// Latest %K and %D (3-period mean of %K). NaN %K values poison %D,
/// matching the undefined-range sentinel policy.
pub fn stochastic_latest(closes: &[f64], k_period: usize, d_period: usize) -> (f64, f64) {
    let last = closes.len() - 1;
    let k = stochastic_k_at(closes, last, k_period);
    let mut d_sum = 0.0;
    for back in 0..d_period {
        if back > last {
            return (k, f64::NAN);
        }
        d_sum += stochastic_k_at(closes, last - back, k_period);
    }
    (k, d_sum / d_period as f64)
}

/// Fixed-order signal synthesis: MA5, RSI, MACD, each fires exactly one
/// signal. The trend label is bullish only on a strict bullish majority;
/// ties resolve to bearish.
pub fn synthesize_signals(current_price: f64, ma5: f64, rsi: f64, macd: &MacdLatest) -> (Vec<Signal>, String) {
    let mut signals = Vec::with_capacity(3);

    if current_price > ma5 {
        signals.push(Signal {
            signal_type: SignalType::Bullish,
            indicator: "MA5".to_string(),
            desc: "Price above 5-day moving average".to_string(),
        });
    } else {
        signals.push(Signal {
            signal_type: SignalType::Bearish,
            indicator: "MA5".to_string(),
            desc: "Price below 5-day moving average".to_string(),
        });
    }

    if rsi > 70.0 {
        signals.push(Signal {
            signal_type: SignalType::Bearish,
            indicator: "RSI".to_string(),
            desc: format!("RSI={:.1} overbought", rsi),
        });
    } else if rsi < 30.0 {
        signals.push(Signal {
            signal_type: SignalType::Bullish,
            indicator: "RSI".to_string(),
            desc: format!("RSI={:.1} oversold", rsi),
        });
    } else {
        signals.push(Signal {
            signal_type: SignalType::Neutral,
            indicator: "RSI".to_string(),
            desc: format!("RSI={:.1} neutral", rsi),
        });
    }

    if macd.macd > macd.signal {
        signals.push(Signal {
            signal_type: SignalType::Bullish,
            indicator: "MACD".to_string(),
            desc: "MACD golden cross, bullish".to_string(),
        });
    } else {
        signals.push(Signal {
            signal_type: SignalType::Bearish,
            indicator: "MACD".to_string(),
            desc: "MACD dead cross, bearish".to_string(),
        });
    }

    let bullish = signals.iter().filter(|s| s.signal_type == SignalType::Bullish).count();
    let bearish = signals.iter().filter(|s| s.signal_type == SignalType::Bearish).count();
    let trend = if bullish > bearish { "bullish" } else { "bearish" };

    (signals, trend.to_string())
}

/// Full technical snapshot at the latest bar. Requires `MIN_BARS` bars;
/// MA60 alone degrades to None under 60 bars instead of failing.
pub fn calculate_snapshot(symbol: &str, bars: &[PriceBar]) -> Result<TechnicalSnapshot, String> {
    if bars.len() < MIN_BARS {
        return Err(format!(
            "Need at least {} bars for a technical snapshot, got {}",
            MIN_BARS,
            bars.len()
        ));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = simple_returns(&closes);
    let current_price = *closes.last().unwrap();

    let ma5 = sma_latest(&closes, 5).unwrap_or(current_price);
    let ma10 = sma_latest(&closes, 10).unwrap_or(current_price);
    let ma20 = sma_latest(&closes, 20).unwrap_or(current_price);
    let ma60 = sma_latest(&closes, 60);

    let rsi = rsi_latest(&closes, 14);
    let macd = macd_latest(&closes);
    let bollinger = bollinger_latest(&closes, 20);
    let (kdj_k, kdj_d) = stochastic_latest(&closes, 14, 3);

    let daily_std = sample_std(&returns);
    let statistics = DistributionStats {
        skewness: round_to(sample_skewness(&returns), 4),
        kurtosis: round_to(sample_kurtosis(&returns), 4),
        daily_volatility: round_to(daily_std * 100.0, 2),
        annual_volatility: round_to(daily_std * 252f64.sqrt() * 100.0, 2),
        avg_daily_return: round_to(mean(&returns) * 100.0, 4),
        cumulative_return: round_to((current_price / closes[0] - 1.0) * 100.0, 2),
    };

    let (signals, trend) = synthesize_signals(current_price, ma5, rsi, &macd);

    Ok(TechnicalSnapshot {
        symbol: symbol.to_string(),
        current_price: round_to(current_price, 2),
        moving_averages: MovingAverages {
            ma5: round_to(ma5, 2),
            ma10: round_to(ma10, 2),
            ma20: round_to(ma20, 2),
            ma60: ma60.map(|v| round_to(v, 2)),
        },
        indicators: IndicatorValues {
            rsi: round_to(rsi, 2),
            macd: round_to(macd.macd, 4),
            macd_signal: round_to(macd.signal, 4),
            macd_hist: round_to(macd.histogram, 4),
            kdj_k: round_to(kdj_k, 2),
            kdj_d: round_to(kdj_d, 2),
        },
        bollinger,
        statistics,
        signals,
        trend,
    })
}
