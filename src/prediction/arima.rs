use crate::types::ForecastSeries;
use crate::utils::{gaussian_elimination, mean};

/// AR order for daily forecasts, i.e. ARIMA(5,1,0).
pub const DAILY_AR_ORDER: usize = 5;
/// AR order for hourly forecasts, i.e. ARIMA(3,1,0).
pub const HOURLY_AR_ORDER: usize = 3;

const MIN_OBSERVATIONS: usize = 30;
/// Two-sided 95% normal quantile for the forecast intervals.
const Z_95: f64 = 1.96;

struct ArFit {
    coeffs: Vec<f64>,
    mean: f64,
    residual_variance: f64,
}

/// Fixed-order ARIMA(p,1,0) forecast over closing prices: fit an AR(p)
/// to the first-differenced series by Yule-Walker, iterate the recursion
/// `horizon` steps, integrate back onto the last price, and derive 95%
/// interval bounds from the model's cumulative psi-weights.
pub fn forecast_arima(closes: &[f64], p: usize, horizon: usize) -> Result<ForecastSeries, String> {
    if horizon == 0 {
        return Err("Forecast horizon must be positive".to_string());
    }
    if closes.len() < MIN_OBSERVATIONS.max(p + 2) {
        return Err(format!(
            "Need at least {} data points for ARIMA({},1,0)",
            MIN_OBSERVATIONS.max(p + 2),
            p
        ));
    }

    let diffs: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let fit = fit_ar(&diffs, p)?;

    let last_price = *closes.last().unwrap();

    // Iterate the AR recursion on (demeaned) differences
    let mut history: Vec<f64> = diffs.clone();
    let mut predicted_diffs = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let next = predict_next_diff(&history, &fit);
        history.push(next);
        predicted_diffs.push(next);
    }

    // Integrate back to price levels
    let mut predictions = Vec::with_capacity(horizon);
    let mut level = last_price;
    for &diff in &predicted_diffs {
        level += diff;
        predictions.push(level);
    }

    // Interval width from the integrated psi-weights:
    // var(h) = sigma^2 * sum_{j<h} Psi_j^2, Psi_j = sum_{i<=j} psi_i
    let cumulative_psi = integrated_psi_weights(&fit.coeffs, horizon);
    let mut lower_bound = Vec::with_capacity(horizon);
    let mut upper_bound = Vec::with_capacity(horizon);
    let mut psi_square_sum = 0.0;
    for (step, &pred) in predictions.iter().enumerate() {
        psi_square_sum += cumulative_psi[step].powi(2);
        let std_err = (fit.residual_variance * psi_square_sum).sqrt();
        lower_bound.push(pred - Z_95 * std_err);
        upper_bound.push(pred + Z_95 * std_err);
    }

    let all_finite = predictions
        .iter()
        .chain(lower_bound.iter())
        .chain(upper_bound.iter())
        .all(|v| v.is_finite());
    if !all_finite {
        return Err("ARIMA forecast diverged to non-finite values".to_string());
    }

    Ok(ForecastSeries {
        predictions,
        lower_bound,
        upper_bound,
    })
}

/// Yule-Walker estimation: autocovariances up to lag p, then the p x p
/// Toeplitz system solved by Gaussian elimination. A flat series (zero
/// variance) degrades to zero coefficients.
fn fit_ar(diffs: &[f64], p: usize) -> Result<ArFit, String> {
    if diffs.len() < p + 1 {
        return Err("Insufficient differenced data for AR estimation".to_string());
    }

    let mu = mean(diffs);
    let centered: Vec<f64> = diffs.iter().map(|&x| x - mu).collect();
    let n = centered.len();

    let mut autocov = vec![0.0; p + 1];
    for lag in 0..=p {
        let mut sum = 0.0;
        for i in lag..n {
            sum += centered[i] * centered[i - lag];
        }
        autocov[lag] = sum / n as f64;
    }

    let coeffs = if autocov[0] <= 0.0 {
        vec![0.0; p]
    } else {
        let mut matrix = vec![vec![0.0; p]; p];
        for i in 0..p {
            for j in 0..p {
                matrix[i][j] = autocov[(i as i64 - j as i64).unsigned_abs() as usize];
            }
        }
        let mut rhs: Vec<f64> = autocov[1..=p].to_vec();
        gaussian_elimination(&mut matrix, &mut rhs)
    };

    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err("AR coefficient estimation produced non-finite values".to_string());
    }

    let residual_variance = residual_variance(&centered, &coeffs);

    Ok(ArFit {
        coeffs,
        mean: mu,
        residual_variance,
    })
}

fn residual_variance(centered: &[f64], coeffs: &[f64]) -> f64 {
    let p = coeffs.len();
    if centered.len() <= p {
        return 0.0;
    }
    let mut sum_sq = 0.0;
    let mut count = 0;
    for i in p..centered.len() {
        let mut predicted = 0.0;
        for (j, &phi) in coeffs.iter().enumerate() {
            predicted += phi * centered[i - 1 - j];
        }
        let residual = centered[i] - predicted;
        sum_sq += residual * residual;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum_sq / count as f64
    }
}

fn predict_next_diff(history: &[f64], fit: &ArFit) -> f64 {
    let n = history.len();
    let mut prediction = 0.0;
    for (i, &phi) in fit.coeffs.iter().enumerate() {
        if n > i {
            prediction += phi * (history[n - 1 - i] - fit.mean);
        }
    }
    prediction + fit.mean
}

/// Psi-weights of the AR(p) in differences, accumulated through the
/// integration step so they apply to price levels.
fn integrated_psi_weights(coeffs: &[f64], horizon: usize) -> Vec<f64> {
    let p = coeffs.len();
    let mut psi = vec![0.0; horizon];
    let mut cumulative = vec![0.0; horizon];
    let mut running = 0.0;
    for j in 0..horizon {
        psi[j] = if j == 0 {
            1.0
        } else {
            let mut value = 0.0;
            for k in 1..=p.min(j) {
                value += coeffs[k - 1] * psi[j - k];
            }
            value
        };
        running += psi[j];
        cumulative[j] = running;
    }
    cumulative
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.9).sin() * 2.0)
            .collect()
    }

    #[test]
    fn forecast_has_horizon_lengths_and_ordered_bounds() {
        let closes = trending_closes(120);
        let result = forecast_arima(&closes, DAILY_AR_ORDER, 30).unwrap();
        assert_eq!(result.predictions.len(), 30);
        assert_eq!(result.lower_bound.len(), 30);
        assert_eq!(result.upper_bound.len(), 30);
        for i in 0..30 {
            assert!(result.lower_bound[i] <= result.upper_bound[i]);
        }
    }

    #[test]
    fn intervals_widen_with_horizon() {
        let closes = trending_closes(200);
        let result = forecast_arima(&closes, DAILY_AR_ORDER, 10).unwrap();
        let first_width = result.upper_bound[0] - result.lower_bound[0];
        let last_width = result.upper_bound[9] - result.lower_bound[9];
        assert!(last_width >= first_width);
    }

    #[test]
    fn too_little_history_is_rejected() {
        let closes = trending_closes(20);
        assert!(forecast_arima(&closes, DAILY_AR_ORDER, 5).is_err());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let closes = trending_closes(120);
        assert!(forecast_arima(&closes, DAILY_AR_ORDER, 0).is_err());
    }

    #[test]
    fn flat_series_forecasts_flat_with_tight_bounds() {
        let closes = vec![42.0; 80];
        let result = forecast_arima(&closes, HOURLY_AR_ORDER, 5).unwrap();
        for &p in &result.predictions {
            assert!((p - 42.0).abs() < 1e-9);
        }
        for i in 0..5 {
            assert!((result.upper_bound[i] - result.lower_bound[i]).abs() < 1e-9);
        }
    }
}
