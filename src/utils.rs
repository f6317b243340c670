use chrono::{Duration, NaiveDate, NaiveDateTime};

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M";

pub fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    let date_part = date_str.split(' ').next().unwrap_or(date_str);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .map_err(|e| format!("Failed to parse date '{}': {}", date_str, e))
}

pub fn parse_datetime(date_str: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M"))
        .or_else(|_| parse_date(date_str).map(|d| d.and_hms_opt(0, 0, 0).unwrap()))
        .map_err(|e| format!("Failed to parse datetime '{}': {}", date_str, e))
}

pub fn add_days(date: &NaiveDate, days: i32) -> String {
    (*date + Duration::days(days as i64)).format(DATE_FMT).to_string()
}

pub fn add_hours(datetime: &NaiveDateTime, hours: i64) -> String {
    (*datetime + Duration::hours(hours)).format(DATETIME_FMT).to_string()
}

/// Round to `decimals` places; all outward-facing figures go through this
/// (2 for prices/percentages, 4 for ratios/indicators).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Simple percentage returns: r[i] = close[i]/close[i-1] - 1, length n-1.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance (divides by n).
pub fn population_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / data.len() as f64
}

/// Sample variance (divides by n-1).
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

pub fn sample_std(data: &[f64]) -> f64 {
    sample_variance(data).sqrt()
}

/// Sample covariance (divides by n-1) over the common prefix length.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = mean(&a[..n]);
    let mean_b = mean(&b[..n]);
    let sum: f64 = a[..n]
        .iter()
        .zip(b[..n].iter())
        .map(|(&x, &y)| (x - mean_a) * (y - mean_b))
        .sum();
    sum / (n - 1) as f64
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(data: &[f64], pct: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Bias-corrected sample skewness.
pub fn sample_skewness(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(data);
    let s = sample_std(data);
    if s == 0.0 {
        return 0.0;
    }
    let nf = n as f64;
    let m3: f64 = data.iter().map(|&x| ((x - m) / s).powi(3)).sum::<f64>();
    nf / ((nf - 1.0) * (nf - 2.0)) * m3
}

/// Bias-corrected sample excess kurtosis.
pub fn sample_kurtosis(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 4 {
        return 0.0;
    }
    let m = mean(data);
    let s = sample_std(data);
    if s == 0.0 {
        return 0.0;
    }
    let nf = n as f64;
    let m4: f64 = data.iter().map(|&x| ((x - m) / s).powi(4)).sum::<f64>();
    nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0)) * m4
        - 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0))
}

/// Solve a dense linear system in place via Gaussian elimination with
/// partial pivoting. Near-singular pivots are nudged by row addition so a
/// flat series degrades to zero coefficients instead of NaN.
pub fn gaussian_elimination(a: &mut [Vec<f64>], b: &mut [f64]) -> Vec<f64> {
    let n = b.len();

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > a[max_row][i].abs() {
                max_row = k;
            }
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        if a[i][i].abs() < 1e-10 {
            for j in i + 1..n {
                if a[j][i].abs() > 1e-10 {
                    for k in i..n {
                        a[i][k] += a[j][k];
                    }
                    b[i] += b[j];
                    break;
                }
            }
        }

        if a[i][i].abs() < 1e-10 {
            continue;
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
            b[k] -= factor * b[i];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = b[i];
        for j in (i + 1)..n {
            x[i] -= a[i][j] * x[j];
        }
        if a[i][i].abs() > 1e-10 {
            x[i] /= a[i][i];
        }
    }

    x
}
