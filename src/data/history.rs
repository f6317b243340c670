use chrono::DateTime;

use crate::data::http_client::http_client;
use crate::types::PriceBar;
use crate::utils::{DATETIME_FMT, DATE_FMT};

/// Fetch OHLCV history from the chart API. `interval` is "1d" or "1h";
/// bars come back ascending with the matching date format.
pub async fn fetch_history(symbol: &str, period: &str, interval: &str) -> Result<Vec<PriceBar>, String> {
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval={}",
        urlencoding::encode(symbol),
        period,
        interval
    );

    let client = http_client().await?;

    // Retry up to 3 times for network errors
    let mut last_error = None;
    for attempt in 0..3 {
        let response_result = client
            .get(&url)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await;

        match response_result {
            Ok(response) => {
                if !response.status().is_success() {
                    return Err(format!("API error: {}", response.status()));
                }

                match response.json::<serde_json::Value>().await {
                    Ok(json) => return parse_chart_response(&json, interval),
                    Err(e) => {
                        last_error = Some(format!("Parse error: {}", e));
                        if attempt < 2 {
                            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                            continue;
                        }
                    }
                }
            }
            Err(e) => {
                last_error = Some(format!("Network error: {}", e));
                if attempt < 2 {
                    eprintln!("fetch_history {} attempt {} failed: {}", symbol, attempt + 1, e);
                    tokio::time::sleep(tokio::time::Duration::from_millis(500 * (attempt + 1) as u64)).await;
                    continue;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| "Unknown error".to_string()))
}

fn parse_chart_response(json: &serde_json::Value, interval: &str) -> Result<Vec<PriceBar>, String> {
    let result = &json["chart"]["result"][0];
    if result.is_null() {
        let err = json["chart"]["error"]["description"]
            .as_str()
            .unwrap_or("No data returned");
        return Err(err.to_string());
    }

    let timestamps = result["timestamp"].as_array().ok_or("No timestamp data")?;
    let quote = &result["indicators"]["quote"][0];
    let opens = quote["open"].as_array().ok_or("No quote data")?;
    let highs = quote["high"].as_array().ok_or("No quote data")?;
    let lows = quote["low"].as_array().ok_or("No quote data")?;
    let closes = quote["close"].as_array().ok_or("No quote data")?;
    let volumes = quote["volume"].as_array().ok_or("No quote data")?;

    let fmt = if interval == "1h" { DATETIME_FMT } else { DATE_FMT };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (
            ts.as_i64(),
            opens.get(i).and_then(|v| v.as_f64()),
            highs.get(i).and_then(|v| v.as_f64()),
            lows.get(i).and_then(|v| v.as_f64()),
            closes.get(i).and_then(|v| v.as_f64()),
        ) else {
            // Null bars (halts, partial sessions) are skipped entirely
            continue;
        };

        let date = DateTime::from_timestamp(ts, 0)
            .ok_or("Invalid timestamp")?
            .naive_utc()
            .format(fmt)
            .to_string();

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: volumes.get(i).and_then(|v| v.as_i64()).unwrap_or(0),
        });
    }

    Ok(bars)
}
