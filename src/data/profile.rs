use crate::data::http_client::http_client;
use crate::types::{StockProfile, SymbolMatch};

/// Fetch issuer metadata. Missing fields fall back to the defaults in
/// `StockProfile::default` rather than failing the request.
pub async fn fetch_profile(symbol: &str) -> Result<StockProfile, String> {
    let url = format!(
        "https://query1.finance.yahoo.com/v7/finance/quote?symbols={}",
        urlencoding::encode(symbol)
    );

    let client = http_client().await?;

    let response = client
        .get(&url)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()));
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("Parse error: {}", e))?;

    Ok(parse_profile(&json, symbol))
}

fn parse_profile(json: &serde_json::Value, symbol: &str) -> StockProfile {
    let quote = &json["quoteResponse"]["result"][0];
    let defaults = StockProfile::default();

    if quote.is_null() {
        return defaults;
    }

    StockProfile {
        name: quote["longName"]
            .as_str()
            .or_else(|| quote["shortName"].as_str())
            .unwrap_or(symbol)
            .to_string(),
        currency: quote["currency"].as_str().unwrap_or("USD").to_string(),
        exchange: quote["fullExchangeName"]
            .as_str()
            .or_else(|| quote["exchange"].as_str())
            .unwrap_or("N/A")
            .to_string(),
        sector: quote["sector"].as_str().unwrap_or("N/A").to_string(),
        industry: quote["industry"].as_str().unwrap_or("N/A").to_string(),
        market_cap: quote["marketCap"].as_i64().unwrap_or(0),
        pe_ratio: quote["trailingPE"].as_f64().unwrap_or(0.0),
        dividend_yield: quote["dividendYield"].as_f64().unwrap_or(0.0),
        fifty_two_week_high: quote["fiftyTwoWeekHigh"].as_f64().unwrap_or(0.0),
        fifty_two_week_low: quote["fiftyTwoWeekLow"].as_f64().unwrap_or(0.0),
    }
}

pub(crate) fn parse_search_results(json: &serde_json::Value) -> Vec<SymbolMatch> {
    let Some(quotes) = json["quotes"].as_array() else {
        return Vec::new();
    };

    quotes
        .iter()
        .filter_map(|q| {
            let symbol = q["symbol"].as_str()?;
            Some(SymbolMatch {
                symbol: symbol.to_string(),
                name: q["longname"]
                    .as_str()
                    .or_else(|| q["shortname"].as_str())
                    .unwrap_or(symbol)
                    .to_string(),
                exchange: q["exchange"].as_str().unwrap_or("N/A").to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_profile_fields_get_defaults() {
        let payload = json!({
            "quoteResponse": {
                "result": [{ "longName": "Acme Corp", "marketCap": 5_000_000i64 }]
            }
        });
        let profile = parse_profile(&payload, "ACME");
        assert_eq!(profile.name, "Acme Corp");
        assert_eq!(profile.market_cap, 5_000_000);
        assert_eq!(profile.sector, "N/A");
        assert_eq!(profile.pe_ratio, 0.0);
        assert_eq!(profile.dividend_yield, 0.0);
    }

    #[test]
    fn empty_quote_response_yields_full_defaults() {
        let payload = json!({ "quoteResponse": { "result": [] } });
        let profile = parse_profile(&payload, "ACME");
        assert_eq!(profile.name, "N/A");
        assert_eq!(profile.currency, "USD");
    }
}
