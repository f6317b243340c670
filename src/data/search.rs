use crate::data::http_client::http_client;
use crate::data::profile::parse_search_results;
use crate::types::SymbolMatch;

/// Best-effort symbol search. Upstream failures collapse into an empty
/// result set; they are never propagated.
pub async fn search_symbols(query: &str) -> Vec<SymbolMatch> {
    let url = format!(
        "https://query1.finance.yahoo.com/v1/finance/search?q={}&quotesCount=10&newsCount=0",
        urlencoding::encode(query)
    );

    let client = match http_client().await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("search_symbols client error: {}", e);
            return Vec::new();
        }
    };

    let response = match client
        .get(&url)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            eprintln!("search_symbols API error: {}", r.status());
            return Vec::new();
        }
        Err(e) => {
            eprintln!("search_symbols network error: {}", e);
            return Vec::new();
        }
    };

    match response.json::<serde_json::Value>().await {
        Ok(json) => parse_search_results(&json),
        Err(e) => {
            eprintln!("search_symbols parse error: {}", e);
            Vec::new()
        }
    }
}
