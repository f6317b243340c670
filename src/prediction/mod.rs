pub mod arima;
pub mod deep_learning;

pub use arima::{forecast_arima, DAILY_AR_ORDER, HOURLY_AR_ORDER};
pub use deep_learning::forecast_recurrent;

use crate::types::ForecastSeries;

pub const DEFAULT_DAILY_HORIZON: usize = 30;
pub const HOURLY_HORIZON: usize = 5;

/// Which forecaster(s) a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMethod {
    Arima,
    Lstm,
    Both,
}

impl ForecastMethod {
    pub fn parse(method: &str) -> Result<Self, String> {
        match method {
            "arima" | "statistical" => Ok(Self::Arima),
            "lstm" | "learned" => Ok(Self::Lstm),
            "both" => Ok(Self::Both),
            other => Err(format!("Unknown forecast method: {}", other)),
        }
    }

    pub fn wants_arima(self) -> bool {
        matches!(self, Self::Arima | Self::Both)
    }

    pub fn wants_lstm(self) -> bool {
        matches!(self, Self::Lstm | Self::Both)
    }
}

/// Results of the requested forecasters, each independently optional.
/// A failed forecaster simply leaves its slot empty; deciding whether
/// an all-empty result is an error belongs to the caller.
#[derive(Debug, Default)]
pub struct DualForecast {
    pub arima: Option<ForecastSeries>,
    pub lstm: Option<ForecastSeries>,
}

/// Run the requested forecasters independently over daily closes. No
/// blending: ensemble requests return both results side by side.
pub fn run_forecasters(closes: &[f64], horizon: usize, method: ForecastMethod) -> DualForecast {
    let mut result = DualForecast::default();

    if method.wants_arima() {
        match forecast_arima(closes, DAILY_AR_ORDER, horizon) {
            Ok(series) => result.arima = Some(series),
            Err(e) => eprintln!("ARIMA forecast failed: {}", e),
        }
    }

    if method.wants_lstm() {
        match forecast_recurrent(closes, horizon) {
            Ok(series) => result.lstm = Some(series),
            Err(e) => eprintln!("Recurrent forecast failed: {}", e),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing_accepts_both_vocabularies() {
        assert_eq!(ForecastMethod::parse("arima").unwrap(), ForecastMethod::Arima);
        assert_eq!(ForecastMethod::parse("statistical").unwrap(), ForecastMethod::Arima);
        assert_eq!(ForecastMethod::parse("lstm").unwrap(), ForecastMethod::Lstm);
        assert_eq!(ForecastMethod::parse("learned").unwrap(), ForecastMethod::Lstm);
        assert_eq!(ForecastMethod::parse("both").unwrap(), ForecastMethod::Both);
        assert!(ForecastMethod::parse("prophet").is_err());
    }

    #[test]
    fn failed_forecaster_leaves_slot_empty() {
        // enough for ARIMA (>=30) but below the recurrent lookback
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64 * 0.2).collect();
        let result = run_forecasters(&closes, 5, ForecastMethod::Both);
        assert!(result.arima.is_some());
        assert!(result.lstm.is_none());
    }
}
