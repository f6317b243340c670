pub mod cache;
pub mod data;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod prediction;
pub mod risk_metrics;
pub mod technical_indicators;
pub mod types;
pub mod utils;

pub use data::{MarketDataProvider, YahooProvider};
pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, Result};
pub use ledger::{PredictionInput, PredictionLedger};
