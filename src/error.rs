/// Unified error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// No bars, or fewer bars than the operation's minimum window.
    DataInsufficient(String),
    /// No requested forecaster could produce a result.
    ModelFit(String),
    /// Malformed submission, rejected before any state mutation.
    Validation(String),
    /// Provider fetch failure; the upstream message is preserved.
    Upstream(String),
}

impl AnalyticsError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataInsufficient(_) => "data_insufficient",
            Self::ModelFit(_) => "model_fit_failure",
            Self::Validation(_) => "validation_failure",
            Self::Upstream(_) => "upstream_unavailable",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::DataInsufficient(msg)
            | Self::ModelFit(msg)
            | Self::Validation(msg)
            | Self::Upstream(msg) => msg,
        }
    }
}

impl std::fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for AnalyticsError {}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
