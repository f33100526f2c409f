//! Error types for insight search

use thiserror::Error;

/// Result type alias using InsightError
pub type Result<T> = std::result::Result<T, InsightError>;

/// Errors raised while validating, orchestrating or serving an insight search
#[derive(Debug, Error)]
pub enum InsightError {
    /// Caller supplied an unusable query
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider rejected our credentials (401/403)
    #[error("{provider} rejected credentials (HTTP {status})")]
    ProviderAuth { provider: String, status: u16 },

    /// Rate limiting, 5xx, connection failures and per-call timeouts
    #[error("{provider} transient failure: {message}")]
    ProviderTransient {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Any other non-retryable 4xx
    #[error("{provider} rejected request (HTTP {status}): {message}")]
    ProviderRejected {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider answered 2xx with a body we could not interpret
    #[error("{provider} returned an unreadable response: {message}")]
    Decode { provider: String, message: String },

    #[error("Request cancelled")]
    Cancelled,

    /// Overall orchestration deadline elapsed
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("No search results for '{0}'")]
    NoResults(String),

    /// Generation exhausted retries. Never leaves the orchestrator.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Daily limit of {limit} insight searches reached on the {tier} plan")]
    QuotaExceeded { tier: String, limit: u32 },

    #[error("Missing caller identity")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage store error: {0}")]
    Store(String),
}

impl InsightError {
    /// Whether a provider call that failed with this error may be attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderTransient { .. })
    }

    /// Cancellation and the overall deadline both abort without fallback
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }

    /// Whether the end user should be told to try again rather than fix their input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTransient { .. } | Self::Timeout(_) | Self::Cancelled
        )
    }

    /// Stable machine-readable kind for API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ProviderAuth { .. } => "provider_auth",
            Self::ProviderTransient { .. } => "provider_transient",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Decode { .. } => "decode",
            Self::Cancelled => "cancelled",
            Self::Timeout(_) => "timeout",
            Self::NoResults(_) => "no_results",
            Self::GenerationFailed(_) => "generation_failed",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Unauthenticated => "unauthenticated",
            Self::Config(_) => "config",
            Self::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let err = InsightError::ProviderTransient {
            provider: "tavily".to_string(),
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
        assert!(err.is_retryable());

        let auth = InsightError::ProviderAuth {
            provider: "openai".to_string(),
            status: 401,
        };
        assert!(!auth.is_transient());
        assert!(!auth.is_retryable());
    }

    #[test]
    fn test_abort_kinds() {
        assert!(InsightError::Cancelled.is_abort());
        assert!(InsightError::Timeout(std::time::Duration::from_secs(1)).is_abort());
        assert!(!InsightError::NoResults("x".into()).is_abort());
        assert_eq!(InsightError::Cancelled.kind(), "cancelled");
    }
}
