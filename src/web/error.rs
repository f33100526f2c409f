//! JSON error responses

use crate::error::InsightError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error payload returned by every API route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    /// True when trying again later may succeed
    pub retryable: bool,
}

impl From<&InsightError> for ErrorBody {
    fn from(err: &InsightError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Handler error carrying an InsightError to the HTTP layer
#[derive(Debug)]
pub struct ApiError(pub InsightError);

impl From<InsightError> for ApiError {
    fn from(err: InsightError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            InsightError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            InsightError::Unauthenticated => StatusCode::UNAUTHORIZED,
            InsightError::NoResults(_) => StatusCode::NOT_FOUND,
            InsightError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            InsightError::ProviderAuth { .. }
            | InsightError::ProviderRejected { .. }
            | InsightError::Decode { .. }
            | InsightError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            InsightError::ProviderTransient { .. } | InsightError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            InsightError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            InsightError::Config(_) | InsightError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self.0, status);
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (InsightError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (InsightError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (InsightError::NoResults("x".into()), StatusCode::NOT_FOUND),
            (
                InsightError::QuotaExceeded {
                    tier: "free".into(),
                    limit: 5,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                InsightError::ProviderAuth {
                    provider: "tavily".into(),
                    status: 401,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                InsightError::Timeout(Duration::from_secs(45)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::from(&InsightError::Timeout(Duration::from_secs(1)));
        assert_eq!(body.kind, "timeout");
        assert!(body.retryable);

        let body = ErrorBody::from(&InsightError::InvalidInput("empty".into()));
        assert!(!body.retryable);
    }
}
