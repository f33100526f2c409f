//! HTTP client for making requests to search and generation providers

use crate::config::OutgoingSettings;
use crate::error::{InsightError, Result};
use crate::providers::{HttpMethod, ProviderRequest, ProviderResponse, RequestBody};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP client wrapper shared by every provider adapter
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> anyhow::Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs_f64(settings.request_timeout))
            .connect_timeout(Duration::from_secs_f64(settings.connect_timeout))
            .pool_max_idle_per_host(settings.pool_maxsize)
            .user_agent(settings.user_agent.clone())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            default_timeout: Duration::from_secs_f64(settings.request_timeout),
        })
    }

    /// Execute a provider request, failing on non-2xx statuses.
    ///
    /// Cancelling `cancel` drops the in-flight request future, which closes
    /// the underlying connection instead of leaving it to finish in the
    /// background.
    pub async fn execute(
        &self,
        provider: &str,
        request: ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse> {
        if cancel.is_cancelled() {
            return Err(InsightError::Cancelled);
        }

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let builder = self.build(request, timeout);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled in-flight request to {}", provider);
                return Err(InsightError::Cancelled);
            }
            result = Self::send(provider, builder) => result?,
        };

        response.into_result(provider)
    }

    fn build(&self, request: ProviderRequest, timeout: Duration) -> reqwest::RequestBuilder {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder
            .timeout(timeout)
            .header("Accept", "application/json");

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        if let Some(body) = request.data {
            req_builder = match body {
                RequestBody::Json(json) => req_builder.json(&json),
            };
        }

        req_builder
    }

    async fn send(provider: &str, builder: reqwest::RequestBuilder) -> Result<ProviderResponse> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;
        Self::parse_response(provider, response).await
    }

    /// Parse response into ProviderResponse
    async fn parse_response(provider: &str, response: Response) -> Result<ProviderResponse> {
        let status = response.status().as_u16();

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(provider, e))?;

        Ok(ProviderResponse { status, text })
    }
}

/// Map a reqwest transport failure onto the error taxonomy.
///
/// Connection failures and per-call timeouts are retry-worthy; a request
/// that could not even be built is a configuration problem.
fn transport_error(provider: &str, err: reqwest::Error) -> InsightError {
    if err.is_builder() {
        return InsightError::Config(format!("invalid request for {}: {}", provider, err));
    }
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };
    InsightError::ProviderTransient {
        provider: provider.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_execute_returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let request = ProviderRequest::post(format!("{}/echo", server.uri()))
            .bearer("secret")
            .json(serde_json::json!({"q": "x"}));
        let response = client
            .execute("echo", request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let value: serde_json::Value = response.json("echo").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        Mock::given(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(path("/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_string("missing query"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let cancel = CancellationToken::new();

        let err = client
            .execute("p", ProviderRequest::get(format!("{}/limited", server.uri())), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let err = client
            .execute("p", ProviderRequest::get(format!("{}/denied", server.uri())), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::ProviderAuth { status: 401, .. }));

        let err = client
            .execute("p", ProviderRequest::get(format!("{}/bad", server.uri())), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::ProviderRejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = client
            .execute("p", ProviderRequest::get(format!("{}/slow", server.uri())), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_per_call_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let request = ProviderRequest::get(format!("{}/slow", server.uri()))
            .timeout(Duration::from_millis(100));
        let err = client
            .execute("p", request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }
}
