//! Provider traits and types

use crate::error::{InsightError, Result};
use crate::results::SearchResult;
use std::collections::HashMap;
use std::time::Duration;

/// Parameters for building a web search request
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Text sent to the provider (query plus topic narrowing)
    pub query: String,
    /// Upper bound on returned results
    pub max_results: u32,
    /// Coarse provider-side category hint
    pub topic: Option<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Parsed search provider output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutput {
    /// Results in provider relevance order
    pub results: Vec<SearchResult>,
    /// Provider's own short answer, when it produced one
    pub answer: Option<String>,
}

/// Parameters for a text generation request
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub system_instructions: String,
    pub user_prompt: String,
}

/// HTTP request to be made on behalf of a provider
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub params: HashMap<String, String>,
    /// Request body
    pub data: Option<RequestBody>,
    /// Per-call timeout overriding the client default
    pub timeout: Option<Duration>,
}

impl ProviderRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Get)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Post)
    }

    fn with_method(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            params: HashMap::new(),
            data: None,
            timeout: None,
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a bearer token authorization header
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add JSON body
    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.data = Some(RequestBody::Json(data));
        self
    }

    /// Override the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body types
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
}

/// HTTP response from a provider request
#[derive(Debug)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
}

impl ProviderResponse {
    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self, provider: &str) -> Result<T> {
        serde_json::from_str(&self.text).map_err(|e| InsightError::Decode {
            provider: provider.to_string(),
            message: e.to_string(),
        })
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pass 2xx responses through and classify everything else
    pub fn into_result(self, provider: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let provider = provider.to_string();
        let status = self.status;
        let message = truncate(&self.text, 200);

        Err(match status {
            401 | 403 => InsightError::ProviderAuth { provider, status },
            429 | 500..=599 => InsightError::ProviderTransient {
                provider,
                status: Some(status),
                message,
            },
            _ => InsightError::ProviderRejected {
                provider,
                status,
                message,
            },
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A web search provider.
///
/// Adapters only translate between our types and the wire format; the
/// orchestrator owns execution, retries and cancellation.
pub trait SearchProvider: Send + Sync {
    /// Provider name used in logs, metrics and errors
    fn name(&self) -> &str;

    /// Build the HTTP request for a search
    fn request(&self, params: &SearchParams) -> Result<ProviderRequest>;

    /// Parse the HTTP response into results
    fn response(&self, response: ProviderResponse) -> Result<SearchOutput>;
}

/// A text generation provider
pub trait GenerationProvider: Send + Sync {
    /// Provider name used in logs, metrics and errors
    fn name(&self) -> &str;

    /// Build the HTTP request for a completion
    fn request(&self, params: &GenerationParams) -> Result<ProviderRequest>;

    /// Extract the generated text from the HTTP response
    fn response(&self, response: ProviderResponse) -> Result<String>;
}
