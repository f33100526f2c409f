//! Tavily web search provider

use super::traits::*;
use crate::config::SearchProviderSettings;
use crate::error::Result;
use crate::results::SearchResult;
use serde::Deserialize;

/// Tavily search API adapter
pub struct Tavily {
    base_url: String,
    api_key: String,
    search_depth: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl Tavily {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            api_key: api_key.into(),
            search_depth: "basic".to_string(),
        }
    }

    pub fn from_settings(settings: &SearchProviderSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            search_depth: settings.search_depth.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl SearchProvider for Tavily {
    fn name(&self) -> &str {
        "tavily"
    }

    fn request(&self, params: &SearchParams) -> Result<ProviderRequest> {
        let mut body = serde_json::json!({
            "api_key": self.api_key,
            "query": params.query,
            "max_results": params.max_results,
            "search_depth": self.search_depth,
            "include_answer": true,
        });
        if let Some(ref topic) = params.topic {
            body["topic"] = serde_json::Value::String(topic.clone());
        }

        Ok(ProviderRequest::post(format!("{}/search", self.base_url))
            .header("Content-Type", "application/json")
            .json(body))
    }

    fn response(&self, response: ProviderResponse) -> Result<SearchOutput> {
        let parsed: TavilyResponse = response.json(self.name())?;

        let results = parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title.trim().to_string(),
                url: r.url,
                content: r.content.unwrap_or_default(),
                published_date: r.published_date,
                score: r.score,
            })
            .collect();

        let answer = parsed
            .answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Ok(SearchOutput { results, answer })
    }
}
