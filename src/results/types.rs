//! Result type definitions

use serde::{Deserialize, Serialize};

/// A single web search result, as ranked by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Content snippet; may be empty
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Provider relevance score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// Create a new result
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: String::new(),
            published_date: None,
            score: None,
        }
    }

    /// Add content to the result
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Get the hostname from the URL
    pub fn hostname(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
    }

    /// Label used when this result is cited as a reference
    pub fn reference_label(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        self.hostname().unwrap_or_else(|| self.url.clone())
    }
}

/// A cited source in a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub label: String,
    pub url: String,
}

impl Reference {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    /// Reference pointing straight at a search result
    pub fn from_result(result: &SearchResult) -> Self {
        Self::new(result.reference_label(), result.url.clone())
    }
}

/// How a summary was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryOrigin {
    /// Written by the generation provider and post-processed
    #[default]
    Generated,
    /// Synthesized locally from search data after generation failed
    Fallback,
}

/// Structured insight summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub insights: Vec<String>,
    pub references: Vec<Reference>,
    #[serde(default)]
    pub origin: SummaryOrigin,
}

impl Summary {
    pub fn is_fallback(&self) -> bool {
        self.origin == SummaryOrigin::Fallback
    }
}

/// Output of one search-and-summarize call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: Summary,
    pub results: Vec<SearchResult>,
    /// Search provider's short answer, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}
