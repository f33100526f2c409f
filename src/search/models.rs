//! Insight query and related data models

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted query text, in characters
pub const MAX_QUERY_CHARS: usize = 400;

/// Instructions used when the caller supplies none
pub const DEFAULT_INSTRUCTIONS: &str = "Focus on practical, evidence-backed guidance \
a change manager could act on this week.";

/// One insight search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightQuery {
    /// Free-text query
    pub text: String,
    /// Label narrowing search and generation (e.g. "Change Readiness")
    #[serde(default)]
    pub topic_filter: Option<String>,
    /// Template controlling the desired output shape
    #[serde(default)]
    pub instructions: String,
    /// Caller override of the provider result count
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl InsightQuery {
    /// Create a new query with default instructions
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            topic_filter: None,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_results: None,
        }
    }

    /// Set topic filter
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic_filter = Some(topic.into());
        self
    }

    /// Set instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set result count
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Reject queries the orchestrator must never see.
    ///
    /// Trims the text and topic in place so downstream code sees the
    /// normalized values.
    pub fn validate(&mut self) -> Result<()> {
        self.text = self.text.trim().to_string();
        if self.text.is_empty() {
            return Err(InsightError::InvalidInput("query must not be empty".to_string()));
        }
        if self.text.chars().count() > MAX_QUERY_CHARS {
            return Err(InsightError::InvalidInput(format!(
                "query must be at most {} characters",
                MAX_QUERY_CHARS
            )));
        }
        self.topic_filter = self
            .topic_filter
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if self.instructions.trim().is_empty() {
            self.instructions = DEFAULT_INSTRUCTIONS.to_string();
        }
        if self.max_results == Some(0) {
            return Err(InsightError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Topic filter, if one was given and is not blank
    pub fn topic(&self) -> Option<&str> {
        self.topic_filter
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Text sent to the search provider: the query narrowed by the topic label
    pub fn provider_query(&self) -> String {
        match self.topic() {
            Some(topic) => format!("{} {}", self.text.trim(), topic),
            None => self.text.trim().to_string(),
        }
    }

    /// Result count bounded by the configured limit
    pub fn effective_max_results(&self, default: u32, limit: u32) -> u32 {
        self.max_results.unwrap_or(default).clamp(1, limit.max(1))
    }

    /// Title mentioning both the query and the topic label
    pub fn canonical_title(&self) -> String {
        match self.topic() {
            Some(topic) => format!("{} Insights: {}", topic, self.text.trim()),
            None => format!("Insights: {}", self.text.trim()),
        }
    }

    /// Whether a title mentions the query text and the topic label
    pub fn title_matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        let has_query = title.contains(&self.text.trim().to_lowercase());
        let has_topic = self
            .topic()
            .map(|t| title.contains(&t.to_lowercase()))
            .unwrap_or(true);
        has_query && has_topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank() {
        let mut query = InsightQuery::new("   ");
        assert!(matches!(
            query.validate(),
            Err(InsightError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_normalizes() {
        let mut query = InsightQuery::new("  onboarding resistance ")
            .with_topic("   ")
            .with_instructions("");
        query.validate().unwrap();
        assert_eq!(query.text, "onboarding resistance");
        assert!(query.topic_filter.is_none());
        assert_eq!(query.instructions, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn test_validate_rejects_zero_results() {
        let mut query = InsightQuery::new("x").with_max_results(0);
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_provider_query_includes_topic() {
        let query = InsightQuery::new("onboarding resistance").with_topic("Change Readiness");
        assert_eq!(query.provider_query(), "onboarding resistance Change Readiness");
        assert_eq!(InsightQuery::new("q").provider_query(), "q");
    }

    #[test]
    fn test_effective_max_results() {
        let query = InsightQuery::new("q");
        assert_eq!(query.effective_max_results(5, 10), 5);
        assert_eq!(query.clone().with_max_results(50).effective_max_results(5, 10), 10);
        assert_eq!(query.with_max_results(2).effective_max_results(5, 10), 2);
    }

    #[test]
    fn test_canonical_title_matches() {
        let query = InsightQuery::new("onboarding resistance").with_topic("Change Readiness");
        let title = query.canonical_title();
        assert_eq!(title, "Change Readiness Insights: onboarding resistance");
        assert!(query.title_matches(&title));
        assert!(!query.title_matches("Onboarding resistance explained"));
    }
}
