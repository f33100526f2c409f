//! Prompt construction for the generation provider

use super::models::InsightQuery;
use crate::config::OrchestratorSettings;
use crate::results::SearchResult;

/// System instructions sent with every summary request
pub const SYSTEM_PROMPT: &str = "You are a change management research analyst. \
You turn web research into concise, practical insights for leaders running \
organizational change. Only cite sources that appear in the provided research. \
Write plain text without markdown formatting.";

/// Character budgets for the research context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Characters of content kept per result
    pub per_result: usize,
    /// Characters of context overall
    pub total: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            per_result: 1500,
            total: 8000,
        }
    }
}

impl ContextLimits {
    pub fn from_settings(settings: &OrchestratorSettings) -> Self {
        Self {
            per_result: settings.result_char_limit,
            total: settings.context_char_limit,
        }
    }
}

/// Concatenate results into a numbered research context.
///
/// Stops adding whole results once the total budget is spent; the first
/// result is always included so the context is never empty.
pub fn build_context(results: &[SearchResult], limits: &ContextLimits) -> String {
    let mut context = String::new();

    for (i, result) in results.iter().enumerate() {
        let content = truncate_chars(result.content.trim(), limits.per_result);
        let entry = format!(
            "[{}] {}\nURL: {}\nContent: {}\n\n",
            i + 1,
            result.title.trim(),
            result.url,
            content
        );

        if i > 0 && context.chars().count() + entry.chars().count() > limits.total {
            break;
        }
        context.push_str(&entry);
    }

    context.trim_end().to_string()
}

/// Fixed output requirements appended after the caller's instructions
pub fn instruction_block(query: &InsightQuery) -> String {
    let topic = query.topic().unwrap_or("organizational change");
    format!(
        "Output requirements:\n\
         1. First line: a title that mentions \"{query}\" and \"{topic}\".\n\
         2. Then 3 to 5 bulleted insights, one per line starting with \"- \". \
         Tie every insight to {topic}.\n\
         3. End with a line reading \"References:\" followed by one line per source \
         in the form \"- Source title - URL\", using only URLs from the research above.",
        query = query.text.trim(),
        topic = topic,
    )
}

/// Full user prompt: research context, caller instructions, output requirements
pub fn user_prompt(query: &InsightQuery, results: &[SearchResult], limits: &ContextLimits) -> String {
    let topic_line = match query.topic() {
        Some(topic) => format!("Topic filter: {}\n", topic),
        None => String::new(),
    };

    format!(
        "Query: {}\n{}\nResearch:\n{}\n\nInstructions:\n{}\n\n{}",
        query.text.trim(),
        topic_line,
        build_context(results, limits),
        query.instructions.trim(),
        instruction_block(query)
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
