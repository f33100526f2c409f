//! Locally synthesized summary used when generation is unavailable

use super::models::InsightQuery;
use super::summary::{references_from_results, strip_markup};
use crate::results::{SearchResult, Summary, SummaryOrigin};

/// Most insights taken from the search provider's short answer
const MAX_ANSWER_INSIGHTS: usize = 4;

/// Build a summary from search data alone. Infallible and deterministic.
pub fn fallback_summary(
    query: &InsightQuery,
    results: &[SearchResult],
    answer: Option<&str>,
) -> Summary {
    let insights = answer
        .map(answer_insights)
        .filter(|insights| !insights.is_empty())
        .unwrap_or_else(|| generic_insights(query));

    Summary {
        title: query.canonical_title(),
        insights,
        references: references_from_results(results),
        origin: SummaryOrigin::Fallback,
    }
}

/// Split the provider's answer into sentence-sized insights
fn answer_insights(answer: &str) -> Vec<String> {
    let cleaned = strip_markup(answer);
    let mut insights = Vec::new();
    let mut current = String::new();

    let mut chars = cleaned.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            push_sentence(&mut insights, &mut current);
        }
    }
    push_sentence(&mut insights, &mut current);

    insights.truncate(MAX_ANSWER_INSIGHTS);
    insights
}

fn push_sentence(insights: &mut Vec<String>, current: &mut String) {
    let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        insights.push(sentence);
    }
    current.clear();
}

/// Generic change-management guidance parameterized by query and topic
fn generic_insights(query: &InsightQuery) -> Vec<String> {
    let subject = query.text.trim();
    let topic = query.topic().unwrap_or("change");

    vec![
        format!(
            "Clear, consistent communication about {} reduces uncertainty and builds trust during {} efforts.",
            subject, topic
        ),
        format!(
            "Involving the people affected by {} early turns potential resistance into ownership of {} outcomes.",
            subject, topic
        ),
        format!(
            "Equipping managers to coach their teams through {} keeps {} work moving after launch.",
            subject, topic
        ),
        format!(
            "Tracking adoption signals for {} lets leaders adjust {} plans before issues escalate.",
            subject, topic
        ),
    ]
}
