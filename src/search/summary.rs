//! Post-processing of generated text into a structured summary

use super::models::InsightQuery;
use crate::error::{InsightError, Result};
use crate::results::{Reference, SearchResult, Summary, SummaryOrigin};
use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCES_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(references|sources|citations)\s*:?\s*$").expect("valid references regex")
});

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[.)]\s+").expect("valid numbered item regex"));

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>()\[\]"]+"#).expect("valid url regex"));

static TITLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^title\s*:\s*").expect("valid title regex"));

/// Remove residual markdown tokens (`#`, `*`, backticks)
pub fn strip_markup(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '#' | '*' | '`'))
        .collect()
}

/// Turn provider output into a Summary that cites only the given results.
///
/// Fails with `GenerationFailed` when the text holds no usable insights,
/// so the caller can fall back.
pub fn parse_summary(
    generated: &str,
    query: &InsightQuery,
    results: &[SearchResult],
) -> Result<Summary> {
    let mut title: Option<String> = None;
    let mut insights = Vec::new();
    let mut paragraphs = Vec::new();
    let mut references = Vec::new();
    let mut in_references = false;

    for raw in generated.lines() {
        let (is_item, body) = split_list_marker(raw.trim());
        let line = strip_markup(body).trim().to_string();
        if line.is_empty() {
            continue;
        }

        if REFERENCES_HEADING.is_match(&line) {
            in_references = true;
            continue;
        }

        if in_references {
            // Match against the raw text: URLs may contain `#` fragments
            if let Some(reference) = parse_reference(body.trim(), results) {
                if !references.iter().any(|r: &Reference| r.url == reference.url) {
                    references.push(reference);
                }
            }
            continue;
        }

        if title.is_none() && !is_item {
            title = Some(TITLE_PREFIX.replace(&line, "").trim().to_string());
            continue;
        }

        if is_item {
            insights.push(line);
        } else {
            paragraphs.push(line);
        }
    }

    if insights.is_empty() {
        insights = paragraphs;
    }
    if insights.is_empty() {
        return Err(InsightError::GenerationFailed(
            "generated text contained no insights".to_string(),
        ));
    }

    let title = title
        .filter(|t| query.title_matches(t))
        .unwrap_or_else(|| query.canonical_title());

    if references.is_empty() {
        references = references_from_results(results);
    }

    Ok(Summary {
        title,
        insights,
        references,
        origin: SummaryOrigin::Generated,
    })
}

/// One reference per distinct result URL, in result order
pub fn references_from_results(results: &[SearchResult]) -> Vec<Reference> {
    let mut references: Vec<Reference> = Vec::with_capacity(results.len());
    for result in results {
        if !references.iter().any(|r| same_url(&r.url, &result.url)) {
            references.push(Reference::from_result(result));
        }
    }
    references
}

/// Split a leading bullet or number marker off a trimmed line
fn split_list_marker(line: &str) -> (bool, &str) {
    for marker in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return (true, rest);
        }
    }
    if let Some(m) = NUMBERED_ITEM.find(line) {
        return (true, &line[m.end()..]);
    }
    (false, line)
}

/// Parse a reference line, keeping it only if its URL is one of the results
fn parse_reference(line: &str, results: &[SearchResult]) -> Option<Reference> {
    let found = URL.find(line)?;
    let url = found.as_str().trim_end_matches(['.', ',', ';', ':', '*', '`']);
    let result = results.iter().find(|r| same_url(&r.url, url))?;

    let label = strip_markup(&line[..found.start()]);
    let label = label
        .trim()
        .trim_end_matches(['-', ':', '(', '–', '|'])
        .trim();
    let label = if label.is_empty() {
        result.reference_label()
    } else {
        label.to_string()
    };

    Some(Reference::new(label, result.url.clone()))
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}
