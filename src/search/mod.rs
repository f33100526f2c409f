//! Search orchestration module
//!
//! Runs the web search, builds the prompt, generates the summary and
//! degrades to a locally built summary when generation fails.

mod executor;
mod fallback;
mod models;
mod prompt;
mod retry;
mod summary;

pub use executor::Orchestrator;
pub use fallback::fallback_summary;
pub use models::*;
pub use prompt::{build_context, user_prompt, ContextLimits, SYSTEM_PROMPT};
pub use retry::RetryPolicy;
pub use summary::{parse_summary, references_from_results};
