//! Insight search: web search plus LLM summarization for change-management research
//!
//! Runs one web search per request, summarizes the results with a
//! generation provider and falls back to a locally built summary when
//! generation is unavailable.

pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod providers;
pub mod results;
pub mod search;
pub mod usage;
pub mod web;

pub use config::Settings;
pub use error::{InsightError, Result};
pub use results::{InsightReport, SearchResult, Summary};
pub use search::{InsightQuery, Orchestrator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
