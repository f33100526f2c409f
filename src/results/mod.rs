//! Result types for insight searches
//!
//! Search results, summaries and the report returned to callers.

mod types;

pub use types::*;
