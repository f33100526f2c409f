//! HTTP networking module
//!
//! Provides the cancellation-aware HTTP client used by every provider.

mod client;

pub use client::HttpClient;
