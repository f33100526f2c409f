//! External provider module
//!
//! Defines the search and generation provider traits and their adapters.

mod loader;
mod traits;

pub mod openai;
pub mod tavily;

pub use loader::ProviderLoader;
pub use traits::*;
