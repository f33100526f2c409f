//! Provider loader for initializing adapters from configuration

use super::openai::OpenAi;
use super::tavily::Tavily;
use super::traits::{GenerationProvider, SearchProvider};
use crate::config::Settings;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Loader for initializing providers from configuration
pub struct ProviderLoader;

impl ProviderLoader {
    /// Create the configured web search provider
    pub fn search(settings: &Settings) -> Result<Arc<dyn SearchProvider>> {
        let config = &settings.search_provider;
        let provider: Arc<dyn SearchProvider> = match config.kind.as_str() {
            "tavily" => Arc::new(Tavily::from_settings(config)),
            other => anyhow::bail!("Unknown search provider: {}", other),
        };
        info!("Loaded search provider: {} ({})", provider.name(), config.base_url);
        Ok(provider)
    }

    /// Create the configured text generation provider
    pub fn generation(settings: &Settings) -> Result<Arc<dyn GenerationProvider>> {
        let config = &settings.generation;
        let provider: Arc<dyn GenerationProvider> = match config.kind.as_str() {
            "openai" | "openai_compatible" => Arc::new(OpenAi::from_settings(config)),
            other => anyhow::bail!("Unknown generation provider: {}", other),
        };
        info!(
            "Loaded generation provider: {} (model {})",
            provider.name(),
            config.model
        );
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        let settings = Settings::default();
        assert_eq!(ProviderLoader::search(&settings).unwrap().name(), "tavily");
        assert_eq!(ProviderLoader::generation(&settings).unwrap().name(), "openai");
    }

    #[test]
    fn test_unknown_kind_fails() {
        let mut settings = Settings::default();
        settings.search_provider.kind = "bing".to_string();
        assert!(ProviderLoader::search(&settings).is_err());
    }
}
