//! Application state shared across handlers

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::providers::ProviderLoader;
use crate::search::Orchestrator;
use crate::usage::UsageMeter;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search-and-summarize orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Per-user quota gate
    pub usage: Arc<UsageMeter>,
}

impl AppState {
    /// Wire providers, orchestrator and usage meter from settings
    pub fn new(settings: Settings, client: HttpClient) -> anyhow::Result<Self> {
        let search_provider = ProviderLoader::search(&settings)?;
        let generation_provider = ProviderLoader::generation(&settings)?;

        let orchestrator = Orchestrator::from_settings(
            &settings,
            client.clone(),
            search_provider,
            generation_provider,
        );
        let usage = UsageMeter::from_settings(&settings.usage, &client);

        Ok(Self::from_parts(settings, orchestrator, usage))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(settings: Settings, orchestrator: Orchestrator, usage: UsageMeter) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            usage: Arc::new(usage),
        }
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.orchestrator.metrics()
    }
}
