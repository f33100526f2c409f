//! Settings structures for insight search configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main settings structure matching settings.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub outgoing: OutgoingSettings,
    pub search_provider: SearchProviderSettings,
    pub generation: GenerationSettings,
    pub orchestrator: OrchestratorSettings,
    pub usage: UsageSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (INSIGHT_* prefix plus provider key names)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("INSIGHT_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("INSIGHT_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("INSIGHT_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = env_any(&["INSIGHT_SEARCH_API_KEY", "TAVILY_API_KEY"]) {
            self.search_provider.api_key = Some(val);
        }
        if let Some(val) = env_any(&["INSIGHT_GENERATION_API_KEY", "OPENAI_API_KEY"]) {
            self.generation.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("INSIGHT_GENERATION_MODEL") {
            self.generation.model = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_USAGE_STORE_URL") {
            self.usage.store_url = Some(val);
        }
        if let Ok(val) = std::env::var("INSIGHT_USAGE_STORE_KEY") {
            self.usage.store_api_key = Some(val);
        }
    }

    /// Check startup preconditions the orchestrator itself does not handle
    pub fn validate(&self) -> Result<()> {
        if self.search_provider.api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("search provider API key is not configured");
        }
        if self.generation.api_key.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!("generation provider API key is not configured");
        }
        if self.orchestrator.request_timeout_secs <= 0.0 {
            anyhow::bail!("orchestrator.request_timeout_secs must be positive");
        }
        Ok(())
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|val| !val.is_empty())
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name reported by /health
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "insight-search".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Maximum number of items accepted by the batch endpoint
    pub max_batch_items: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8787,
            bind_address: "127.0.0.1".to_string(),
            max_batch_items: 10,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Per-call timeout in seconds
    pub request_timeout: f64,
    /// Connect timeout in seconds
    pub connect_timeout: f64,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// User agent sent to providers
    pub user_agent: String,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 20.0,
            connect_timeout: 5.0,
            pool_maxsize: 20,
            user_agent: format!("insight-search/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Web search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchProviderSettings {
    /// Provider adapter (tavily)
    pub kind: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Default result count when the query does not ask for one
    pub max_results: u32,
    /// Upper bound on caller-requested result counts
    pub max_results_limit: u32,
    /// Coarse provider-side category (general, news)
    pub topic: String,
    /// Provider search depth (basic, advanced)
    pub search_depth: String,
}

impl Default for SearchProviderSettings {
    fn default() -> Self {
        Self {
            kind: "tavily".to_string(),
            base_url: "https://api.tavily.com".to_string(),
            api_key: None,
            max_results: 5,
            max_results_limit: 10,
            topic: "general".to_string(),
            search_depth: "basic".to_string(),
        }
    }
}

/// Text generation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Provider adapter (openai)
    pub kind: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            kind: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 900,
        }
    }
}

/// Orchestration tuning. Defaults are tuned against a ~60s platform deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Hard wall-clock deadline for one search_and_summarize call
    pub request_timeout_secs: f64,
    /// Characters of content kept per search result in the prompt context
    pub result_char_limit: usize,
    /// Characters of total prompt context
    pub context_char_limit: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_delay_ms: 2000,
            request_timeout_secs: 45.0,
            result_char_limit: 1500,
            context_char_limit: 8000,
        }
    }
}

impl OrchestratorSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }
}

/// Usage metering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSettings {
    /// Disable to skip quota checks entirely
    pub enabled: bool,
    /// PostgREST-style endpoint of the hosted database; None keeps counters in memory
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    /// Table holding one usage row per user
    pub table: String,
    /// Daily limit on the free tier
    pub free_daily_limit: u32,
    /// Daily limit on the pro tier
    pub pro_daily_limit: u32,
    /// Daily limit on the enterprise tier (None = unlimited)
    pub enterprise_daily_limit: Option<u32>,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            store_url: None,
            store_api_key: None,
            table: "insight_usage".to_string(),
            free_daily_limit: 5,
            pro_daily_limit: 100,
            enterprise_daily_limit: None,
        }
    }
}
