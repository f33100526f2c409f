//! Insight search server
//!
//! This is the main entry point for the application.

use anyhow::Result;
use clap::Parser;
use insight_search::{
    config,
    network::HttpClient,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ENV_HELP: &str = "ENVIRONMENT VARIABLES:
    INSIGHT_DEBUG               Enable debug mode (true/false)
    INSIGHT_PORT                Server port
    INSIGHT_BIND_ADDRESS        Bind address
    TAVILY_API_KEY              Search provider key (or INSIGHT_SEARCH_API_KEY)
    OPENAI_API_KEY              Generation provider key (or INSIGHT_GENERATION_API_KEY)
    INSIGHT_GENERATION_MODEL    Generation model name
    INSIGHT_USAGE_STORE_URL     PostgREST endpoint for usage counters
    INSIGHT_USAGE_STORE_KEY     API key for the usage store
    RUST_LOG                    Log filter (default: info)";

#[derive(Parser)]
#[command(name = "insight-search")]
#[command(
    author,
    version,
    about = "Web search plus LLM summarization for change-management research",
    after_help = ENV_HELP
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = config::SETTINGS_PATH_ENV)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match cli.config {
        Some(ref path) => config::load_file(path)?,
        None => config::load()?,
    };

    // Initialize logging
    let default_level = if settings.general.debug || cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting insight-search v{}", insight_search::VERSION);
    settings.validate()?;
    info!("Loaded configuration for instance: {}", settings.general.instance_name);

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;

    // Create application state
    let state = AppState::new(settings.clone(), client)?;
    info!(
        "Using search provider '{}' and generation model '{}'",
        settings.search_provider.kind, settings.generation.model
    );

    let app = create_router(state);

    let addr = SocketAddr::new(
        settings.server.bind_address.parse()?,
        settings.server.port,
    );

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::try_parse_from(["insight-search", "-c", "/tmp/settings.yml", "--debug"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.yml")));
        assert!(cli.debug);
    }
}
