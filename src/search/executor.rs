//! Search-and-summarize orchestration

use super::fallback::fallback_summary;
use super::models::InsightQuery;
use super::prompt::{self, ContextLimits, SYSTEM_PROMPT};
use super::retry::RetryPolicy;
use super::summary::parse_summary;
use crate::config::Settings;
use crate::error::{InsightError, Result};
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::providers::{
    GenerationParams, GenerationProvider, ProviderRequest, ProviderResponse, SearchOutput,
    SearchParams, SearchProvider,
};
use crate::results::{InsightReport, SearchResult, Summary};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runs one web search followed by one summary generation per request
pub struct Orchestrator {
    /// HTTP client for making provider requests
    client: HttpClient,
    search_provider: Arc<dyn SearchProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    retry: RetryPolicy,
    /// Hard wall-clock deadline for search_and_summarize
    request_timeout: Duration,
    limits: ContextLimits,
    default_max_results: u32,
    max_results_limit: u32,
    /// Coarse category forwarded to the search provider
    provider_topic: Option<String>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    /// Create an orchestrator with default tuning
    pub fn new(
        client: HttpClient,
        search_provider: Arc<dyn SearchProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            client,
            search_provider,
            generation_provider,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(45),
            limits: ContextLimits::default(),
            default_max_results: 5,
            max_results_limit: 10,
            provider_topic: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Create an orchestrator tuned from settings
    pub fn from_settings(
        settings: &Settings,
        client: HttpClient,
        search_provider: Arc<dyn SearchProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let topic = settings.search_provider.topic.trim();
        Self {
            retry: RetryPolicy::from_settings(&settings.orchestrator),
            request_timeout: settings.orchestrator.request_timeout(),
            limits: ContextLimits::from_settings(&settings.orchestrator),
            default_max_results: settings.search_provider.max_results,
            max_results_limit: settings.search_provider.max_results_limit,
            provider_topic: (!topic.is_empty()).then(|| topic.to_string()),
            ..Self::new(client, search_provider, generation_provider)
        }
    }

    /// Set retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set overall deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Share a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Search the web for `query` and summarize what was found.
    ///
    /// Fails with `NoResults` without calling the generation provider when
    /// the search comes back empty. Generation failures never surface:
    /// they yield a fallback summary instead. Cancellation and the overall
    /// deadline abort whichever call is in flight and always surface.
    pub async fn search_and_summarize(
        &self,
        query: &InsightQuery,
        cancel: &CancellationToken,
    ) -> Result<InsightReport> {
        let request_id = Uuid::new_v4();
        let span = info_span!("insight_search", %request_id, query = %query.text);

        async {
            self.metrics.inc_request();
            let started = Instant::now();

            let outcome = match tokio::time::timeout(self.request_timeout, self.run(query, cancel)).await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("Deadline of {:?} exceeded, aborting", self.request_timeout);
                    Err(InsightError::Timeout(self.request_timeout))
                }
            };

            match &outcome {
                Ok(report) => info!(
                    "Completed with {} results ({:?} summary) in {:?}",
                    report.results.len(),
                    report.summary.origin,
                    started.elapsed()
                ),
                Err(InsightError::Cancelled) => {
                    self.metrics.inc_cancellation();
                    info!("Cancelled after {:?}", started.elapsed());
                }
                Err(InsightError::Timeout(_)) => self.metrics.inc_timeout(),
                Err(e) => warn!("Failed after {:?}: {}", started.elapsed(), e),
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, query: &InsightQuery, cancel: &CancellationToken) -> Result<InsightReport> {
        let output = self.search(query, cancel).await?;

        if output.results.is_empty() {
            info!("Search returned no results, skipping generation");
            return Err(InsightError::NoResults(query.text.clone()));
        }

        let summary = self
            .summarize(&output.results, output.answer.as_deref(), query, cancel)
            .await?;

        Ok(InsightReport {
            summary,
            results: output.results,
            answer: output.answer,
        })
    }

    /// Run the web search step, retrying once on transient failure
    pub(crate) async fn search(
        &self,
        query: &InsightQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchOutput> {
        let provider = self.search_provider.as_ref();
        let name = provider.name();

        let mut params = SearchParams::new(
            query.provider_query(),
            query.effective_max_results(self.default_max_results, self.max_results_limit),
        );
        if let Some(ref topic) = self.provider_topic {
            params = params.with_topic(topic.clone());
        }
        let params = &params;

        debug!("Searching {} for '{}'", name, params.query);

        let output = self
            .retry
            .run(name, cancel, move |attempt| {
                self.attempt(name, attempt, provider.request(params), cancel, move |response| {
                    provider.response(response)
                })
            })
            .await?;

        debug!("{} returned {} results", name, output.results.len());
        Ok(output)
    }

    /// Run the generation step, degrading to the fallback summary on failure
    pub(crate) async fn summarize(
        &self,
        results: &[SearchResult],
        answer: Option<&str>,
        query: &InsightQuery,
        cancel: &CancellationToken,
    ) -> Result<Summary> {
        let provider = self.generation_provider.as_ref();
        let name = provider.name();

        let params = &GenerationParams {
            system_instructions: SYSTEM_PROMPT.to_string(),
            user_prompt: prompt::user_prompt(query, results, &self.limits),
        };

        let generated = self
            .retry
            .run(name, cancel, move |attempt| {
                self.attempt(name, attempt, provider.request(params), cancel, move |response| {
                    provider.response(response)
                })
            })
            .await;

        let failure = match generated.and_then(|text| parse_summary(&text, query, results)) {
            Ok(summary) => return Ok(summary),
            Err(e) if e.is_abort() => return Err(e),
            Err(e) => e,
        };

        if cancel.is_cancelled() {
            return Err(InsightError::Cancelled);
        }

        warn!("Generation failed ({}); using fallback summary", failure);
        self.metrics.inc_fallback();
        Ok(fallback_summary(query, results, answer))
    }

    /// One provider call: execute the built request, parse it, record metrics
    async fn attempt<T>(
        &self,
        name: &str,
        attempt: u32,
        request: Result<ProviderRequest>,
        cancel: &CancellationToken,
        parse: impl FnOnce(ProviderResponse) -> Result<T>,
    ) -> Result<T> {
        if attempt > 0 {
            self.metrics.record_retry(name);
        }
        let request = request?;
        let started = Instant::now();
        let result = self
            .client
            .execute(name, request, cancel)
            .await
            .and_then(parse);
        self.metrics.record_call(name, started.elapsed(), result.is_ok());
        result
    }
}
