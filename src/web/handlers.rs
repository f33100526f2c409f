//! HTTP request handlers

use super::error::{ApiError, ErrorBody};
use super::state::AppState;
use crate::error::{InsightError, Result};
use crate::results::{InsightReport, SearchResult, Summary};
use crate::search::InsightQuery;
use crate::usage::UsageStatus;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::request::Parts,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Header set by the upstream auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, taken from the `x-user-id` header
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CallerId(v.to_string()))
            .ok_or(ApiError(InsightError::Unauthenticated))
    }
}

/// Body of an insight search request
#[derive(Debug, Clone, Deserialize)]
pub struct InsightRequest {
    pub query: String,
    #[serde(default)]
    pub topic_filter: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

impl InsightRequest {
    fn into_valid_query(self) -> Result<InsightQuery> {
        let mut query = InsightQuery::new(self.query);
        query.topic_filter = self.topic_filter;
        if let Some(instructions) = self.instructions {
            query.instructions = instructions;
        }
        query.max_results = self.max_results;
        query.validate()?;
        Ok(query)
    }
}

/// Successful insight search
#[derive(Debug, Serialize, Deserialize)]
pub struct InsightResponse {
    pub summary: Summary,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub usage: UsageStatus,
}

impl InsightResponse {
    fn new(report: InsightReport, usage: UsageStatus) -> Self {
        Self {
            summary: report.summary,
            results: report.results,
            answer: report.answer,
            usage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<InsightRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Success(InsightResponse),
    Failure(ErrorBody),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

/// Single insight search
pub async fn search(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    payload: std::result::Result<Json<InsightRequest>, JsonRejection>,
) -> std::result::Result<Json<InsightResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let response = run_insight(&state, &user_id, request).await?;
    Ok(Json(response))
}

/// Several insight searches for one caller, run concurrently
pub async fn batch(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    payload: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> std::result::Result<Json<BatchResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let max_items = state.settings.server.max_batch_items;
    if request.items.is_empty() || request.items.len() > max_items {
        return Err(InsightError::InvalidInput(format!(
            "batch must contain between 1 and {} items",
            max_items
        ))
        .into());
    }

    let queries: Vec<Result<InsightQuery>> =
        request.items.into_iter().map(InsightRequest::into_valid_query).collect();
    let wanted = queries.iter().filter(|q| q.is_ok()).count() as u32;

    // The whole batch must fit in what is left of today's quota
    let today = today();
    let checked = state.usage.check_capacity(&user_id, today, wanted).await?;

    let state = &state;
    let runs = queries.into_iter().map(|query| async move {
        let query = query?;
        orchestrate(state, &query).await
    });
    let outcomes = join_all(runs).await;

    let completed = outcomes.iter().filter(|o| o.is_ok()).count() as u32;
    let usage = record_usage(state, &user_id, today, completed, checked).await;

    let results = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(report) => BatchItem::Success(InsightResponse::new(report, usage.clone())),
            Err(e) => BatchItem::Failure(ErrorBody::from(&e)),
        })
        .collect();

    Ok(Json(BatchResponse { results }))
}

/// Caller's quota position for today
pub async fn usage(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> std::result::Result<Json<UsageStatus>, ApiError> {
    let status = state.usage.status(&user_id, today()).await?;
    Ok(Json(status))
}

/// Provider metrics snapshot
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics().snapshot())
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "instance": state.instance_name(),
    }))
}

/// Validate, check quota, orchestrate, then count the search
async fn run_insight(
    state: &AppState,
    user_id: &str,
    request: InsightRequest,
) -> Result<InsightResponse> {
    let query = request.into_valid_query()?;

    let today = today();
    let checked = state.usage.check(user_id, today).await?;

    let report = orchestrate(state, &query).await?;
    let usage = record_usage(state, user_id, today, 1, checked).await;

    Ok(InsightResponse::new(report, usage))
}

async fn orchestrate(state: &AppState, query: &InsightQuery) -> Result<InsightReport> {
    // Dropping this future (client gone) cancels the in-flight provider call
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    state.orchestrator.search_and_summarize(query, &cancel).await
}

/// Count completed searches; a store failure keeps the pre-check status
async fn record_usage(
    state: &AppState,
    user_id: &str,
    today: NaiveDate,
    completed: u32,
    checked: UsageStatus,
) -> UsageStatus {
    if completed == 0 {
        return checked;
    }
    match state.usage.record_many(user_id, today, completed).await {
        Ok(status) => status,
        Err(e) => {
            warn!(user_id, "Could not record usage: {}", e);
            checked
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError(InsightError::InvalidInput(rejection.body_text()))
}
