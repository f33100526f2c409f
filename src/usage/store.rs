//! Usage record storage backends

use super::UsageRecord;
use crate::error::{InsightError, Result};
use crate::network::HttpClient;
use crate::providers::ProviderRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

const STORE_NAME: &str = "usage_store";

/// Persistence for per-user usage rows
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Load a user's record; None for users never seen before
    async fn load(&self, user_id: &str) -> Result<Option<UsageRecord>>;

    /// Insert or replace a user's record
    async fn save(&self, record: &UsageRecord) -> Result<()>;
}

/// In-process store for local development and tests
#[derive(Default)]
pub struct MemoryUsageStore {
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn load(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn save(&self, record: &UsageRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }
}

/// Store backed by a PostgREST-style HTTP API over the hosted database
pub struct RestUsageStore {
    client: HttpClient,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestUsageStore {
    pub fn new(
        client: HttpClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.table)
    }

    fn authorize(&self, request: ProviderRequest) -> ProviderRequest {
        request
            .header("apikey", self.api_key.clone())
            .bearer(&self.api_key)
    }
}

#[async_trait]
impl UsageStore for RestUsageStore {
    async fn load(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        let request = self.authorize(
            ProviderRequest::get(self.endpoint())
                .param("user_id", format!("eq.{}", user_id))
                .param("select", "*")
                .param("limit", "1"),
        );

        let response = self
            .client
            .execute(STORE_NAME, request, &CancellationToken::new())
            .await
            .map_err(store_error)?;

        let rows: Vec<UsageRecord> = response.json(STORE_NAME).map_err(store_error)?;
        Ok(rows.into_iter().next())
    }

    async fn save(&self, record: &UsageRecord) -> Result<()> {
        let body = serde_json::to_value(record)
            .map_err(|e| InsightError::Store(format!("cannot encode usage record: {}", e)))?;

        let request = self.authorize(
            ProviderRequest::post(self.endpoint())
                .param("on_conflict", "user_id")
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .header("Content-Type", "application/json")
                .json(body),
        );

        self.client
            .execute(STORE_NAME, request, &CancellationToken::new())
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

fn store_error(err: InsightError) -> InsightError {
    InsightError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::Tier;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> UsageRecord {
        UsageRecord {
            user_id: "user-42".to_string(),
            tier: Tier::Pro,
            count: 3,
            period: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
    }

    fn rest_store(server: &MockServer) -> RestUsageStore {
        RestUsageStore::new(
            HttpClient::new().unwrap(),
            format!("{}/rest/v1/", server.uri()),
            "service-key",
            "insight_usage",
        )
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryUsageStore::new();
        assert!(store.load("user-42").await.unwrap().is_none());

        store.save(&record()).await.unwrap();
        assert_eq!(store.load("user-42").await.unwrap(), Some(record()));
    }

    #[tokio::test]
    async fn test_rest_load() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/insight_usage"))
            .and(query_param("user_id", "eq.user-42"))
            .and(header("apikey", "service-key"))
            .and(header("Authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user_id": "user-42", "tier": "pro", "count": 3, "period": "2024-05-01"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let loaded = rest_store(&server).load("user-42").await.unwrap();
        assert_eq!(loaded, Some(record()));
    }

    #[tokio::test]
    async fn test_rest_load_unknown_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/insight_usage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(rest_store(&server).load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rest_save_upserts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/insight_usage"))
            .and(query_param("on_conflict", "user_id"))
            .and(header_exists("Prefer"))
            .and(body_json(json!({
                "user_id": "user-42", "tier": "pro", "count": 3, "period": "2024-05-01"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        rest_store(&server).save(&record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rest_failure_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = rest_store(&server).load("user-42").await.unwrap_err();
        assert!(matches!(err, InsightError::Store(_)));
    }
}
