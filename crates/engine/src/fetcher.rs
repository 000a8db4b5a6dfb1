//! Open-data API client.
//!
//! Fetches the records of one data.gov.in resource:
//! `GET {base_url}/{id}?api-key=...&format=json&limit=N`, records under
//! `records` in the JSON body.
//!
//! Transient failures (non-2xx, timeouts, transport errors) are retried with
//! exponential backoff. A malformed resource id fails before any request and
//! an undecodable 2xx body fails immediately.

use crate::types::Record;
use agriqa_catalog::{is_valid_resource_id, DatasetDescriptor};
use agriqa_core::config::DataApiConfig;
use agriqa_core::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Why a fetch produced no records.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid dataset id: '{0}'")]
    InvalidId(String),

    #[error("data API returned HTTP {status}")]
    Status { status: u16 },

    #[error("data API request timed out")]
    Timeout,

    #[error("data API request failed: {0}")]
    Transport(String),

    #[error("undecodable data API response: {0}")]
    Decode(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt might succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Timeout | Self::Transport(_)
        )
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::DataApi(err.to_string())
    }
}

/// Records returned by one successful fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub records: Vec<Record>,
    pub record_count: usize,

    /// `total` as reported by the API, when present
    pub upstream_total: Option<u64>,

    /// Attempts it took, 1-based
    pub attempts: u32,
}

impl FetchResult {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            record_count: records.len(),
            records,
            upstream_total: None,
            attempts: 1,
        }
    }
}

/// Anything that can produce the records of a dataset.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, dataset: &DatasetDescriptor) -> Result<FetchResult, FetchError>;
}

/// Connection and retry settings for [`DataFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub limit: u32,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub timeout: Duration,
}

impl FetchSettings {
    pub fn from_config(config: &DataApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limit: config.limit,
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Delay before the attempt after `attempt` (1-based): base × 2^(attempt-1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&DataApiConfig::default())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    records: Vec<Record>,

    #[serde(default)]
    total: Option<serde_json::Value>,
}

/// HTTP client for api.data.gov.in.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: Client,
    settings: FetchSettings,
}

impl DataFetcher {
    pub fn new(settings: FetchSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::DataApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    pub fn from_config(config: &DataApiConfig) -> AppResult<Self> {
        Self::new(FetchSettings::from_config(config))
    }

    /// One request, no retries.
    async fn fetch_once(&self, id: &str) -> Result<(u16, ApiResponse), FetchError> {
        let url = format!("{}/{}", self.settings.base_url, id);
        let limit = self.settings.limit.to_string();

        let mut request = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("limit", limit.as_str())]);
        if let Some(key) = &self.settings.api_key {
            request = request.query(&[("api-key", key.as_str())]);
        }

        let response = request.send().await.map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        let parsed: ApiResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok((status.as_u16(), parsed))
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// The API reports `total` as a number or a numeric string.
fn parse_total(total: Option<serde_json::Value>) -> Option<u64> {
    match total? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl RecordSource for DataFetcher {
    #[instrument(skip(self, dataset), fields(dataset_id = %dataset.id))]
    async fn fetch(&self, dataset: &DatasetDescriptor) -> Result<FetchResult, FetchError> {
        if !is_valid_resource_id(&dataset.id) {
            warn!(dataset_id = %dataset.id, outcome = "invalid_id", "Refusing to fetch dataset");
            return Err(FetchError::InvalidId(dataset.id.clone()));
        }

        let max_attempts = self.settings.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            let outcome = self.fetch_once(&dataset.id).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok((status, response)) => {
                    let result = FetchResult {
                        record_count: response.records.len(),
                        records: response.records,
                        upstream_total: parse_total(response.total),
                        attempts: attempt,
                    };
                    info!(
                        dataset_id = %dataset.id,
                        attempt,
                        latency_ms,
                        status,
                        records = result.record_count,
                        outcome = "ok",
                        "Data API attempt"
                    );
                    return Ok(result);
                }
                Err(err) if err.is_retriable() && attempt < max_attempts => {
                    let backoff = self.settings.backoff(attempt);
                    warn!(
                        dataset_id = %dataset.id,
                        attempt,
                        latency_ms,
                        status = ?err.status(),
                        backoff_ms = backoff.as_millis() as u64,
                        outcome = "retry",
                        error = %err,
                        "Data API attempt"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    warn!(
                        dataset_id = %dataset.id,
                        attempt,
                        latency_ms,
                        status = ?err.status(),
                        outcome = "failed",
                        error = %err,
                        "Data API attempt"
                    );
                    return Err(if err.is_retriable() {
                        FetchError::Exhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        }
                    } else {
                        err
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriqa_catalog::Keywords;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Scripted stand-in for api.data.gov.in: answers each request with the
    /// next status in the script, then 200 with `rows` records.
    #[derive(Clone)]
    struct FakeApi {
        statuses: Arc<Vec<u16>>,
        hits: Arc<AtomicU32>,
        rows: usize,
        body_override: Option<&'static str>,
    }

    async fn resource(
        State(api): State<FakeApi>,
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let hit = api.hits.fetch_add(1, Ordering::SeqCst) as usize;
        if let Some(&status) = api.statuses.get(hit) {
            return StatusCode::from_u16(status).unwrap().into_response();
        }
        if let Some(body) = api.body_override {
            return body.into_response();
        }

        assert_eq!(params.get("format").map(String::as_str), Some("json"));
        assert_eq!(params.get("api-key").map(String::as_str), Some("test-key"));

        let records: Vec<_> = (0..api.rows)
            .map(|i| serde_json::json!({ "state": "Bihar", "commodity": "Potato", "modal_price": 1200 + i, "resource": id }))
            .collect();
        axum::Json(serde_json::json!({ "records": records, "total": api.rows.to_string() })).into_response()
    }

    async fn spawn_api(api: FakeApi) -> String {
        let app = Router::new()
            .route("/resource/{id}", get(resource))
            .with_state(api);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/resource", addr)
    }

    fn fake(statuses: Vec<u16>, rows: usize) -> FakeApi {
        FakeApi {
            statuses: Arc::new(statuses),
            hits: Arc::new(AtomicU32::new(0)),
            rows,
            body_override: None,
        }
    }

    fn settings(base_url: String) -> FetchSettings {
        FetchSettings {
            base_url,
            api_key: Some("test-key".to_string()),
            limit: 50,
            max_attempts: 3,
            backoff_base: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    fn dataset(id: &str) -> DatasetDescriptor {
        DatasetDescriptor {
            id: id.to_string(),
            title: "Mandi prices".to_string(),
            ministry: "Agriculture".to_string(),
            description: String::new(),
            keywords: Keywords::default(),
        }
    }

    const ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

    #[test]
    fn test_backoff_doubles() {
        let settings = FetchSettings::default();
        assert_eq!(settings.backoff(1), Duration::from_secs(1));
        assert_eq!(settings.backoff(2), Duration::from_secs(2));
        assert_eq!(settings.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total(Some(serde_json::json!(42))), Some(42));
        assert_eq!(parse_total(Some(serde_json::json!("17"))), Some(17));
        assert_eq!(parse_total(Some(serde_json::json!(null))), None);
        assert_eq!(parse_total(None), None);
    }

    #[tokio::test]
    async fn test_fetch_success_first_attempt() {
        let api = fake(vec![], 10);
        let hits = api.hits.clone();
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let result = fetcher.fetch(&dataset(ID)).await.unwrap();
        assert_eq!(result.record_count, 10);
        assert_eq!(result.records.len(), 10);
        assert_eq!(result.upstream_total, Some(10));
        assert_eq!(result.attempts, 1);
        assert_eq!(result.records[0]["commodity"], "Potato");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_retries_transient_failures() {
        let api = fake(vec![503, 500], 3);
        let hits = api.hits.clone();
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let result = fetcher.fetch(&dataset(ID)).await.unwrap();
        assert_eq!(result.record_count, 3);
        assert_eq!(result.attempts, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_max_attempts() {
        let api = fake(vec![502, 502, 502, 502], 3);
        let hits = api.hits.clone();
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let err = fetcher.fetch(&dataset(ID)).await.unwrap_err();
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status { status: 502 }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_records_is_success() {
        let api = fake(vec![], 0);
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let result = fetcher.fetch(&dataset(ID)).await.unwrap();
        assert_eq!(result.record_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_id_sends_no_request() {
        let api = fake(vec![], 5);
        let hits = api.hits.clone();
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let err = fetcher.fetch(&dataset("../../admin")).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidId(_)));
        assert!(!err.is_retriable());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_not_retried() {
        let mut api = fake(vec![], 5);
        api.body_override = Some("<html>maintenance</html>");
        let hits = api.hits.clone();
        let fetcher = DataFetcher::new(settings(spawn_api(api).await)).unwrap();

        let err = fetcher.fetch(&dataset(ID)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_exhausted() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut settings = settings(format!("http://{}/resource", addr));
        settings.max_attempts = 2;
        let fetcher = DataFetcher::new(settings).unwrap();

        let err = fetcher.fetch(&dataset(ID)).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 2, .. }));
        assert!(AppError::from(err).to_string().contains("Data API"));
    }
}
