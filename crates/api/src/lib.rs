//! HTTP API for AgriQA.
//!
//! Routes (all under `/api`):
//! - `GET  /`                          service banner
//! - `POST /chat/query`                answer a question
//! - `GET  /chat/history/{session_id}` session transcript
//! - `GET  /datasets`                  dataset registry
//! - `GET  /health`                    component health

mod cors;
mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

use agriqa_core::{AppError, AppResult};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/", get(routes::root))
        .route("/api/chat/query", post(routes::chat_query))
        .route("/api/chat/history/{session_id}", get(routes::chat_history))
        .route("/api/datasets", get(routes::datasets))
        .route("/api/health", get(routes::health))
        .layer(cors::cors_layer(&state.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(addr: &str, state: AppState) -> AppResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "AgriQA API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("AgriQA API stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriqa_catalog::{Catalog, DatasetDescriptor};
    use agriqa_engine::{
        AnswerComposer, AnswerResult, ComposerSettings, FetchError, FetchResult,
        InMemorySessionStore, IntentExtractor, Query, QueryPipeline, Record, RecordSource,
        SessionStore, Turn,
    };
    use agriqa_llm::MockClient;
    use agriqa_prompt::PromptLibrary;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Every dataset returns `rows` potato price records.
    struct FixedRows(usize);

    #[async_trait]
    impl RecordSource for FixedRows {
        async fn fetch(&self, _: &DatasetDescriptor) -> Result<FetchResult, FetchError> {
            let records = (0..self.0)
                .map(|i| {
                    let mut record = Record::new();
                    record.insert("commodity".to_string(), "Potato".into());
                    record.insert("modal_price".to_string(), (1500 + i as u64).into());
                    record
                })
                .collect();
            Ok(FetchResult::new(records))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        fn backend_name(&self) -> &str {
            "broken"
        }
        async fn append(&self, _: &str, _: &Query, _: &AnswerResult, _: DateTime<Utc>) -> AppResult<()> {
            Err(AppError::Store("database is locked".to_string()))
        }
        async fn history(&self, _: &str) -> AppResult<Vec<Turn>> {
            Err(AppError::Store("database is locked".to_string()))
        }
        async fn ping(&self) -> AppResult<()> {
            Err(AppError::Store("database is locked".to_string()))
        }
    }

    fn state(rows: usize, store: Arc<dyn SessionStore>) -> AppState {
        let llm = Arc::new(MockClient::always("Potato modal prices are around ₹1500 per quintal."));
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let prompts = Arc::new(PromptLibrary::builtin().unwrap());
        let intents = IntentExtractor::new(llm.clone(), prompts.clone(), "mock-model");
        let composer = AnswerComposer::new(
            llm,
            prompts,
            catalog.clone(),
            ComposerSettings {
                model: "mock-model".to_string(),
                ..ComposerSettings::default()
            },
        );
        let pipeline = QueryPipeline::new(catalog, Arc::new(FixedRows(rows)), intents, composer, store);
        AppState::new(Arc::new(pipeline), "mock")
    }

    /// Serve `state` on an ephemeral port and return its base URL.
    async fn spawn(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    #[tokio::test]
    async fn test_root_banner() {
        let base = spawn(state(0, Arc::new(InMemorySessionStore::new()))).await;
        let body: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "operational");
    }

    #[tokio::test]
    async fn test_query_then_history() {
        let base = spawn(state(12, Arc::new(InMemorySessionStore::new()))).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{}/chat/query", base))
            .json(&json!({"question": "What are potato prices in Bihar?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["mode"], "direct");
        assert_eq!(body["degraded"], false);
        assert!(body["answer"].as_str().unwrap().contains("₹1500"));
        assert!(!body["sources"].as_array().unwrap().is_empty());
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let history: Value = client
            .get(format!("{}/chat/history/{}", base, session_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history["session_id"], session_id.as_str());
        assert_eq!(history["turns"].as_array().unwrap().len(), 1);
        assert_eq!(history["turns"][0]["question"], "What are potato prices in Bihar?");
    }

    #[tokio::test]
    async fn test_fallback_answer_is_still_ok() {
        let base = spawn(state(0, Arc::new(InMemorySessionStore::new()))).await;
        let res = reqwest::Client::new()
            .post(format!("{}/chat/query", base))
            .json(&json!({"question": "मूल्य दिखाएं", "language": "hi", "session_id": "s-1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["mode"], "fallback");
        assert_eq!(body["session_id"], "s-1");
        assert!(body["answer"].as_str().unwrap().starts_with("⚠️ नोट:"));
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let base = spawn(state(0, Arc::new(InMemorySessionStore::new()))).await;
        let client = reqwest::Client::new();
        let url = format!("{}/chat/query", base);

        let res = client.post(&url).json(&json!({"question": "  "})).send().await.unwrap();
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "BAD_REQUEST");

        let res = client
            .post(&url)
            .json(&json!({"question": "rice", "language": "fr"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);

        let res = client
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert!(body["message"].is_string());

        let res = client.post(&url).json(&json!({"session_id": "x"})).send().await.unwrap();
        assert_eq!(res.status(), 422);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let base = spawn(state(12, Arc::new(BrokenStore))).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{}/chat/query", base))
            .json(&json!({"question": "potato prices"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 503);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "SERVICE_UNAVAILABLE");

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["services"]["session_store"], "broken: unhealthy");
    }

    #[tokio::test]
    async fn test_datasets_and_health() {
        let base = spawn(state(0, Arc::new(InMemorySessionStore::new()))).await;

        let body: Value = reqwest::get(format!("{}/datasets", base)).await.unwrap().json().await.unwrap();
        let datasets = body["datasets"].as_array().unwrap();
        assert_eq!(body["total"], datasets.len());
        assert!(datasets
            .iter()
            .all(|d| d["url"].as_str().unwrap().starts_with("https://data.gov.in/resource/")));

        let health: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["services"]["llm"], "mock: configured");
        assert_eq!(health["services"]["data_api"], "sample_key");
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let state = state(0, Arc::new(InMemorySessionStore::new()))
            .with_cors_origins(vec!["http://localhost:3000/".to_string()]);
        let base = spawn(state).await;
        let client = reqwest::Client::new();

        let res = client
            .request(reqwest::Method::OPTIONS, format!("{}/chat/query", base))
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
        assert_eq!(
            res.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert!(res.headers().contains_key("access-control-allow-methods"));

        let res = client
            .get(format!("{}/", base))
            .header("origin", "https://elsewhere.example")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let base = spawn(state(0, Arc::new(InMemorySessionStore::new()))).await;

        let res = reqwest::Client::new()
            .get(format!("{}/datasets", base))
            .header("origin", "https://agri.example")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }
}
