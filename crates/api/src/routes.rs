//! Request handlers and their JSON shapes.

use crate::error::ApiError;
use crate::state::AppState;
use agriqa_catalog::DatasetDescriptor;
use agriqa_core::Language;
use agriqa_engine::{QueryResponse, Turn};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub status: &'static str,
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "AgriQA: Agri-Climate Q&A System",
        status: "operational",
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

pub async fn chat_query(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(req) = payload?;

    let language = match req.language.as_deref() {
        None | Some("") => Language::default(),
        Some(code) => Language::parse(code)
            .ok_or_else(|| ApiError::BadRequest(format!("Unsupported language: {}", code)))?,
    };

    let response = state
        .pipeline
        .handle_query(&req.question, req.session_id, language)
        .await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct History {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

pub async fn chat_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<History>, ApiError> {
    let turns = state.pipeline.history(&session_id).await?;
    Ok(Json(History { session_id, turns }))
}

#[derive(Serialize)]
pub struct DatasetView {
    pub id: String,
    pub title: String,
    pub ministry: String,
    pub description: String,
    pub url: String,
}

impl From<&DatasetDescriptor> for DatasetView {
    fn from(d: &DatasetDescriptor) -> Self {
        Self {
            id: d.id.clone(),
            title: d.title.clone(),
            ministry: d.ministry.clone(),
            description: d.description.clone(),
            url: d.url(),
        }
    }
}

#[derive(Serialize)]
pub struct DatasetList {
    pub datasets: Vec<DatasetView>,
    pub total: usize,
}

pub async fn datasets(State(state): State<AppState>) -> Json<DatasetList> {
    let datasets: Vec<DatasetView> = state
        .pipeline
        .catalog()
        .datasets()
        .iter()
        .map(DatasetView::from)
        .collect();
    Json(DatasetList {
        total: datasets.len(),
        datasets,
    })
}

#[derive(Serialize)]
pub struct Services {
    pub session_store: String,
    pub llm: String,
    pub data_api: &'static str,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub services: Services,
}

/// Reports `degraded` when the session store does not answer a ping.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let store = state.pipeline.store();
    let healthy = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Session store ping failed");
            false
        }
    };
    let store_status = format!(
        "{}: {}",
        store.backend_name(),
        if healthy { "healthy" } else { "unhealthy" }
    );

    Json(Health {
        status: if healthy { "healthy" } else { "degraded" },
        services: Services {
            session_store: store_status,
            llm: format!("{}: configured", state.llm_provider),
            data_api: if state.data_api_key_configured {
                "configured"
            } else {
                "sample_key"
            },
        },
    })
}
