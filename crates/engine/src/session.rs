//! Append-only conversation transcripts.
//!
//! Two backends: an in-memory map for tests and throwaway servers, and a
//! SQLite file (one row per turn, read back in insertion order).

use crate::types::{AnswerResult, Query};
use agriqa_core::config::StoreBackend;
use agriqa_core::{AppConfig, AppError, AppResult, Language};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub language: Language,
    pub answer: AnswerResult,
    pub timestamp: DateTime<Utc>,
}

/// Storage for session transcripts.
///
/// Turns are never updated or deleted. An append is atomic: concurrent
/// appends to one session land whole and in some order.
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn backend_name(&self) -> &str;

    async fn append(
        &self,
        session_id: &str,
        query: &Query,
        answer: &AnswerResult,
        timestamp: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Turns of a session, oldest first; empty for unknown ids.
    async fn history(&self, session_id: &str) -> AppResult<Vec<Turn>>;

    /// Check that the backend is usable.
    async fn ping(&self) -> AppResult<()>;
}

/// Open the store selected in the configuration.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<dyn SessionStore>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemorySessionStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteSessionStore::open(&config.store_path())?)),
    }
}

/// Sessions held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn append(
        &self,
        session_id: &str,
        query: &Query,
        answer: &AnswerResult,
        timestamp: DateTime<Utc>,
    ) -> AppResult<()> {
        let turn = Turn {
            question: query.text.clone(),
            language: query.language,
            answer: answer.clone(),
            timestamp,
        };
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Sessions persisted in a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                question TEXT NOT NULL,
                language TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, seq);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened session store at {:?}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Store("Session store lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AppError::Store(format!("Session store task failed: {}", e)))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn append(
        &self,
        session_id: &str,
        query: &Query,
        answer: &AnswerResult,
        timestamp: DateTime<Utc>,
    ) -> AppResult<()> {
        let session_id = session_id.to_string();
        let question = query.text.clone();
        let language = query.language.code().to_string();
        let answer_json = serde_json::to_string(answer)
            .map_err(|e| AppError::Store(format!("Failed to serialize answer: {}", e)))?;
        let created_at = timestamp.to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO turns (session_id, question, language, answer, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, question, language, answer_json, created_at],
            )
            .map_err(|e| AppError::Store(format!("Failed to append turn: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn history(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        let session_id = session_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT question, language, answer, created_at FROM turns
                     WHERE session_id = ?1 ORDER BY seq",
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(|e| AppError::Store(format!("Failed to query turns: {}", e)))?;

            let mut turns = Vec::new();
            for row in rows {
                let (question, language, answer, created_at) =
                    row.map_err(|e| AppError::Store(format!("Failed to read turn: {}", e)))?;
                turns.push(decode_turn(question, &language, &answer, &created_at)?);
            }
            Ok(turns)
        })
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| AppError::Store(format!("Ping failed: {}", e)))?;
            Ok(())
        })
        .await
    }
}

fn decode_turn(question: String, language: &str, answer: &str, created_at: &str) -> AppResult<Turn> {
    let language = Language::parse(language)
        .ok_or_else(|| AppError::Store(format!("Unknown language in store: {}", language)))?;
    let answer: AnswerResult = serde_json::from_str(answer)
        .map_err(|e| AppError::Store(format!("Corrupt answer in store: {}", e)))?;
    let timestamp = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| AppError::Store(format!("Corrupt timestamp in store: {}", e)))?
        .with_timezone(&Utc);

    Ok(Turn {
        question,
        language,
        answer,
        timestamp,
    })
}
