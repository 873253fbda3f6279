//! SQLite-backed session store.
//!
//! Split reader/writer pools in WAL mode: SQLite allows one writer at a
//! time, so writes go through a single-connection pool while reads use a
//! wider one. The three logical session records live in three tables and
//! are replaced together inside one transaction, so the store only ever
//! holds post-transition snapshots.

use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use rehearse_core::store::{ConversationRecord, SessionMetaRecord, SessionSnapshot, SessionStore};
use rehearse_types::error::StoreError;
use rehearse_types::session::SessionId;
use rehearse_types::speech::SpeechTask;

/// Split read/write pool for SQLite with WAL mode.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Connect and bootstrap the schema.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts)
            .await?;

        ensure_schema(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS session_meta (
            id TEXT PRIMARY KEY,
            owner_user_id TEXT,
            status TEXT NOT NULL,
            config TEXT NOT NULL,
            stats TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS session_conversation (
            session_id TEXT PRIMARY KEY,
            history TEXT NOT NULL,
            feedback TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS session_summary (
            session_id TEXT PRIMARY KEY,
            summary TEXT,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS speech_tasks (
            id TEXT PRIMARY KEY,
            session_id TEXT,
            task_type TEXT NOT NULL,
            status TEXT NOT NULL,
            progress TEXT,
            result TEXT,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_speech_tasks_session
         ON speech_tasks (session_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Default database URL from `REHEARSE_DATA_DIR`, falling back to
/// `./rehearse.db`.
pub fn default_database_url() -> String {
    let data_dir =
        std::env::var("REHEARSE_DATA_DIR").unwrap_or_else(|_| ".".to_string());
    format!("sqlite://{data_dir}/rehearse.db?mode=rwc")
}

/// [`SessionStore`] over the split SQLite pool. Records are stored as
/// JSON blobs keyed by session id.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl SessionStore for SqliteSessionStore {
    async fn put_session(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let id = snapshot.meta.id.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let config = encode(&snapshot.meta.config)?;
        let stats = encode(&snapshot.meta.stats)?;
        let history = encode(&snapshot.conversation.history)?;
        let feedback = encode(&snapshot.conversation.feedback)?;
        let summary = snapshot.summary.as_ref().map(encode).transpose()?;

        let mut tx = self.pool.writer.begin().await.map_err(db_err)?;
        sqlx::query(
            "INSERT OR REPLACE INTO session_meta
             (id, owner_user_id, status, config, stats, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&snapshot.meta.owner_user_id)
        .bind(snapshot.meta.status.to_string())
        .bind(&config)
        .bind(&stats)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "INSERT OR REPLACE INTO session_conversation
             (session_id, history, feedback, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&history)
        .bind(&feedback)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "INSERT OR REPLACE INTO session_summary
             (session_id, summary, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(&summary)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        let key = id.to_string();
        let meta_row = sqlx::query(
            "SELECT owner_user_id, status, config, stats FROM session_meta WHERE id = ?",
        )
        .bind(&key)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(db_err)?;

        let Some(meta_row) = meta_row else {
            return Ok(None);
        };

        let config: String = meta_row.get("config");
        let stats: String = meta_row.get("stats");
        let status: String = meta_row.get("status");
        let meta = SessionMetaRecord {
            id,
            owner_user_id: meta_row.get("owner_user_id"),
            status: status
                .parse()
                .map_err(|e: String| StoreError::Serialization(e))?,
            config: decode(&config)?,
            stats: decode(&stats)?,
        };

        let conversation = sqlx::query(
            "SELECT history, feedback FROM session_conversation WHERE session_id = ?",
        )
        .bind(&key)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(db_err)?
        .map(|row| -> Result<ConversationRecord, StoreError> {
            let history: String = row.get("history");
            let feedback: String = row.get("feedback");
            Ok(ConversationRecord {
                history: decode(&history)?,
                feedback: decode(&feedback)?,
            })
        })
        .transpose()?
        .unwrap_or_default();

        let summary = sqlx::query("SELECT summary FROM session_summary WHERE session_id = ?")
            .bind(&key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(db_err)?
            .and_then(|row| row.get::<Option<String>, _>("summary"))
            .map(|raw| decode(&raw))
            .transpose()?;

        Ok(Some(SessionSnapshot {
            meta,
            conversation,
            summary,
        }))
    }

    async fn put_task(&self, task: &SpeechTask) -> Result<(), StoreError> {
        let progress = task.progress.as_ref().map(encode).transpose()?;
        let result = task.result.as_ref().map(encode).transpose()?;
        sqlx::query(
            "INSERT OR REPLACE INTO speech_tasks
             (id, session_id, task_type, status, progress, result, error, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.session_id.map(|s| s.to_string()))
        .bind(task.task_type.to_string())
        .bind(task.status.to_string())
        .bind(progress)
        .bind(result)
        .bind(&task.error)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<SpeechTask>, StoreError> {
        let row = sqlx::query(
            "SELECT id, session_id, task_type, status, progress, result, error,
                    created_at, updated_at
             FROM speech_tasks WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(db_err)?;
        row.map(task_from_row).transpose()
    }

    async fn list_tasks(&self, session_id: SessionId) -> Result<Vec<SpeechTask>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, session_id, task_type, status, progress, result, error,
                    created_at, updated_at
             FROM speech_tasks WHERE session_id = ? ORDER BY created_at",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(task_from_row).collect()
    }
}

fn task_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SpeechTask, StoreError> {
    let id: String = row.get("id");
    let session_id: Option<String> = row.get("session_id");
    let task_type: String = row.get("task_type");
    let status: String = row.get("status");
    let progress: Option<String> = row.get("progress");
    let result: Option<String> = row.get("result");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let parse_time = |raw: &str| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&chrono::Utc))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    };

    Ok(SpeechTask {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Serialization(e.to_string()))?,
        session_id: session_id
            .map(|s| s.parse().map_err(|e: uuid::Error| StoreError::Serialization(e.to_string())))
            .transpose()?,
        task_type: task_type
            .parse()
            .map_err(|e: String| StoreError::Serialization(e))?,
        status: status
            .parse()
            .map_err(|e: String| StoreError::Serialization(e))?,
        progress: progress.map(|raw| decode(&raw)).transpose()?,
        result: result.map(|raw| decode(&raw)).transpose()?,
        error: row.get("error"),
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use rehearse_types::session::{SessionConfig, SessionStats, SessionStatus};
    use rehearse_types::speech::{SpeechTaskStatus, SpeechTaskType};
    use rehearse_types::summary::{FinalSummary, SummaryOutcome};
    use rehearse_types::turn::{ConversationTurn, FeedbackEntry, ResponseType};

    async fn store() -> (tempfile::TempDir, SqliteSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/test.db?mode=rwc", dir.path().display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, SqliteSessionStore::new(pool))
    }

    fn snapshot(id: SessionId) -> SessionSnapshot {
        let now = Utc::now();
        SessionSnapshot {
            meta: SessionMetaRecord {
                id,
                owner_user_id: Some("u-1".to_string()),
                status: SessionStatus::Active,
                config: SessionConfig::default(),
                stats: SessionStats::new(now),
            },
            conversation: ConversationRecord {
                history: vec![
                    ConversationTurn::interviewer("Welcome.", ResponseType::Introduction, now),
                    ConversationTurn::user("Thanks.", now),
                ],
                feedback: vec![FeedbackEntry::new(1, "Welcome.", "Thanks.", "Fine.")],
            },
            summary: None,
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let (_dir, store) = store().await;
        let id = SessionId::new();
        store.put_session(&snapshot(id)).await.unwrap();

        let loaded = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(loaded.meta.owner_user_id.as_deref(), Some("u-1"));
        assert_eq!(loaded.conversation.history.len(), 2);
        assert_eq!(loaded.conversation.feedback.len(), 1);
        assert!(loaded.summary.is_none());
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let (_dir, store) = store().await;
        assert!(store.get_session(SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_atomically() {
        let (_dir, store) = store().await;
        let id = SessionId::new();
        store.put_session(&snapshot(id)).await.unwrap();

        let mut updated = snapshot(id);
        updated.meta.status = SessionStatus::Completed;
        updated.summary = Some(SummaryOutcome::Completed(FinalSummary {
            patterns_tendencies: "p".to_string(),
            strengths: "s".to_string(),
            weaknesses: "w".to_string(),
            improvement_focus_areas: "i".to_string(),
            resource_search_topics: vec![],
            recommended_resources: vec![],
        }));
        store.put_session(&updated).await.unwrap();

        let loaded = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(loaded.meta.status, SessionStatus::Completed);
        assert!(matches!(
            loaded.summary,
            Some(SummaryOutcome::Completed(_))
        ));
    }

    #[tokio::test]
    async fn test_task_roundtrip_and_listing() {
        let (_dir, store) = store().await;
        let session = SessionId::new();

        let mut task = SpeechTask::new(Some(session), SpeechTaskType::BatchTranscription);
        task.progress = Some(serde_json::json!({"stage": "uploading"}));
        store.put_task(&task).await.unwrap();

        let loaded = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SpeechTaskStatus::Processing);
        assert_eq!(loaded.session_id, Some(session));
        assert_eq!(
            loaded.progress.unwrap()["stage"].as_str().unwrap(),
            "uploading"
        );

        let other = SpeechTask::new(None, SpeechTaskType::Synthesis);
        store.put_task(&other).await.unwrap();

        let listed = store.list_tasks(session).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, task.id);
    }

    #[tokio::test]
    async fn test_unknown_task_is_none() {
        let (_dir, store) = store().await;
        assert!(store.get_task(Uuid::now_v7()).await.unwrap().is_none());
    }
}
