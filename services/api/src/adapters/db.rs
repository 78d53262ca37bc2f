//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SessionStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_deck_core::domain::{
    ClassType, KnowledgeRecall, PptTemplate, ReferenceFile, Session, SessionConfig,
    WebSearchResult,
};
use lesson_deck_core::outline::{self, OutlineNode, OutlineRow};
use lesson_deck_core::ports::{PortError, PortResult, SessionStore};
use lesson_deck_core::state::SessionState;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SessionStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> PortResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(unexpected)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn session_not_found(session_id: Uuid) -> PortError {
    PortError::NotFound(format!("Session {} not found", session_id))
}

const SESSION_COLUMNS: &str = "id, user_id, user_input, title, pages, class_type, kb_ids, \
     web_search, web_search_content, state, target, outline, design, presentation_id, \
     version, created_at, updated_at";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: String,
    user_input: String,
    title: String,
    pages: i32,
    class_type: String,
    kb_ids: Json<Vec<String>>,
    web_search: bool,
    web_search_content: String,
    state: String,
    target: Json<Vec<String>>,
    outline: Option<Json<OutlineNode>>,
    design: String,
    presentation_id: Option<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let class_type = self
            .class_type
            .parse::<ClassType>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let state = self
            .state
            .parse::<SessionState>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let pages = u32::try_from(self.pages)
            .map_err(|_| PortError::Unexpected(format!("stored page count {} is negative", self.pages)))?;
        Ok(Session {
            id: self.id,
            user_id: self.user_id,
            user_input: self.user_input,
            title: self.title,
            config: SessionConfig {
                pages,
                class_type,
                kb_ids: self.kb_ids.0,
                web_search: self.web_search,
            },
            web_search_content: self.web_search_content,
            state,
            target: self.target.0,
            outline: self.outline.map(|json| json.0),
            design: self.design,
            presentation_id: self.presentation_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ReferenceFileRecord {
    id: Uuid,
    session_id: Uuid,
    name: String,
    content: String,
    url: Option<String>,
}
impl ReferenceFileRecord {
    fn to_domain(self) -> ReferenceFile {
        ReferenceFile {
            id: self.id,
            session_id: self.session_id,
            name: self.name,
            content: self.content,
            url: self.url,
        }
    }
}

#[derive(FromRow)]
struct KnowledgeRecallRecord {
    id: Uuid,
    session_id: Uuid,
    content: String,
    source: String,
    score: f64,
    chunk_id: String,
    is_selected: bool,
    selected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl KnowledgeRecallRecord {
    fn to_domain(self) -> KnowledgeRecall {
        KnowledgeRecall {
            id: self.id,
            session_id: self.session_id,
            content: self.content,
            source: self.source,
            score: self.score,
            chunk_id: self.chunk_id,
            is_selected: self.is_selected,
            selected_at: self.selected_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct WebSearchResultRecord {
    id: Uuid,
    session_id: Uuid,
    title: String,
    content: String,
    url: String,
    snippet: String,
    is_selected: bool,
    created_at: DateTime<Utc>,
}
impl WebSearchResultRecord {
    fn to_domain(self) -> WebSearchResult {
        WebSearchResult {
            id: self.id,
            session_id: self.session_id,
            title: self.title,
            content: self.content,
            url: self.url,
            snippet: self.snippet,
            is_selected: self.is_selected,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct OutlineRowRecord {
    id: Uuid,
    parent_id: Option<Uuid>,
    title: String,
    order_index: i32,
}
impl OutlineRowRecord {
    fn to_domain(self) -> OutlineRow {
        OutlineRow {
            id: self.id,
            parent_id: self.parent_id,
            title: self.title,
            order_index: self.order_index,
        }
    }
}

#[derive(FromRow)]
struct TemplateRecord {
    id: Uuid,
    title: String,
    cover: String,
    created_at: DateTime<Utc>,
}
impl TemplateRecord {
    fn to_domain(self) -> PptTemplate {
        PptTemplate {
            id: self.id,
            title: self.title,
            cover: self.cover,
            created_at: self.created_at,
        }
    }
}

/// The columns read back before an update, under a row lock.
#[derive(FromRow)]
struct SessionLockRecord {
    version: i64,
    outline: Option<Json<OutlineNode>>,
}

//=========================================================================================
// Transaction helpers
//=========================================================================================

async fn insert_reference_files(
    tx: &mut Transaction<'static, Postgres>,
    files: &[ReferenceFile],
) -> PortResult<()> {
    for file in files {
        sqlx::query(
            "INSERT INTO ppt_create_reference_files (id, session_id, name, content, url) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(file.id)
        .bind(file.session_id)
        .bind(&file.name)
        .bind(&file.content)
        .bind(&file.url)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                session_not_found(file.session_id)
            }
            other => unexpected(other),
        })?;
    }
    Ok(())
}

/// Replaces the flat outline rows of a session. Rows are inserted in pre-order,
/// so every parent exists before its children.
async fn rewrite_outline_rows(
    tx: &mut Transaction<'static, Postgres>,
    session_id: Uuid,
    outline: Option<&OutlineNode>,
) -> PortResult<()> {
    sqlx::query("DELETE FROM teaching_outlines WHERE session_id = $1")
        .bind(session_id)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;

    let Some(root) = outline else {
        return Ok(());
    };
    let rows = outline::flatten(root);
    for row in &rows {
        sqlx::query(
            "INSERT INTO teaching_outlines (id, session_id, parent_id, title, order_index) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(session_id)
        .bind(row.parent_id)
        .bind(&row.title)
        .bind(row.order_index)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;
    }
    debug!(%session_id, rows = rows.len(), "Outline rows rewritten");
    Ok(())
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: &Session, files: &[ReferenceFile]) -> PortResult<()> {
        let pages = i32::try_from(session.config.pages)
            .map_err(|_| PortError::Validation("pages is out of range".to_string()))?;

        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO ppt_create_sessions (id, user_id, user_input, title, pages, class_type, \
             kb_ids, web_search, web_search_content, state, target, outline, design, \
             presentation_id, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(session.id)
        .bind(&session.user_id)
        .bind(&session.user_input)
        .bind(&session.title)
        .bind(pages)
        .bind(session.config.class_type.as_str())
        .bind(Json(&session.config.kb_ids))
        .bind(session.config.web_search)
        .bind(&session.web_search_content)
        .bind(session.state.as_str())
        .bind(Json(&session.target))
        .bind(session.outline.as_ref().map(Json))
        .bind(&session.design)
        .bind(session.presentation_id)
        .bind(session.version)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        insert_reference_files(&mut tx, files).await?;
        rewrite_outline_rows(&mut tx, session.id, session.outline.as_ref()).await?;

        tx.commit().await.map_err(unexpected)?;
        info!(session_id = %session.id, files = files.len(), "Session created");
        Ok(())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        let sql = format!("SELECT {} FROM ppt_create_sessions WHERE id = $1", SESSION_COLUMNS);
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => session_not_found(session_id),
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn update_session(
        &self,
        session: &Session,
        expected_version: Option<i64>,
    ) -> PortResult<Session> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, SessionLockRecord>(
            "SELECT version, outline FROM ppt_create_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| session_not_found(session.id))?;

        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(PortError::Conflict(format!(
                    "Session {} is at version {}, not {}",
                    session.id, current.version, expected
                )));
            }
        }

        let sql = format!(
            "UPDATE ppt_create_sessions SET web_search_content = $2, state = $3, target = $4, \
             outline = $5, design = $6, presentation_id = $7, version = version + 1, \
             updated_at = $8 WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session.id)
            .bind(&session.web_search_content)
            .bind(session.state.as_str())
            .bind(Json(&session.target))
            .bind(session.outline.as_ref().map(Json))
            .bind(&session.design)
            .bind(session.presentation_id)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        let previous_outline = current.outline.map(|json| json.0);
        if previous_outline.as_ref() != session.outline.as_ref() {
            rewrite_outline_rows(&mut tx, session.id, session.outline.as_ref()).await?;
        }

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_sessions_by_user(
        &self,
        user_id: &str,
        title_filter: Option<&str>,
    ) -> PortResult<Vec<Session>> {
        let sql = format!(
            "SELECT {} FROM ppt_create_sessions WHERE user_id = $1 \
             AND ($2::TEXT IS NULL OR strpos(title, $2) > 0) ORDER BY created_at DESC, ordinal DESC",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(user_id)
            .bind(title_filter)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(SessionRecord::to_domain).collect()
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        // Staged artifacts go with the session through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM ppt_create_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(session_not_found(session_id));
        }
        info!(%session_id, "Session deleted");
        Ok(())
    }

    async fn add_reference_files(&self, files: &[ReferenceFile]) -> PortResult<()> {
        let mut tx = self.begin().await?;
        insert_reference_files(&mut tx, files).await?;
        tx.commit().await.map_err(unexpected)
    }

    async fn get_reference_files(&self, session_id: Uuid) -> PortResult<Vec<ReferenceFile>> {
        let records = sqlx::query_as::<_, ReferenceFileRecord>(
            "SELECT id, session_id, name, content, url FROM ppt_create_reference_files \
             WHERE session_id = $1 ORDER BY ordinal ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ReferenceFileRecord::to_domain).collect())
    }

    async fn save_knowledge_recalls(&self, recalls: &[KnowledgeRecall]) -> PortResult<()> {
        let mut tx = self.begin().await?;
        for recall in recalls {
            sqlx::query(
                "INSERT INTO knowledge_recalls (id, session_id, content, source, score, chunk_id, \
                 is_selected, selected_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(recall.id)
            .bind(recall.session_id)
            .bind(&recall.content)
            .bind(&recall.source)
            .bind(recall.score)
            .bind(&recall.chunk_id)
            .bind(recall.is_selected)
            .bind(recall.selected_at)
            .bind(recall.created_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)
    }

    async fn replace_recall_selection(
        &self,
        session_id: Uuid,
        chunk_ids: &[String],
        selected_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "UPDATE knowledge_recalls SET is_selected = FALSE, selected_at = NULL \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let selected = sqlx::query(
            "UPDATE knowledge_recalls SET is_selected = TRUE, selected_at = $3 \
             WHERE session_id = $1 AND chunk_id = ANY($2)",
        )
        .bind(session_id)
        .bind(chunk_ids)
        .bind(selected_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?
        .rows_affected();

        tx.commit().await.map_err(unexpected)?;
        Ok(selected)
    }

    async fn get_knowledge_recalls(&self, session_id: Uuid) -> PortResult<Vec<KnowledgeRecall>> {
        let records = sqlx::query_as::<_, KnowledgeRecallRecord>(
            "SELECT id, session_id, content, source, score, chunk_id, is_selected, selected_at, \
             created_at FROM knowledge_recalls WHERE session_id = $1 \
             ORDER BY score DESC, created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(KnowledgeRecallRecord::to_domain).collect())
    }

    async fn append_web_search_results(
        &self,
        session_id: Uuid,
        results: &[WebSearchResult],
        summary: &str,
    ) -> PortResult<Session> {
        let mut tx = self.begin().await?;

        sqlx::query_scalar::<_, i64>(
            "SELECT version FROM ppt_create_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| session_not_found(session_id))?;

        for result in results {
            sqlx::query(
                "INSERT INTO web_search_results (id, session_id, title, content, url, snippet, \
                 is_selected, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(result.id)
            .bind(session_id)
            .bind(&result.title)
            .bind(&result.content)
            .bind(&result.url)
            .bind(&result.snippet)
            .bind(result.is_selected)
            .bind(result.created_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        let sql = format!(
            "UPDATE ppt_create_sessions SET web_search_content = CASE \
             WHEN web_search_content = '' THEN $2 ELSE web_search_content || E'\\n\\n' || $2 END, \
             version = version + 1, updated_at = $3 WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(summary)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        debug!(%session_id, results = results.len(), "Web search results appended");
        record.to_domain()
    }

    async fn get_web_search_results(&self, session_id: Uuid) -> PortResult<Vec<WebSearchResult>> {
        let records = sqlx::query_as::<_, WebSearchResultRecord>(
            "SELECT id, session_id, title, content, url, snippet, is_selected, created_at \
             FROM web_search_results WHERE session_id = $1 ORDER BY ordinal ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(WebSearchResultRecord::to_domain).collect())
    }

    async fn get_outline_rows(&self, session_id: Uuid) -> PortResult<Vec<OutlineRow>> {
        let records = sqlx::query_as::<_, OutlineRowRecord>(
            "SELECT id, parent_id, title, order_index FROM teaching_outlines \
             WHERE session_id = $1 ORDER BY parent_id NULLS FIRST, order_index ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(OutlineRowRecord::to_domain).collect())
    }

    async fn list_templates(&self) -> PortResult<Vec<PptTemplate>> {
        let records = sqlx::query_as::<_, TemplateRecord>(
            "SELECT id, title, cover, created_at FROM ppt_templates ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(TemplateRecord::to_domain).collect())
    }
}
