//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `SessionStore` port. Used by the test
//! suites and for local runs with `DATABASE_URL=memory`. Every method holds the
//! single lock for its whole body, so multi-row writes are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_deck_core::domain::{
    KnowledgeRecall, PptTemplate, ReferenceFile, Session, WebSearchResult,
};
use lesson_deck_core::outline::{self, OutlineRow};
use lesson_deck_core::ports::{PortError, PortResult, SessionStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, Session>,
    /// Insertion order of sessions, for ties on `created_at`.
    session_ordinals: HashMap<Uuid, u64>,
    next_ordinal: u64,
    reference_files: Vec<ReferenceFile>,
    recalls: Vec<KnowledgeRecall>,
    web_results: Vec<WebSearchResult>,
    outline_rows: HashMap<Uuid, Vec<OutlineRow>>,
    templates: Vec<PptTemplate>,
}

impl Tables {
    fn require_session(&self, session_id: Uuid) -> PortResult<&Session> {
        self.sessions
            .get(&session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the template catalogue.
    pub fn with_templates(templates: Vec<PptTemplate>) -> Self {
        let store = Self::default();
        if let Ok(mut tables) = store.tables.lock() {
            tables.templates = templates;
        }
        store
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: &Session, files: &[ReferenceFile]) -> PortResult<()> {
        let mut tables = self.lock()?;
        if tables.sessions.contains_key(&session.id) {
            return Err(PortError::Conflict(format!("Session {} already exists", session.id)));
        }
        if files.iter().any(|file| file.session_id != session.id) {
            return Err(PortError::Validation(
                "reference file belongs to another session".to_string(),
            ));
        }
        let ordinal = tables.next_ordinal;
        tables.next_ordinal += 1;
        tables.session_ordinals.insert(session.id, ordinal);
        tables.sessions.insert(session.id, session.clone());
        tables.reference_files.extend(files.iter().cloned());
        if let Some(root) = &session.outline {
            tables.outline_rows.insert(session.id, outline::flatten(root));
        }
        Ok(())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        let tables = self.lock()?;
        tables.require_session(session_id).cloned()
    }

    async fn update_session(
        &self,
        session: &Session,
        expected_version: Option<i64>,
    ) -> PortResult<Session> {
        let mut tables = self.lock()?;
        let current = tables.require_session(session.id)?;
        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(PortError::Conflict(format!(
                    "Session {} is at version {}, not {}",
                    session.id, current.version, expected
                )));
            }
        }
        let outline_changed = current.outline != session.outline;

        // Creation data is not writable through an update.
        let mut updated = current.clone();
        updated.web_search_content = session.web_search_content.clone();
        updated.state = session.state;
        updated.target = session.target.clone();
        updated.outline = session.outline.clone();
        updated.design = session.design.clone();
        updated.presentation_id = session.presentation_id;
        updated.version += 1;
        updated.updated_at = Utc::now().max(updated.updated_at);

        if outline_changed {
            match &updated.outline {
                Some(root) => {
                    tables.outline_rows.insert(session.id, outline::flatten(root));
                }
                None => {
                    tables.outline_rows.remove(&session.id);
                }
            }
        }
        tables.sessions.insert(session.id, updated.clone());
        Ok(updated)
    }

    async fn list_sessions_by_user(
        &self,
        user_id: &str,
        title_filter: Option<&str>,
    ) -> PortResult<Vec<Session>> {
        let tables = self.lock()?;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| title_filter.map_or(true, |needle| s.title.contains(needle)))
            .cloned()
            .collect();
        let ordinal = |s: &Session| tables.session_ordinals.get(&s.id).copied().unwrap_or(0);
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| ordinal(b).cmp(&ordinal(a)))
        });
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        tables.require_session(session_id)?;
        tables.sessions.remove(&session_id);
        tables.session_ordinals.remove(&session_id);
        tables.reference_files.retain(|f| f.session_id != session_id);
        tables.recalls.retain(|r| r.session_id != session_id);
        tables.web_results.retain(|r| r.session_id != session_id);
        tables.outline_rows.remove(&session_id);
        Ok(())
    }

    async fn add_reference_files(&self, files: &[ReferenceFile]) -> PortResult<()> {
        let mut tables = self.lock()?;
        for file in files {
            tables.require_session(file.session_id)?;
        }
        tables.reference_files.extend(files.iter().cloned());
        Ok(())
    }

    async fn get_reference_files(&self, session_id: Uuid) -> PortResult<Vec<ReferenceFile>> {
        let tables = self.lock()?;
        Ok(tables
            .reference_files
            .iter()
            .filter(|f| f.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn save_knowledge_recalls(&self, recalls: &[KnowledgeRecall]) -> PortResult<()> {
        let mut tables = self.lock()?;
        for recall in recalls {
            tables.require_session(recall.session_id)?;
        }
        tables.recalls.extend(recalls.iter().cloned());
        Ok(())
    }

    async fn replace_recall_selection(
        &self,
        session_id: Uuid,
        chunk_ids: &[String],
        selected_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let mut selected = 0;
        for recall in tables.recalls.iter_mut().filter(|r| r.session_id == session_id) {
            if chunk_ids.contains(&recall.chunk_id) {
                recall.is_selected = true;
                recall.selected_at = Some(selected_at);
                selected += 1;
            } else {
                recall.is_selected = false;
                recall.selected_at = None;
            }
        }
        Ok(selected)
    }

    async fn get_knowledge_recalls(&self, session_id: Uuid) -> PortResult<Vec<KnowledgeRecall>> {
        let tables = self.lock()?;
        let mut recalls: Vec<KnowledgeRecall> = tables
            .recalls
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal scores.
        recalls.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(recalls)
    }

    async fn append_web_search_results(
        &self,
        session_id: Uuid,
        results: &[WebSearchResult],
        summary: &str,
    ) -> PortResult<Session> {
        let mut tables = self.lock()?;
        let mut updated = tables.require_session(session_id)?.clone();
        if results.iter().any(|result| result.session_id != session_id) {
            return Err(PortError::Validation(
                "web search result belongs to another session".to_string(),
            ));
        }

        if !updated.web_search_content.is_empty() {
            updated.web_search_content.push_str("\n\n");
        }
        updated.web_search_content.push_str(summary);
        updated.version += 1;
        updated.updated_at = Utc::now().max(updated.updated_at);

        tables.web_results.extend(results.iter().cloned());
        tables.sessions.insert(session_id, updated.clone());
        Ok(updated)
    }

    async fn get_web_search_results(&self, session_id: Uuid) -> PortResult<Vec<WebSearchResult>> {
        let tables = self.lock()?;
        Ok(tables
            .web_results
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn get_outline_rows(&self, session_id: Uuid) -> PortResult<Vec<OutlineRow>> {
        let tables = self.lock()?;
        Ok(tables
            .outline_rows
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_templates(&self) -> PortResult<Vec<PptTemplate>> {
        let tables = self.lock()?;
        let mut templates = tables.templates.clone();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }
}
