//! services/api/src/workflow/mod.rs
//!
//! The session engine. `SessionWorkflow` implements every operation of the
//! guided deck-creation flow on top of the core ports; the web layer only
//! decodes requests and renders outcomes.

mod knowledge;
mod session;
mod stages;
mod web_search;

pub use session::{InitRequest, NewReferenceFile};

use lesson_deck_core::domain::{PptTemplate, Session};
use lesson_deck_core::placeholders;
use lesson_deck_core::policy::BackfillPolicy;
use lesson_deck_core::ports::{
    DocumentConverter, KnowledgeRetriever, PortError, SessionStore, WebSearcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Outcomes other than success, as the boundary layer needs to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("session not found")]
    SessionNotFound(Uuid),
    /// A malformed request; reported as a validation fault.
    #[error("{0}")]
    Invalid(String),
    /// A well-formed request the session cannot honour right now.
    #[error("{0}")]
    Rejected(String),
    #[error("session was modified concurrently")]
    Conflict,
    /// Persistence or collaborator failure.
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// The collaborators a workflow runs against.
pub struct WorkflowPorts {
    pub store: Arc<dyn SessionStore>,
    pub retriever: Arc<dyn KnowledgeRetriever>,
    pub searcher: Arc<dyn WebSearcher>,
    pub converter: Arc<dyn DocumentConverter>,
}

pub struct SessionWorkflow {
    store: Arc<dyn SessionStore>,
    retriever: Arc<dyn KnowledgeRetriever>,
    searcher: Arc<dyn WebSearcher>,
    converter: Arc<dyn DocumentConverter>,
    backfill: BackfillPolicy,
    uploads_dir: PathBuf,
}

impl SessionWorkflow {
    pub fn new(ports: WorkflowPorts, backfill: BackfillPolicy, uploads_dir: PathBuf) -> Self {
        Self {
            store: ports.store,
            retriever: ports.retriever,
            searcher: ports.searcher,
            converter: ports.converter,
            backfill,
            uploads_dir,
        }
    }

    /// Loads a session, reporting a missing row as `SessionNotFound`.
    async fn load(&self, session_id: Uuid) -> WorkflowResult<Session> {
        self.store
            .get_session_by_id(session_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => WorkflowError::SessionNotFound(session_id),
                other => WorkflowError::Port(other),
            })
    }

    /// Writes a mutated session back, honouring the optional version check.
    async fn save(&self, session: &Session, expected_version: Option<i64>) -> WorkflowResult<Session> {
        self.store
            .update_session(session, expected_version)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => WorkflowError::SessionNotFound(session.id),
                PortError::Conflict(_) => WorkflowError::Conflict,
                other => WorkflowError::Port(other),
            })
    }

    /// Load, mutate, save. The closure may refuse the change.
    async fn modify<F>(
        &self,
        session_id: Uuid,
        expected_version: Option<i64>,
        apply: F,
    ) -> WorkflowResult<Session>
    where
        F: FnOnce(&mut Session) -> WorkflowResult<()> + Send,
    {
        let mut session = self.load(session_id).await?;
        apply(&mut session)?;
        self.save(&session, expected_version).await
    }

    /// The template catalogue, newest first. Falls back to the built-in list.
    pub async fn list_templates(&self) -> WorkflowResult<Vec<PptTemplate>> {
        let templates = self.store.list_templates().await?;
        if templates.is_empty() {
            return Ok(placeholders::builtin_templates());
        }
        Ok(templates)
    }
}
