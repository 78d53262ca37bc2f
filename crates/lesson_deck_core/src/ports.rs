//! crates/lesson_deck_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the session workflow.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the storage engine, the knowledge base, the web-search
//! provider and document conversion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    KnowledgeRecall, PptTemplate, RecallCandidate, ReferenceFile, Session, WebSearchHit,
    WebSearchResult,
};
use crate::outline::OutlineRow;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for sessions and everything staged on them.
///
/// Every method that touches more than one row runs as a single transaction.
#[async_trait]
pub trait SessionStore: Send + Sync {
    // --- Sessions ---
    /// Inserts the session and its initial reference files; both commit or neither does.
    async fn create_session(&self, session: &Session, files: &[ReferenceFile]) -> PortResult<()>;

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session>;

    /// Writes every mutable field of `session`, refreshes `updated_at` and bumps
    /// `version`. When `expected_version` is given and differs from the stored
    /// version the write is rejected with `PortError::Conflict`. The flat outline
    /// rows of the session are rewritten in the same transaction.
    async fn update_session(
        &self,
        session: &Session,
        expected_version: Option<i64>,
    ) -> PortResult<Session>;

    /// Sessions of a user, newest first, optionally filtered by a title substring.
    async fn list_sessions_by_user(
        &self,
        user_id: &str,
        title_filter: Option<&str>,
    ) -> PortResult<Vec<Session>>;

    /// Removes the session and all of its staged artifacts.
    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Reference Files ---
    async fn add_reference_files(&self, files: &[ReferenceFile]) -> PortResult<()>;

    async fn get_reference_files(&self, session_id: Uuid) -> PortResult<Vec<ReferenceFile>>;

    // --- Knowledge Recalls ---
    async fn save_knowledge_recalls(&self, recalls: &[KnowledgeRecall]) -> PortResult<()>;

    /// Clears the selection of every recall of the session, then selects exactly the
    /// recalls whose chunk id is listed. Returns how many rows ended up selected.
    async fn replace_recall_selection(
        &self,
        session_id: Uuid,
        chunk_ids: &[String],
        selected_at: DateTime<Utc>,
    ) -> PortResult<u64>;

    /// Recalls of the session, highest score first.
    async fn get_knowledge_recalls(&self, session_id: Uuid) -> PortResult<Vec<KnowledgeRecall>>;

    // --- Web Search Results ---
    /// Stores a batch of results and appends `summary` to the session's
    /// accumulated web-search content (blank-line separated), bumping `version`.
    /// Only that column of the session is written, so stage fields confirmed
    /// while the search ran are kept. Both writes commit together.
    async fn append_web_search_results(
        &self,
        session_id: Uuid,
        results: &[WebSearchResult],
        summary: &str,
    ) -> PortResult<Session>;

    async fn get_web_search_results(&self, session_id: Uuid) -> PortResult<Vec<WebSearchResult>>;

    // --- Outline ---
    async fn get_outline_rows(&self, session_id: Uuid) -> PortResult<Vec<OutlineRow>>;

    // --- Templates ---
    /// Catalogue templates, newest first.
    async fn list_templates(&self) -> PortResult<Vec<PptTemplate>>;
}

#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Returns ranked snippets relevant to `query` from the given knowledge bases.
    async fn recall(&self, query: &str, kb_ids: &[String]) -> PortResult<Vec<RecallCandidate>>;
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Searches the web for material on `query`.
    async fn search(&self, query: &str) -> PortResult<Vec<WebSearchHit>>;
}

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Extracts the text of an uploaded document.
    async fn convert(&self, file_name: &str, data: &[u8]) -> PortResult<String>;
}
