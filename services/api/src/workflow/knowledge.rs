//! services/api/src/workflow/knowledge.rs
//!
//! Knowledge recall: fetch candidate snippets for a session and let the user
//! pick the ones that go into the deck.

use super::{SessionWorkflow, WorkflowResult};
use chrono::Utc;
use lesson_deck_core::domain::KnowledgeRecall;
use tracing::info;
use uuid::Uuid;

impl SessionWorkflow {
    /// Asks the retriever for snippets on the session's query and stores them
    /// unselected. Nothing is written for a missing session.
    pub async fn trigger_recall(&self, session_id: Uuid) -> WorkflowResult<Vec<KnowledgeRecall>> {
        let session = self.load(session_id).await?;
        let candidates = self
            .retriever
            .recall(&session.user_input, &session.config.kb_ids)
            .await?;
        let recalls: Vec<KnowledgeRecall> = candidates
            .into_iter()
            .map(|candidate| KnowledgeRecall::from_candidate(session_id, candidate))
            .collect();
        self.store.save_knowledge_recalls(&recalls).await?;
        info!(%session_id, recalls = recalls.len(), "Knowledge recalled");
        Ok(recalls)
    }

    /// Makes `chunk_ids` the complete selection. Returns how many recalls are
    /// now selected.
    pub async fn update_selection(&self, session_id: Uuid, chunk_ids: &[String]) -> WorkflowResult<u64> {
        self.load(session_id).await?;
        let selected = self
            .store
            .replace_recall_selection(session_id, chunk_ids, Utc::now())
            .await?;
        info!(%session_id, requested = chunk_ids.len(), selected, "Knowledge selection replaced");
        Ok(selected)
    }

    pub async fn list_recalls(&self, session_id: Uuid) -> WorkflowResult<Vec<KnowledgeRecall>> {
        self.load(session_id).await?;
        Ok(self.store.get_knowledge_recalls(session_id).await?)
    }
}
