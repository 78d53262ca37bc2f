//! services/api/src/workflow/web_search.rs

use super::{SessionWorkflow, WorkflowError, WorkflowResult};
use lesson_deck_core::domain::{WebSearchHit, WebSearchResult};
use lesson_deck_core::ports::PortError;
use tracing::{info, warn};
use uuid::Uuid;

/// `title\nsnippet` per hit, blank-line separated.
fn summarize(hits: &[WebSearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("{}\n{}", hit.title, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl SessionWorkflow {
    /// Searches the web for the session's query, stores the hits and appends
    /// their summary to the session's accumulated web-search content.
    pub async fn run_web_search(&self, session_id: Uuid) -> WorkflowResult<Vec<WebSearchResult>> {
        let session = self.load(session_id).await?;
        if !session.config.web_search {
            warn!(%session_id, "Web search requested on a session without it enabled");
            return Err(WorkflowError::Rejected(
                "web search is disabled for this session".to_string(),
            ));
        }

        let hits = self.searcher.search(&session.user_input).await?;
        if hits.is_empty() {
            info!(%session_id, "Web search returned nothing");
            return Ok(Vec::new());
        }

        let summary = summarize(&hits);
        let results: Vec<WebSearchResult> = hits
            .into_iter()
            .map(|hit| WebSearchResult::from_hit(session_id, hit))
            .collect();
        // The session may have moved on while the search ran; only the
        // web-search content is appended, under the store's own lock.
        self.store
            .append_web_search_results(session_id, &results, &summary)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => WorkflowError::SessionNotFound(session_id),
                other => WorkflowError::Port(other),
            })?;

        info!(%session_id, results = results.len(), "Web search results stored");
        Ok(results)
    }

    pub async fn list_web_search_results(&self, session_id: Uuid) -> WorkflowResult<Vec<WebSearchResult>> {
        self.load(session_id).await?;
        Ok(self.store.get_web_search_results(session_id).await?)
    }
}
