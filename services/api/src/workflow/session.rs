//! services/api/src/workflow/session.rs
//!
//! Session lifecycle: creation, lookup, history, deletion, reference files and
//! state changes.

use super::{SessionWorkflow, WorkflowError, WorkflowResult};
use lesson_deck_core::domain::{ReferenceFile, Session, SessionConfig};
use lesson_deck_core::ports::PortError;
use lesson_deck_core::state::SessionState;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything needed to open a new session.
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub user_id: String,
    pub query: String,
    pub config: SessionConfig,
    pub files: Vec<NewReferenceFile>,
}

/// A reference document supplied inline by the client.
#[derive(Debug, Clone, Default)]
pub struct NewReferenceFile {
    pub name: String,
    pub content: Option<String>,
    pub url: Option<String>,
}

impl NewReferenceFile {
    fn attach_to(self, session_id: Uuid) -> ReferenceFile {
        ReferenceFile::new(session_id, self.name, self.content.unwrap_or_default(), self.url)
    }
}

/// Keeps only characters that are safe in a single path component.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.txt".to_string()
    } else {
        cleaned.to_string()
    }
}

impl SessionWorkflow {
    pub async fn init_session(&self, request: InitRequest) -> WorkflowResult<Session> {
        if request.config.pages == 0 {
            return Err(WorkflowError::Invalid("pages must be greater than zero".to_string()));
        }
        if request.user_id.trim().is_empty() {
            return Err(WorkflowError::Invalid("userId must not be empty".to_string()));
        }

        let session = Session::new(request.user_id, request.query, request.config);
        let files: Vec<ReferenceFile> = request
            .files
            .into_iter()
            .map(|file| file.attach_to(session.id))
            .collect();

        self.store.create_session(&session, &files).await?;
        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            files = files.len(),
            "Session initialised"
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> WorkflowResult<Session> {
        self.load(session_id).await
    }

    pub async fn list_sessions(
        &self,
        user_id: &str,
        title_filter: Option<&str>,
    ) -> WorkflowResult<Vec<Session>> {
        let filter = title_filter.map(str::trim).filter(|f| !f.is_empty());
        Ok(self.store.list_sessions_by_user(user_id, filter).await?)
    }

    pub async fn delete_session(&self, session_id: Uuid) -> WorkflowResult<()> {
        self.store.delete_session(session_id).await.map_err(|e| match e {
            PortError::NotFound(_) => WorkflowError::SessionNotFound(session_id),
            other => WorkflowError::Port(other),
        })?;
        info!(%session_id, "Session deleted with all staged artifacts");
        Ok(())
    }

    pub async fn add_reference_files(
        &self,
        session_id: Uuid,
        files: Vec<NewReferenceFile>,
    ) -> WorkflowResult<Vec<ReferenceFile>> {
        self.load(session_id).await?;
        let files: Vec<ReferenceFile> =
            files.into_iter().map(|file| file.attach_to(session_id)).collect();
        self.store.add_reference_files(&files).await?;
        info!(%session_id, files = files.len(), "Reference files added");
        Ok(files)
    }

    /// Stores the raw upload under the data directory, converts it to text and
    /// attaches it. The reference file's URL is the stored path.
    pub async fn upload_reference_file(
        &self,
        session_id: Uuid,
        file_name: &str,
        data: &[u8],
    ) -> WorkflowResult<ReferenceFile> {
        self.load(session_id).await?;

        let content = self.converter.convert(file_name, data).await?;

        let dir = self.uploads_dir.join(session_id.to_string());
        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(file_name));
        let path = dir.join(stored_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to create {}: {}", dir.display(), e)))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to write {}: {}", path.display(), e)))?;

        let file = ReferenceFile::new(
            session_id,
            file_name.to_string(),
            content,
            Some(path.to_string_lossy().into_owned()),
        );
        if let Err(e) = self.store.add_reference_files(std::slice::from_ref(&file)).await {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(match e {
                PortError::NotFound(_) => WorkflowError::SessionNotFound(session_id),
                other => WorkflowError::Port(other),
            });
        }
        info!(%session_id, file = %file.name, bytes = data.len(), "Reference file uploaded");
        Ok(file)
    }

    pub async fn list_reference_files(&self, session_id: Uuid) -> WorkflowResult<Vec<ReferenceFile>> {
        self.load(session_id).await?;
        Ok(self.store.get_reference_files(session_id).await?)
    }

    /// Moves the session to `next` if the transition is legal. Completion has
    /// its own operation because it records the generated presentation.
    pub async fn advance_state(
        &self,
        session_id: Uuid,
        next: SessionState,
        expected_version: Option<i64>,
    ) -> WorkflowResult<Session> {
        if next.is_terminal() {
            return Err(WorkflowError::Invalid(
                "a session is completed through the complete-generation operation".to_string(),
            ));
        }
        let session = self
            .modify(session_id, expected_version, |session| {
                let next = session.state.transition(next).map_err(|e| {
                    warn!(%session_id, error = %e, "Rejected state change");
                    WorkflowError::Invalid(e.to_string())
                })?;
                session.state = next;
                Ok(())
            })
            .await?;
        info!(%session_id, state = %session.state, "Session state changed");
        Ok(session)
    }

    pub async fn complete_generation(
        &self,
        session_id: Uuid,
        presentation_id: Uuid,
        expected_version: Option<i64>,
    ) -> WorkflowResult<Session> {
        let session = self
            .modify(session_id, expected_version, |session| {
                if session.state != SessionState::GeneratePpt {
                    return Err(WorkflowError::Invalid(format!(
                        "cannot complete a session in state {}",
                        session.state
                    )));
                }
                session.state = SessionState::CompleteGeneration;
                session.presentation_id = Some(presentation_id);
                Ok(())
            })
            .await?;
        info!(%session_id, %presentation_id, "Generation completed");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::adapters::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use lesson_deck_core::domain::{KnowledgeRecall, PptTemplate, WebSearchResult};
    use lesson_deck_core::outline::OutlineRow;
    use lesson_deck_core::policy::BackfillPolicy;
    use lesson_deck_core::ports::{PortResult, SessionStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn init_creates_an_empty_session_in_the_first_state() {
        let wf = workflow();
        let mut request = init_request("u1", "Quadratics", false);
        request.files = vec![NewReferenceFile {
            name: "syllabus.txt".into(),
            content: Some("chapter 3".into()),
            url: None,
        }];
        let session = wf.init_session(request).await.unwrap();

        assert_eq!(session.title, "QuadraticsPPT生成任务");
        assert_eq!(session.state, SessionState::ConfirmFiles);
        assert!(session.target.is_empty());
        assert!(session.outline.is_none());
        assert!(session.design.is_empty());
        assert!(session.presentation_id.is_none());
        assert_eq!(session.version, 0);

        let files = wf.list_reference_files(session.id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "chapter 3");
    }

    #[tokio::test]
    async fn zero_pages_is_invalid() {
        let mut request = init_request("u1", "Quadratics", false);
        request.config.pages = 0;
        let err = workflow().init_session(request).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Invalid(_)));
    }

    #[tokio::test]
    async fn deleting_a_missing_session_reports_not_found() {
        let err = workflow().delete_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn sessions_are_listed_newest_first_and_filtered_by_title() {
        let wf = workflow();
        let first = wf.init_session(init_request("u1", "Algebra", false)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = wf.init_session(init_request("u1", "Geometry", false)).await.unwrap();
        wf.init_session(init_request("u2", "Algebra", false)).await.unwrap();

        let all = wf.list_sessions("u1", None).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let filtered = wf.list_sessions("u1", Some("Alge")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, first.id);
    }

    #[tokio::test]
    async fn state_moves_forward_one_step_and_back_freely() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Optics", false)).await.unwrap();

        let err = wf
            .advance_state(session.id, SessionState::ConfirmOutline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Invalid(_)));

        let moved = wf
            .advance_state(session.id, SessionState::ConfirmTarget, None)
            .await
            .unwrap();
        assert_eq!(moved.state, SessionState::ConfirmTarget);

        let back = wf
            .advance_state(session.id, SessionState::ConfirmFiles, Some(moved.version))
            .await
            .unwrap();
        assert_eq!(back.state, SessionState::ConfirmFiles);
    }

    #[tokio::test]
    async fn completion_requires_the_generation_state() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Optics", false)).await.unwrap();
        let presentation = Uuid::new_v4();

        let err = wf
            .complete_generation(session.id, presentation, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Invalid(_)));

        for next in [
            SessionState::ConfirmTarget,
            SessionState::ConfirmOutline,
            SessionState::GeneratePpt,
        ] {
            wf.advance_state(session.id, next, None).await.unwrap();
        }
        let done = wf
            .complete_generation(session.id, presentation, None)
            .await
            .unwrap();
        assert_eq!(done.state, SessionState::CompleteGeneration);
        assert_eq!(done.presentation_id, Some(presentation));

        let err = wf
            .advance_state(session.id, SessionState::ConfirmFiles, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Invalid(_)));
    }

    #[tokio::test]
    async fn upload_stores_the_file_and_attaches_its_text() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Optics", false)).await.unwrap();

        let file = wf
            .upload_reference_file(session.id, "../lenses.txt", b"convex and concave")
            .await
            .unwrap();
        assert_eq!(file.content, "convex and concave");
        let path = file.url.clone().unwrap();
        assert!(path.ends_with("_lenses.txt"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"convex and concave");

        let err = wf
            .upload_reference_file(session.id, "image.png", &[0x89, 0x50, 0x00, 0xff])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Port(PortError::Validation(_))));
    }

    #[test]
    fn file_names_are_reduced_to_one_safe_component() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\plan v2.txt"), "plan_v2.txt");
        assert_eq!(sanitize_file_name(".."), "upload.txt");
    }

    /// Delegates to the in-memory store but refuses to attach reference files.
    struct FileRejectingStore(InMemoryStore);

    #[async_trait]
    impl SessionStore for FileRejectingStore {
        async fn create_session(&self, session: &Session, files: &[ReferenceFile]) -> PortResult<()> {
            self.0.create_session(session, files).await
        }
        async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
            self.0.get_session_by_id(session_id).await
        }
        async fn update_session(&self, session: &Session, expected: Option<i64>) -> PortResult<Session> {
            self.0.update_session(session, expected).await
        }
        async fn list_sessions_by_user(&self, user_id: &str, title: Option<&str>) -> PortResult<Vec<Session>> {
            self.0.list_sessions_by_user(user_id, title).await
        }
        async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
            self.0.delete_session(session_id).await
        }
        async fn add_reference_files(&self, _files: &[ReferenceFile]) -> PortResult<()> {
            Err(PortError::Unexpected("disk full".to_string()))
        }
        async fn get_reference_files(&self, session_id: Uuid) -> PortResult<Vec<ReferenceFile>> {
            self.0.get_reference_files(session_id).await
        }
        async fn save_knowledge_recalls(&self, recalls: &[KnowledgeRecall]) -> PortResult<()> {
            self.0.save_knowledge_recalls(recalls).await
        }
        async fn replace_recall_selection(
            &self,
            session_id: Uuid,
            chunk_ids: &[String],
            selected_at: DateTime<Utc>,
        ) -> PortResult<u64> {
            self.0.replace_recall_selection(session_id, chunk_ids, selected_at).await
        }
        async fn get_knowledge_recalls(&self, session_id: Uuid) -> PortResult<Vec<KnowledgeRecall>> {
            self.0.get_knowledge_recalls(session_id).await
        }
        async fn append_web_search_results(
            &self,
            session_id: Uuid,
            results: &[WebSearchResult],
            summary: &str,
        ) -> PortResult<Session> {
            self.0.append_web_search_results(session_id, results, summary).await
        }
        async fn get_web_search_results(&self, session_id: Uuid) -> PortResult<Vec<WebSearchResult>> {
            self.0.get_web_search_results(session_id).await
        }
        async fn get_outline_rows(&self, session_id: Uuid) -> PortResult<Vec<OutlineRow>> {
            self.0.get_outline_rows(session_id).await
        }
        async fn list_templates(&self) -> PortResult<Vec<PptTemplate>> {
            self.0.list_templates().await
        }
    }

    #[tokio::test]
    async fn a_failed_upload_leaves_no_file_behind() {
        let wf = workflow_over(
            Arc::new(FileRejectingStore(InMemoryStore::new())),
            Arc::new(FixedSearcher(vec![])),
            BackfillPolicy::default(),
        );
        let session = wf.init_session(init_request("u1", "Optics", false)).await.unwrap();

        let err = wf
            .upload_reference_file(session.id, "lenses.txt", b"convex and concave")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Port(PortError::Unexpected(_))));

        let dir = wf.uploads_dir.join(session.id.to_string());
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
