//! services/api/src/workflow/stages.rs
//!
//! The get/confirm pairs of the teaching target, outline and design stages.

use super::{SessionWorkflow, WorkflowError, WorkflowResult};
use lesson_deck_core::domain::Session;
use lesson_deck_core::outline::{OutlineNode, OutlineRow};
use lesson_deck_core::placeholders;
use lesson_deck_core::policy::Stage;
use tracing::{debug, info};
use uuid::Uuid;

fn stored_target(session: &Session) -> Option<Vec<String>> {
    (!session.target.is_empty()).then(|| session.target.clone())
}

fn stored_outline(session: &Session) -> Option<OutlineNode> {
    session.outline.clone()
}

fn stored_design(session: &Session) -> Option<String> {
    (!session.design.is_empty()).then(|| session.design.clone())
}

impl SessionWorkflow {
    /// Returns the stage value, serving the placeholder when it is still empty.
    /// The placeholder is written back only if the backfill policy says so, and
    /// only if nobody else wrote the session in between.
    async fn read_stage<T: Clone + Send>(
        &self,
        session_id: Uuid,
        stage: Stage,
        stored: fn(&Session) -> Option<T>,
        placeholder: fn() -> T,
        write: fn(&mut Session, T),
    ) -> WorkflowResult<T> {
        let mut session = self.load(session_id).await?;
        if let Some(value) = stored(&session) {
            return Ok(value);
        }

        let value = placeholder();
        if !self.backfill.persists(stage) {
            debug!(%session_id, ?stage, "Serving placeholder without persisting");
            return Ok(value);
        }

        write(&mut session, value.clone());
        let expected = session.version;
        match self.save(&session, Some(expected)).await {
            Ok(_) => {
                info!(%session_id, ?stage, "Placeholder backfilled");
                Ok(value)
            }
            Err(WorkflowError::Conflict) => {
                let session = self.load(session_id).await?;
                Ok(stored(&session).unwrap_or(value))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_target(&self, session_id: Uuid) -> WorkflowResult<Vec<String>> {
        self.read_stage(
            session_id,
            Stage::Target,
            stored_target,
            placeholders::placeholder_target,
            |session, target| session.target = target,
        )
        .await
    }

    pub async fn confirm_target(
        &self,
        session_id: Uuid,
        target: Vec<String>,
        expected_version: Option<i64>,
    ) -> WorkflowResult<Session> {
        let session = self
            .modify(session_id, expected_version, |session| {
                session.target = target;
                Ok(())
            })
            .await?;
        info!(%session_id, items = session.target.len(), "Teaching target confirmed");
        Ok(session)
    }

    pub async fn get_outline(&self, session_id: Uuid) -> WorkflowResult<OutlineNode> {
        self.read_stage(
            session_id,
            Stage::Outline,
            stored_outline,
            placeholders::placeholder_outline,
            |session, outline| session.outline = Some(outline),
        )
        .await
    }

    pub async fn confirm_outline(
        &self,
        session_id: Uuid,
        outline: OutlineNode,
        expected_version: Option<i64>,
    ) -> WorkflowResult<Session> {
        let nodes = outline.node_count();
        let session = self
            .modify(session_id, expected_version, |session| {
                session.outline = Some(outline);
                Ok(())
            })
            .await?;
        info!(%session_id, nodes, "Teaching outline confirmed");
        Ok(session)
    }

    /// The stored flat rows of the confirmed outline.
    pub async fn list_outline_nodes(&self, session_id: Uuid) -> WorkflowResult<Vec<OutlineRow>> {
        self.load(session_id).await?;
        Ok(self.store.get_outline_rows(session_id).await?)
    }

    pub async fn get_design(&self, session_id: Uuid) -> WorkflowResult<String> {
        self.read_stage(
            session_id,
            Stage::Design,
            stored_design,
            placeholders::placeholder_design,
            |session, design| session.design = design,
        )
        .await
    }

    pub async fn confirm_design(
        &self,
        session_id: Uuid,
        design: String,
        expected_version: Option<i64>,
    ) -> WorkflowResult<Session> {
        let session = self
            .modify(session_id, expected_version, |session| {
                session.design = design;
                Ok(())
            })
            .await?;
        info!(%session_id, chars = session.design.chars().count(), "Teaching design confirmed");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use lesson_deck_core::outline;
    use lesson_deck_core::policy::BackfillPolicy;
    use std::sync::Arc;

    #[tokio::test]
    async fn target_placeholder_is_persisted_then_replaced_by_confirm() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Quadratics", false)).await.unwrap();

        let first = wf.get_target(session.id).await.unwrap();
        assert_eq!(first, placeholders::placeholder_target());
        assert_eq!(wf.get_session(session.id).await.unwrap().target, first);
        assert_eq!(wf.get_target(session.id).await.unwrap(), first);

        let confirmed = wf
            .confirm_target(session.id, vec!["Goal A".into(), "Goal B".into()], None)
            .await
            .unwrap();
        assert_eq!(confirmed.target, vec!["Goal A".to_string(), "Goal B".to_string()]);
        assert_eq!(wf.get_target(session.id).await.unwrap(), confirmed.target);
    }

    #[tokio::test]
    async fn outline_and_design_placeholders_are_transient_by_default() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Cells", false)).await.unwrap();

        assert_eq!(wf.get_outline(session.id).await.unwrap(), placeholders::placeholder_outline());
        assert_eq!(wf.get_design(session.id).await.unwrap(), placeholders::placeholder_design());

        let stored = wf.get_session(session.id).await.unwrap();
        assert!(stored.outline.is_none());
        assert!(stored.design.is_empty());
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn backfill_policy_can_persist_every_stage() {
        let policy = BackfillPolicy {
            persist_target: false,
            persist_outline: true,
            persist_design: true,
        };
        let wf = workflow_with(Arc::new(FixedSearcher(vec![])), policy);
        let session = wf.init_session(init_request("u1", "Cells", false)).await.unwrap();

        wf.get_target(session.id).await.unwrap();
        wf.get_outline(session.id).await.unwrap();
        wf.get_design(session.id).await.unwrap();

        let stored = wf.get_session(session.id).await.unwrap();
        assert!(stored.target.is_empty());
        assert_eq!(stored.outline, Some(placeholders::placeholder_outline()));
        assert_eq!(stored.design, placeholders::placeholder_design());
        assert_eq!(wf.list_outline_nodes(session.id).await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn stale_version_leaves_the_stored_value_alone() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Optics", false)).await.unwrap();

        wf.confirm_target(session.id, vec!["first".into()], Some(0))
            .await
            .unwrap();
        let err = wf
            .confirm_target(session.id, vec!["second".into()], Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict));
        assert_eq!(
            wf.get_session(session.id).await.unwrap().target,
            vec!["first".to_string()]
        );
    }

    #[tokio::test]
    async fn confirmed_outline_is_stored_as_rows_too() {
        let wf = workflow();
        let session = wf.init_session(init_request("u1", "Cells", false)).await.unwrap();
        let tree = OutlineNode::with_children(
            "Cells",
            vec![
                OutlineNode::with_children("Structure", vec![OutlineNode::leaf("Membrane")]),
                OutlineNode::leaf("Division"),
            ],
        );

        wf.confirm_outline(session.id, tree.clone(), None).await.unwrap();
        assert_eq!(wf.get_outline(session.id).await.unwrap(), tree);

        let rows = wf.list_outline_nodes(session.id).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(outline::assemble(&rows).unwrap(), tree);
    }

    #[tokio::test]
    async fn stage_reads_on_a_missing_session_report_not_found() {
        let wf = workflow();
        let missing = Uuid::new_v4();
        assert!(matches!(
            wf.get_target(missing).await,
            Err(WorkflowError::SessionNotFound(_))
        ));
        assert!(matches!(
            wf.confirm_design(missing, "text".into(), None).await,
            Err(WorkflowError::SessionNotFound(_))
        ));
    }
}
