//! `PgStore` against a live Postgres. Skipped unless `DATABASE_URL` points at
//! a database; migrations are applied on first use.

use chrono::Utc;
use lesson_deck_api::adapters::PgStore;
use lesson_deck_core::domain::{
    ClassType, KnowledgeRecall, RecallCandidate, ReferenceFile, Session, SessionConfig,
    WebSearchHit, WebSearchResult,
};
use lesson_deck_core::outline::{self, OutlineNode};
use lesson_deck_core::ports::{PortError, SessionStore};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn pg_store() -> Option<PgStore> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if url.starts_with("postgres") => url,
        _ => {
            eprintln!("Skipping test: DATABASE_URL is not a Postgres URL");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to Postgres");
    let store = PgStore::new(pool);
    store.run_migrations().await.expect("Failed to run migrations");
    Some(store)
}

/// A session owned by a fresh user, so listings never see other tests' rows.
fn session(query: &str) -> Session {
    Session::new(
        format!("pg-{}", Uuid::new_v4()),
        query.to_string(),
        SessionConfig {
            pages: 4,
            class_type: ClassType::NewLesson,
            kb_ids: vec!["kb1".to_string()],
            web_search: true,
        },
    )
}

fn recall(session_id: Uuid, chunk: &str, score: f64) -> KnowledgeRecall {
    KnowledgeRecall::from_candidate(
        session_id,
        RecallCandidate {
            content: format!("content of {chunk}"),
            source: "kb1".to_string(),
            score,
            chunk_id: chunk.to_string(),
        },
    )
}

fn web_result(session_id: Uuid, title: &str) -> WebSearchResult {
    WebSearchResult::from_hit(
        session_id,
        WebSearchHit {
            title: title.to_string(),
            content: format!("{title} in depth"),
            url: format!("https://example.org/{title}"),
            snippet: format!("{title} briefly"),
        },
    )
}

#[tokio::test]
async fn stale_versions_are_rejected_under_the_row_lock() {
    let Some(store) = pg_store().await else { return };
    let mut s = session("Fractions");
    store.create_session(&s, &[]).await.unwrap();

    s.target = vec!["first".to_string()];
    let saved = store.update_session(&s, Some(0)).await.unwrap();
    assert_eq!(saved.version, 1);

    s.target = vec!["second".to_string()];
    let err = store.update_session(&s, Some(0)).await.unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));

    let stored = store.get_session_by_id(s.id).await.unwrap();
    assert_eq!(stored.target, vec!["first".to_string()]);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn outline_rows_are_rewritten_with_the_tree() {
    let Some(store) = pg_store().await else { return };
    let mut s = session("Cells");
    store.create_session(&s, &[]).await.unwrap();

    s.outline = Some(OutlineNode::with_children(
        "Cells",
        vec![
            OutlineNode::with_children("Structure", vec![OutlineNode::leaf("Membrane")]),
            OutlineNode::leaf("Division"),
        ],
    ));
    store.update_session(&s, None).await.unwrap();
    let rows = store.get_outline_rows(s.id).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(outline::assemble(&rows).unwrap(), s.outline.clone().unwrap());

    s.outline = Some(OutlineNode::leaf("Cells"));
    store.update_session(&s, None).await.unwrap();
    assert_eq!(store.get_outline_rows(s.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recall_selection_is_exclusive_and_listing_is_by_score() {
    let Some(store) = pg_store().await else { return };
    let s = session("Optics");
    store.create_session(&s, &[]).await.unwrap();
    store
        .save_knowledge_recalls(&[
            recall(s.id, "c1", 0.5),
            recall(s.id, "c2", 0.9),
            recall(s.id, "c3", 0.7),
        ])
        .await
        .unwrap();

    let now = Utc::now();
    let ids = ["c1".to_string(), "c3".to_string(), "unknown".to_string()];
    assert_eq!(store.replace_recall_selection(s.id, &ids, now).await.unwrap(), 2);
    assert_eq!(store.replace_recall_selection(s.id, &ids, now).await.unwrap(), 2);
    assert_eq!(
        store.replace_recall_selection(s.id, &["c2".to_string()], now).await.unwrap(),
        1
    );

    let recalls = store.get_knowledge_recalls(s.id).await.unwrap();
    let chunks: Vec<&str> = recalls.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(chunks, vec!["c2", "c3", "c1"]);
    assert!(recalls[0].is_selected && recalls[0].selected_at.is_some());
    assert!(recalls[1..].iter().all(|r| !r.is_selected && r.selected_at.is_none()));
}

#[tokio::test]
async fn batches_keep_their_insertion_order() {
    let Some(store) = pg_store().await else { return };
    let s = session("Algebra");
    let names = ["e.txt", "a.txt", "d.txt", "b.txt", "c.txt"];
    let files: Vec<ReferenceFile> = names
        .iter()
        .map(|name| ReferenceFile::new(s.id, name.to_string(), String::new(), None))
        .collect();
    store.create_session(&s, &files[..2]).await.unwrap();
    store.add_reference_files(&files[2..]).await.unwrap();

    let listed: Vec<String> = store
        .get_reference_files(s.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(listed, names);

    let results = [web_result(s.id, "Zeta"), web_result(s.id, "Alpha"), web_result(s.id, "Mu")];
    store.append_web_search_results(s.id, &results, "first").await.unwrap();
    let titles: Vec<String> = store
        .get_web_search_results(s.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, vec!["Zeta", "Alpha", "Mu"]);
}

#[tokio::test]
async fn web_search_content_is_appended_without_touching_stage_fields() {
    let Some(store) = pg_store().await else { return };
    let mut s = session("Optics");
    store.create_session(&s, &[]).await.unwrap();

    let stale = s.clone();
    s.target = vec!["Goal A".to_string()];
    store.update_session(&s, Some(0)).await.unwrap();

    let first = store
        .append_web_search_results(stale.id, &[web_result(s.id, "Lenses")], "Lenses\nBend light.")
        .await
        .unwrap();
    assert_eq!(first.web_search_content, "Lenses\nBend light.");
    assert_eq!(first.target, vec!["Goal A".to_string()]);
    assert_eq!(first.version, 2);

    let second = store
        .append_web_search_results(s.id, &[web_result(s.id, "Mirrors")], "Mirrors\nReflect light.")
        .await
        .unwrap();
    assert_eq!(
        second.web_search_content,
        "Lenses\nBend light.\n\nMirrors\nReflect light."
    );

    let err = store
        .append_web_search_results(Uuid::new_v4(), &[], "nothing")
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn listing_is_newest_first_and_delete_cascades() {
    let Some(store) = pg_store().await else { return };
    let older = session("Algebra");
    let mut newer = session("Geometry");
    newer.user_id = older.user_id.clone();
    newer.created_at = older.created_at;
    let file = ReferenceFile::new(older.id, "notes.txt".into(), "x".into(), None);
    store.create_session(&older, &[file]).await.unwrap();
    store.create_session(&newer, &[]).await.unwrap();

    let listed: Vec<Uuid> = store
        .list_sessions_by_user(&older.user_id, None)
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, vec![newer.id, older.id]);
    let filtered = store
        .list_sessions_by_user(&older.user_id, Some("Geo"))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);

    let mut with_outline = older.clone();
    with_outline.outline = Some(OutlineNode::with_children("A", vec![OutlineNode::leaf("B")]));
    store.update_session(&with_outline, None).await.unwrap();
    store.save_knowledge_recalls(&[recall(older.id, "c1", 0.4)]).await.unwrap();
    store
        .append_web_search_results(older.id, &[web_result(older.id, "Lenses")], "Lenses")
        .await
        .unwrap();

    store.delete_session(older.id).await.unwrap();
    assert!(store.get_reference_files(older.id).await.unwrap().is_empty());
    assert!(store.get_knowledge_recalls(older.id).await.unwrap().is_empty());
    assert!(store.get_web_search_results(older.id).await.unwrap().is_empty());
    assert!(store.get_outline_rows(older.id).await.unwrap().is_empty());
    assert!(matches!(
        store.get_session_by_id(older.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_session(older.id).await,
        Err(PortError::NotFound(_))
    ));
}
