//! crates/lesson_deck_core/src/domain.rs
//!
//! Defines the core data structures for a presentation-creation session and
//! the artifacts staged on it. These structs are independent of any database
//! or wire format; the small value types that cross the wire verbatim
//! (`ClassType`, `SessionState`, `OutlineNode`) carry serde derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::outline::OutlineNode;
use crate::state::SessionState;

/// Fixed suffix appended to the user's query to form a session title.
pub const TITLE_SUFFIX: &str = "PPT生成任务";

/// The kind of lesson a deck is prepared for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    #[default]
    #[serde(rename = "新授课", alias = "newLesson", alias = "new-lesson")]
    NewLesson,
    #[serde(rename = "复习课", alias = "reviewLesson", alias = "review-lesson")]
    ReviewLesson,
}

impl ClassType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::NewLesson => "新授课",
            ClassType::ReviewLesson => "复习课",
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown class type: {0}")]
pub struct UnknownClassType(pub String);

impl FromStr for ClassType {
    type Err = UnknownClassType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "新授课" | "newLesson" | "new-lesson" => Ok(ClassType::NewLesson),
            "复习课" | "reviewLesson" | "review-lesson" => Ok(ClassType::ReviewLesson),
            other => Err(UnknownClassType(other.to_string())),
        }
    }
}

/// Generation settings chosen when the session is created. Never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub pages: u32,
    pub class_type: ClassType,
    pub kb_ids: Vec<String>,
    pub web_search: bool,
}

/// One user-initiated presentation-creation workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub user_input: String,
    pub title: String,
    pub config: SessionConfig,
    pub web_search_content: String,
    pub state: SessionState,
    pub target: Vec<String>,
    pub outline: Option<OutlineNode>,
    pub design: String,
    pub presentation_id: Option<Uuid>,
    /// Bumped by every successful update; used to reject stale writes.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Builds a fresh session in the first workflow state with every staged field empty.
    pub fn new(user_id: String, user_input: String, config: SessionConfig) -> Self {
        let now = Utc::now();
        let title = format!("{}{}", user_input, TITLE_SUFFIX);
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_input,
            title,
            config,
            web_search_content: String::new(),
            state: SessionState::ConfirmFiles,
            target: Vec::new(),
            outline: None,
            design: String::new(),
            presentation_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A document attached to a session as reference material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFile {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub content: String,
    pub url: Option<String>,
}

impl ReferenceFile {
    pub fn new(session_id: Uuid, name: String, content: String, url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            name,
            content,
            url,
        }
    }
}

/// A ranked snippet returned by the knowledge-retrieval collaborator, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallCandidate {
    pub content: String,
    pub source: String,
    pub score: f64,
    pub chunk_id: String,
}

/// A stored knowledge snippet the user may select for the deck.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeRecall {
    pub id: Uuid,
    pub session_id: Uuid,
    pub content: String,
    pub source: String,
    pub score: f64,
    pub chunk_id: String,
    pub is_selected: bool,
    pub selected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecall {
    /// Stores a candidate as an unselected recall item.
    pub fn from_candidate(session_id: Uuid, candidate: RecallCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            content: candidate.content,
            source: candidate.source,
            score: candidate.score,
            chunk_id: candidate.chunk_id,
            is_selected: false,
            selected_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A single hit returned by the web-search collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
    pub snippet: String,
}

/// A stored web-search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchResult {
    pub id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub content: String,
    pub url: String,
    pub snippet: String,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

impl WebSearchResult {
    pub fn from_hit(session_id: Uuid, hit: WebSearchHit) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            title: hit.title,
            content: hit.content,
            url: hit.url,
            snippet: hit.snippet,
            is_selected: true,
            created_at: Utc::now(),
        }
    }
}

/// A slide-deck template from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PptTemplate {
    pub id: Uuid,
    pub title: String,
    pub cover: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            pages: 5,
            class_type: ClassType::NewLesson,
            kb_ids: vec!["kb1".to_string()],
            web_search: false,
        }
    }

    #[test]
    fn new_session_starts_empty_in_first_state() {
        let session = Session::new("u1".into(), "Quadratics".into(), config());
        assert_eq!(session.title, "QuadraticsPPT生成任务");
        assert_eq!(session.state, SessionState::ConfirmFiles);
        assert!(session.target.is_empty());
        assert!(session.outline.is_none());
        assert!(session.design.is_empty());
        assert!(session.presentation_id.is_none());
        assert_eq!(session.version, 0);
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn class_type_accepts_wire_and_alias_forms() {
        assert_eq!("新授课".parse::<ClassType>(), Ok(ClassType::NewLesson));
        assert_eq!("review-lesson".parse::<ClassType>(), Ok(ClassType::ReviewLesson));
        assert!("lecture".parse::<ClassType>().is_err());

        let parsed: ClassType = serde_json::from_str("\"reviewLesson\"").unwrap();
        assert_eq!(parsed, ClassType::ReviewLesson);
        assert_eq!(serde_json::to_string(&ClassType::NewLesson).unwrap(), "\"新授课\"");
    }

    #[test]
    fn recall_candidates_are_stored_unselected() {
        let recall = KnowledgeRecall::from_candidate(
            Uuid::new_v4(),
            RecallCandidate {
                content: "c".into(),
                source: "s".into(),
                score: 0.5,
                chunk_id: "chunk_001".into(),
            },
        );
        assert!(!recall.is_selected);
        assert!(recall.selected_at.is_none());
    }
}
