//! services/api/src/adapters/recall.rs
//!
//! A `KnowledgeRetriever` that answers every query with the same three ranked
//! snippets. Stands in for a real knowledge-base backend.

use async_trait::async_trait;
use lesson_deck_core::domain::RecallCandidate;
use lesson_deck_core::ports::{KnowledgeRetriever, PortResult};

const SCORES: [f64; 3] = [0.95, 0.88, 0.82];
const DEFAULT_SOURCE: &str = "知识库";

#[derive(Clone, Default)]
pub struct StaticRetriever;

impl StaticRetriever {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn recall(&self, query: &str, kb_ids: &[String]) -> PortResult<Vec<RecallCandidate>> {
        let source = if kb_ids.is_empty() {
            DEFAULT_SOURCE.to_string()
        } else {
            kb_ids.join(",")
        };
        Ok(SCORES
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let n = i + 1;
                RecallCandidate {
                    content: format!("关于{}的相关知识点{}...", query, n),
                    source: format!("{}文档{}", source, n),
                    score: *score,
                    chunk_id: format!("chunk_{:03}", n),
                }
            })
            .collect())
    }
}
