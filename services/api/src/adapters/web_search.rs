//! services/api/src/adapters/web_search.rs
//!
//! This module contains the adapters for the `WebSearcher` port: one backed by
//! the OpenAI Responses API with its built-in web search tool, and one used when
//! no API key is configured.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a research assistant helping a teacher prepare a lesson.

Use the web search tool to find reference material for the topic you are given.

Output format:
- Write one JSON object per line and nothing else. No prose, no headings, no code fences.
- Each object has exactly these string fields: "title", "url", "snippet", "content".
- "snippet" is one or two sentences summarising the page.
- "content" is a short paragraph with the facts from the page that a teacher could use.
- Return at most {max_results} objects, most useful first."#;

const USER_INPUT_TEMPLATE: &str = "Find teaching reference material about: {query}";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::responses::{CreateResponseArgs, Tool, WebSearchTool},
    Client,
};
use async_trait::async_trait;
use lesson_deck_core::domain::WebSearchHit;
use lesson_deck_core::ports::{PortError, PortResult, WebSearcher};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

const MAX_RESULTS: usize = 5;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `WebSearcher` using an OpenAI model with web search.
#[derive(Clone)]
pub struct OpenAiWebSearcher {
    client: Client<OpenAIConfig>,
    model: String,
    citation_regex: Regex,
}

/// One line of the model's answer.
#[derive(Deserialize)]
struct HitLine {
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    content: String,
}

impl OpenAiWebSearcher {
    /// Creates a new `OpenAiWebSearcher`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> PortResult<Self> {
        // Markdown citations like ([example.com](https://example.com))
        let citation_regex = Regex::new(r"\(\[.*?\]\(.*?\)\)")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            model,
            citation_regex,
        })
    }

    fn remove_citations(&self, text: &str) -> String {
        self.citation_regex.replace_all(text, "").trim().to_string()
    }

    /// Turns the model's JSON-lines answer into hits, skipping lines that do not parse.
    fn parse_hits(&self, raw: &str) -> Vec<WebSearchHit> {
        raw.lines()
            .map(str::trim)
            .filter(|line| line.starts_with('{'))
            .filter_map(|line| match serde_json::from_str::<HitLine>(line) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable web search line");
                    None
                }
            })
            .filter(|hit| !hit.title.trim().is_empty())
            .take(MAX_RESULTS)
            .map(|hit| WebSearchHit {
                title: hit.title.trim().to_string(),
                url: hit.url.trim().to_string(),
                snippet: self.remove_citations(&hit.snippet),
                content: self.remove_citations(&hit.content),
            })
            .collect()
    }
}

//=========================================================================================
// `WebSearcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl WebSearcher for OpenAiWebSearcher {
    async fn search(&self, query: &str) -> PortResult<Vec<WebSearchHit>> {
        let instructions =
            SYSTEM_INSTRUCTIONS.replace("{max_results}", &MAX_RESULTS.to_string());
        let user_input = USER_INPUT_TEMPLATE.replace("{query}", query);

        // Build the request using Responses API with web search tool
        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(instructions)
            .input(user_input)
            .tools(vec![Tool::WebSearch(WebSearchTool::default())])
            .max_output_tokens(2000u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw_answer = response.output_text().unwrap_or_default();
        let hits = self.parse_hits(&raw_answer);
        info!(query, hits = hits.len(), "Web search finished");
        Ok(hits)
    }
}

//=========================================================================================
// Fallback Adapter
//=========================================================================================

/// Used when no OpenAI key is configured. Every search fails.
#[derive(Clone, Default)]
pub struct DisabledWebSearcher;

#[async_trait]
impl WebSearcher for DisabledWebSearcher {
    async fn search(&self, _query: &str) -> PortResult<Vec<WebSearchHit>> {
        Err(PortError::Unexpected(
            "web search is not configured on this server".to_string(),
        ))
    }
}
