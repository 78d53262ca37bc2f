//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Handlers only decode requests, call the workflow and render the outcome;
//! every decision about envelopes versus hard faults lives in `respond`.

use crate::error::ApiError;
use crate::web::design_stream::design_stream;
use crate::web::envelope::Envelope;
use crate::web::extract::{ValidJson, ValidPath, ValidQuery};
use crate::web::respond::{respond, EnvelopeResult};
use crate::web::state::AppState;
use crate::workflow::{InitRequest, NewReferenceFile};
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use lesson_deck_core::domain::{
    ClassType, KnowledgeRecall, PptTemplate, ReferenceFile, Session, SessionConfig,
    WebSearchResult,
};
use lesson_deck_core::outline::{OutlineNode, OutlineRow};
use lesson_deck_core::policy::Operation;
use lesson_deck_core::state::SessionState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        init_session_handler,
        list_sessions_handler,
        get_session_handler,
        delete_session_handler,
        advance_state_handler,
        complete_generation_handler,
        concat_files_handler,
        upload_file_handler,
        list_files_handler,
        get_target_handler,
        confirm_target_handler,
        get_outline_handler,
        confirm_outline_handler,
        list_outline_nodes_handler,
        design_stream_handler,
        confirm_design_handler,
        run_web_search_handler,
        list_web_search_handler,
        trigger_recall_handler,
        update_selection_handler,
        list_recalls_handler,
        list_templates_handler,
    ),
    components(
        schemas(
            Envelope,
            InitSessionRequest,
            SessionConfigDto,
            FileDto,
            InitSessionResponse,
            HistoryItem,
            SessionView,
            SessionConfigView,
            AdvanceStateRequest,
            CompleteGenerationRequest,
            ConcatFilesRequest,
            ReferenceFileView,
            ConfirmTargetRequest,
            ConfirmOutlineRequest,
            ConfirmDesignRequest,
            ConfirmResponse,
            OutlineRowView,
            WebSearchResultView,
            RecallItem,
            TriggerRecallResponse,
            UpdateSelectionRequest,
            SelectionResponse,
            TemplateView,
        )
    ),
    tags(
        (name = "Lesson Deck API", description = "Guided workflow for building lesson slide decks.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigDto {
    pub pages: u32,
    #[schema(value_type = String, example = "新授课")]
    pub class_type: ClassType,
    pub kb_ids: Vec<String>,
    pub web_search: bool,
}

/// A reference document supplied inline.
#[derive(Deserialize, ToSchema)]
pub struct FileDto {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<FileDto> for NewReferenceFile {
    fn from(dto: FileDto) -> Self {
        NewReferenceFile {
            name: dto.name,
            content: dto.content,
            url: dto.url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitSessionRequest {
    pub user_id: String,
    #[serde(alias = "query")]
    pub user_input: String,
    pub config: SessionConfigDto,
    #[serde(default)]
    pub files: Vec<FileDto>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: Option<String>,
}

/// Identifies the session of a stage operation.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    /// The session id.
    pub s: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStateRequest {
    pub session_id: Uuid,
    #[schema(value_type = String, example = "confirmTarget")]
    pub state: SessionState,
    pub expected_version: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteGenerationRequest {
    pub session_id: Uuid,
    pub presentation_id: Uuid,
    pub expected_version: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConcatFilesRequest {
    pub session_id: Uuid,
    pub files: Vec<FileDto>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTargetRequest {
    pub session_id: Uuid,
    pub target: Vec<String>,
    pub expected_version: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutlineRequest {
    pub session_id: Uuid,
    #[schema(value_type = Object)]
    pub tree: OutlineNode,
    pub expected_version: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDesignRequest {
    pub session_id: Uuid,
    pub design: String,
    pub expected_version: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSelectionRequest {
    /// Optional; must match the path when given.
    #[serde(default, alias = "session_id")]
    pub session_id: Option<Uuid>,
    #[serde(alias = "selected_chunk_ids")]
    pub selected_chunk_ids: Vec<String>,
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitSessionResponse {
    pub session_id: Uuid,
    pub title: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub session_id: Uuid,
    pub state: String,
    pub title: String,
    pub created: DateTime<Utc>,
}

impl From<Session> for HistoryItem {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            state: session.state.as_str().to_string(),
            title: session.title,
            created: session.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigView {
    pub pages: u32,
    pub class_type: String,
    pub kb_ids: Vec<String>,
    pub web_search: bool,
}

impl From<SessionConfig> for SessionConfigView {
    fn from(config: SessionConfig) -> Self {
        Self {
            pages: config.pages,
            class_type: config.class_type.as_str().to_string(),
            kb_ids: config.kb_ids,
            web_search: config.web_search,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub user_id: String,
    pub user_input: String,
    pub title: String,
    pub config: SessionConfigView,
    pub web_search_content: String,
    pub state: String,
    pub target: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub outline: Option<OutlineNode>,
    pub design: String,
    pub presentation_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            user_input: session.user_input,
            title: session.title,
            config: session.config.into(),
            web_search_content: session.web_search_content,
            state: session.state.as_str().to_string(),
            target: session.target,
            outline: session.outline,
            design: session.design,
            presentation_id: session.presentation_id,
            version: session.version,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// What a confirm or state change leaves behind.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub session_id: Uuid,
    pub state: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for ConfirmResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            state: session.state.as_str().to_string(),
            version: session.version,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceFileView {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub url: Option<String>,
}

impl From<ReferenceFile> for ReferenceFileView {
    fn from(file: ReferenceFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            content: file.content,
            url: file.url,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRowView {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub order_index: i32,
}

impl From<OutlineRow> for OutlineRowView {
    fn from(row: OutlineRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            title: row.title,
            order_index: row.order_index,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchResultView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub url: String,
    pub snippet: String,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WebSearchResult> for WebSearchResultView {
    fn from(result: WebSearchResult) -> Self {
        Self {
            id: result.id,
            title: result.title,
            content: result.content,
            url: result.url,
            snippet: result.snippet,
            is_selected: result.is_selected,
            created_at: result.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecallItem {
    pub id: Uuid,
    pub content: String,
    pub source: String,
    pub score: f64,
    pub chunk_id: String,
    pub is_selected: bool,
    pub selected_at: Option<DateTime<Utc>>,
}

impl From<KnowledgeRecall> for RecallItem {
    fn from(recall: KnowledgeRecall) -> Self {
        Self {
            id: recall.id,
            content: recall.content,
            source: recall.source,
            score: recall.score,
            chunk_id: recall.chunk_id,
            is_selected: recall.is_selected,
            selected_at: recall.selected_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecallResponse {
    pub session_id: Uuid,
    pub recalls: Vec<RecallItem>,
    pub total_count: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub selected_count: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub id: Uuid,
    pub title: String,
    pub cover: String,
    pub created_at: DateTime<Utc>,
}

impl From<PptTemplate> for TemplateView {
    fn from(template: PptTemplate) -> Self {
        Self {
            id: template.id,
            title: template.title,
            cover: template.cover,
            created_at: template.created_at,
        }
    }
}

fn views<T, V: From<T>>(items: Vec<T>) -> Vec<V> {
    items.into_iter().map(V::from).collect()
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Open a new deck-creation session.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/init",
    request_body = InitSessionRequest,
    responses(
        (status = 200, description = "Envelope with `{sessionId, title}`", body = Envelope),
        (status = 422, description = "Malformed body or a page count of zero")
    )
)]
pub async fn init_session_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<InitSessionRequest>,
) -> EnvelopeResult {
    let request = InitRequest {
        user_id: payload.user_id,
        query: payload.user_input,
        config: SessionConfig {
            pages: payload.config.pages,
            class_type: payload.config.class_type,
            kb_ids: payload.config.kb_ids,
            web_search: payload.config.web_search,
        },
        files: views(payload.files),
    };
    let outcome = app_state
        .workflow
        .init_session(request)
        .await
        .map(|session| InitSessionResponse {
            session_id: session.id,
            title: session.title,
        });
    respond(Operation::InitSession, "session initialised", outcome)
}

/// A user's sessions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/edu/list",
    params(ListQuery),
    responses((status = 200, description = "Envelope with a list of history items", body = Envelope))
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_sessions(&query.user_id, query.title.as_deref())
        .await
        .map(views::<Session, HistoryItem>);
    respond(Operation::ListSessions, "ok", outcome)
}

/// Look up one session by id.
#[utoipa::path(
    get,
    path = "/api/v1/edu/session/{id}",
    params(("id" = Uuid, Path, description = "The session id")),
    responses(
        (status = 200, description = "Envelope with the full session", body = Envelope),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    ValidPath(session_id): ValidPath<Uuid>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .get_session(session_id)
        .await
        .map(SessionView::from);
    respond(Operation::GetSession, "ok", outcome)
}

/// Delete a session and everything staged on it.
#[utoipa::path(
    delete,
    path = "/api/v1/edu/{id}",
    params(("id" = Uuid, Path, description = "The session id")),
    responses((status = 200, description = "Envelope", body = Envelope))
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    ValidPath(session_id): ValidPath<Uuid>,
) -> EnvelopeResult {
    let outcome = app_state.workflow.delete_session(session_id).await;
    respond(Operation::DeleteSession, "session deleted", outcome)
}

/// Move a session to another workflow state.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/state",
    request_body = AdvanceStateRequest,
    responses(
        (status = 200, description = "Envelope with the new state and version", body = Envelope),
        (status = 422, description = "Illegal transition")
    )
)]
pub async fn advance_state_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<AdvanceStateRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .advance_state(payload.session_id, payload.state, payload.expected_version)
        .await
        .map(ConfirmResponse::from);
    respond(Operation::AdvanceState, "state changed", outcome)
}

/// Record the generated presentation and finish the session.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/complete",
    request_body = CompleteGenerationRequest,
    responses(
        (status = 200, description = "Envelope with the final state", body = Envelope),
        (status = 422, description = "Session is not generating")
    )
)]
pub async fn complete_generation_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<CompleteGenerationRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .complete_generation(payload.session_id, payload.presentation_id, payload.expected_version)
        .await
        .map(ConfirmResponse::from);
    respond(Operation::CompleteGeneration, "generation completed", outcome)
}

//=========================================================================================
// Reference File Handlers
//=========================================================================================

/// Attach more reference files to a session.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/concat",
    request_body = ConcatFilesRequest,
    responses((status = 200, description = "Envelope with the stored files", body = Envelope))
)]
pub async fn concat_files_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<ConcatFilesRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .add_reference_files(payload.session_id, views(payload.files))
        .await
        .map(views::<ReferenceFile, ReferenceFileView>);
    respond(Operation::AddReferenceFiles, "files added", outcome)
}

/// Upload a plain-text document as a reference file.
///
/// Accepts a multipart/form-data request with a single file part.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/upload",
    params(SessionQuery),
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 200, description = "Envelope with the stored file", body = Envelope),
        (status = 422, description = "No file part in the form")
    )
)]
pub async fn upload_file_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> EnvelopeResult {
    let mut multipart = multipart.map_err(|e| ApiError::Validation(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {}", e)))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("untitled.txt").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read file bytes: {}", e)))?;
        upload = Some((name, data));
        break;
    }
    let (name, data) = upload
        .ok_or_else(|| ApiError::Validation("Multipart form must include a file".to_string()))?;

    let outcome = app_state
        .workflow
        .upload_reference_file(query.s, &name, &data)
        .await
        .map(ReferenceFileView::from);
    respond(Operation::UploadReferenceFile, "file uploaded", outcome)
}

/// Reference files of a session.
#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/files",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with the files", body = Envelope))
)]
pub async fn list_files_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_reference_files(query.s)
        .await
        .map(views::<ReferenceFile, ReferenceFileView>);
    respond(Operation::ListReferenceFiles, "ok", outcome)
}

//=========================================================================================
// Stage Handlers
//=========================================================================================

/// The teaching target list; a placeholder while none is confirmed.
#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/target",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with a list of goals", body = Envelope))
)]
pub async fn get_target_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state.workflow.get_target(query.s).await;
    respond(Operation::GetTarget, "ok", outcome)
}

#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/target",
    request_body = ConfirmTargetRequest,
    responses((status = 200, description = "Envelope with the new version", body = Envelope))
)]
pub async fn confirm_target_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<ConfirmTargetRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .confirm_target(payload.session_id, payload.target, payload.expected_version)
        .await
        .map(ConfirmResponse::from);
    respond(Operation::ConfirmTarget, "teaching target confirmed", outcome)
}

/// The outline tree; a placeholder while none is confirmed.
#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/outline",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with the outline tree", body = Envelope))
)]
pub async fn get_outline_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state.workflow.get_outline(query.s).await;
    respond(Operation::GetOutline, "ok", outcome)
}

#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/outline",
    request_body = ConfirmOutlineRequest,
    responses((status = 200, description = "Envelope with the new version", body = Envelope))
)]
pub async fn confirm_outline_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<ConfirmOutlineRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .confirm_outline(payload.session_id, payload.tree, payload.expected_version)
        .await
        .map(ConfirmResponse::from);
    respond(Operation::ConfirmOutline, "teaching outline confirmed", outcome)
}

/// The confirmed outline as flat rows.
#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/outline/nodes",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with outline rows", body = Envelope))
)]
pub async fn list_outline_nodes_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_outline_nodes(query.s)
        .await
        .map(views::<OutlineRow, OutlineRowView>);
    respond(Operation::ListOutlineNodes, "ok", outcome)
}

/// Stream the teaching design as JSON frames.
#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/target-description",
    params(SessionQuery),
    responses((status = 200, description = "`pending`, `streaming`..., then `finish` or `error` frames", body = String, content_type = "text/event-stream"))
)]
pub async fn design_stream_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> Response {
    let stream = design_stream(
        app_state.workflow.clone(),
        query.s,
        app_state.stream_settings(),
        app_state.shutdown.child_token(),
    );
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/target-description",
    request_body = ConfirmDesignRequest,
    responses((status = 200, description = "Envelope with the new version", body = Envelope))
)]
pub async fn confirm_design_handler(
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<ConfirmDesignRequest>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .confirm_design(payload.session_id, payload.design, payload.expected_version)
        .await
        .map(ConfirmResponse::from);
    respond(Operation::ConfirmDesign, "teaching design confirmed", outcome)
}

//=========================================================================================
// Web Search Handlers
//=========================================================================================

/// Search the web for the session's query and store the hits.
#[utoipa::path(
    post,
    path = "/api/v1/edu/generate/websearch",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with the stored results", body = Envelope))
)]
pub async fn run_web_search_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .run_web_search(query.s)
        .await
        .map(views::<WebSearchResult, WebSearchResultView>);
    respond(Operation::RunWebSearch, "web search finished", outcome)
}

#[utoipa::path(
    get,
    path = "/api/v1/edu/generate/websearch",
    params(SessionQuery),
    responses((status = 200, description = "Envelope with the stored results", body = Envelope))
)]
pub async fn list_web_search_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<SessionQuery>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_web_search_results(query.s)
        .await
        .map(views::<WebSearchResult, WebSearchResultView>);
    respond(Operation::ListWebSearchResults, "ok", outcome)
}

//=========================================================================================
// Knowledge Handlers
//=========================================================================================

/// Recall knowledge snippets for a session.
#[utoipa::path(
    post,
    path = "/api/v1/edu/knowledge/{id}/recall",
    params(("id" = Uuid, Path, description = "The session id")),
    responses(
        (status = 200, description = "Envelope with the stored recalls", body = Envelope),
        (status = 404, description = "No such session")
    )
)]
pub async fn trigger_recall_handler(
    State(app_state): State<Arc<AppState>>,
    ValidPath(session_id): ValidPath<Uuid>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .trigger_recall(session_id)
        .await
        .map(|recalls| TriggerRecallResponse {
            session_id,
            total_count: recalls.len(),
            recalls: views(recalls),
        });
    respond(Operation::TriggerRecall, "knowledge recalled", outcome)
}

/// Replace the set of selected recalls.
#[utoipa::path(
    post,
    path = "/api/v1/edu/knowledge/{id}/selection",
    params(("id" = Uuid, Path, description = "The session id")),
    request_body = UpdateSelectionRequest,
    responses((status = 200, description = "Envelope with `{selectedCount}`", body = Envelope))
)]
pub async fn update_selection_handler(
    State(app_state): State<Arc<AppState>>,
    ValidPath(session_id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<UpdateSelectionRequest>,
) -> EnvelopeResult {
    if payload.session_id.is_some_and(|body_id| body_id != session_id) {
        return Err(ApiError::Validation(
            "sessionId in the body does not match the path".to_string(),
        ));
    }
    let outcome = app_state
        .workflow
        .update_selection(session_id, &payload.selected_chunk_ids)
        .await
        .map(|selected_count| SelectionResponse { selected_count });
    respond(Operation::UpdateSelection, "selection updated", outcome)
}

/// Recalls of a session, highest score first.
#[utoipa::path(
    get,
    path = "/api/v1/edu/knowledge/{id}/recalls",
    params(("id" = Uuid, Path, description = "The session id")),
    responses((status = 200, description = "Envelope with the recalls", body = Envelope))
)]
pub async fn list_recalls_handler(
    State(app_state): State<Arc<AppState>>,
    ValidPath(session_id): ValidPath<Uuid>,
) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_recalls(session_id)
        .await
        .map(views::<KnowledgeRecall, RecallItem>);
    respond(Operation::ListRecalls, "ok", outcome)
}

//=========================================================================================
// Template Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/v1/edu/templates",
    responses((status = 200, description = "Envelope with the template catalogue", body = Envelope))
)]
pub async fn list_templates_handler(State(app_state): State<Arc<AppState>>) -> EnvelopeResult {
    let outcome = app_state
        .workflow
        .list_templates()
        .await
        .map(views::<PptTemplate, TemplateView>);
    respond(Operation::ListTemplates, "ok", outcome)
}
