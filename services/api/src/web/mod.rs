pub mod design_stream;
pub mod envelope;
pub mod extract;
pub mod protocol;
pub mod respond;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use rest::*;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const API_PREFIX: &str = "/api/v1/edu";

/// Builds the complete application: the API routes under `/api/v1/edu` and
/// the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let edu_routes = Router::new()
        // --- Sessions ---
        .route("/generate/init", post(init_session_handler))
        .route("/list", get(list_sessions_handler))
        .route("/session/{id}", get(get_session_handler))
        .route("/{id}", delete(delete_session_handler))
        .route("/generate/state", post(advance_state_handler))
        .route("/generate/complete", post(complete_generation_handler))
        // --- Reference files ---
        .route("/generate/concat", post(concat_files_handler))
        .route("/generate/upload", post(upload_file_handler))
        .route("/generate/files", get(list_files_handler))
        // --- Stages ---
        .route("/generate/target", get(get_target_handler).post(confirm_target_handler))
        .route("/generate/outline", get(get_outline_handler).post(confirm_outline_handler))
        .route("/generate/outline/nodes", get(list_outline_nodes_handler))
        .route(
            "/generate/target-description",
            get(design_stream_handler).post(confirm_design_handler),
        )
        // --- Web search ---
        .route(
            "/generate/websearch",
            get(list_web_search_handler).post(run_web_search_handler),
        )
        // --- Knowledge ---
        .route("/knowledge/{id}/recall", post(trigger_recall_handler))
        .route("/knowledge/{id}/selection", post(update_selection_handler))
        .route("/knowledge/{id}/recalls", get(list_recalls_handler))
        // --- Templates ---
        .route("/templates", get(list_templates_handler));

    let api_router = Router::new()
        .nest(API_PREFIX, edu_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
