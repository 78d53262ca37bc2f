//! services/api/src/bin/api.rs

use async_openai::{config::OpenAIConfig, Client};
use lesson_deck_api::{
    adapters::{
        DisabledWebSearcher, InMemoryStore, OpenAiWebSearcher, PgStore, PlainTextConverter,
        StaticRetriever,
    },
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
    workflow::{SessionWorkflow, WorkflowPorts},
};
use lesson_deck_core::ports::{SessionStore, WebSearcher};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Prepare the Data Directory ---
    tokio::fs::create_dir_all(config.uploads_dir()).await?;
    info!("Data directory ready at {}", config.data_dir.display());

    // --- 3. Connect to Storage & Run Migrations ---
    let store: Arc<dyn SessionStore> = if config.uses_memory_store() {
        warn!("DATABASE_URL=memory: sessions live in process memory and are lost on exit");
        Arc::new(InMemoryStore::new())
    } else {
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        let pg_store = PgStore::new(db_pool);
        info!("Running database migrations...");
        pg_store.run_migrations().await?;
        info!("Database migrations complete.");
        Arc::new(pg_store)
    };

    // --- 4. Initialize Service Adapters ---
    let searcher: Arc<dyn WebSearcher> = match &config.openai_api_key {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Arc::new(OpenAiWebSearcher::new(
                openai_client,
                config.web_search_model.clone(),
            )?)
        }
        None => {
            warn!("OPENAI_API_KEY is not set; web search is disabled");
            Arc::new(DisabledWebSearcher)
        }
    };

    let workflow = Arc::new(SessionWorkflow::new(
        WorkflowPorts {
            store,
            retriever: Arc::new(StaticRetriever::new()),
            searcher,
            converter: Arc::new(PlainTextConverter::new()),
        },
        config.backfill,
        config.uploads_dir(),
    ));

    // --- 5. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState::new(workflow, config.clone()));
    let shutdown = app_state.shutdown.clone();
    let app = build_router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl-C and cancels the shared token so open design streams end.
async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received.");
    token.cancel();
}
