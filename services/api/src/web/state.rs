//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::design_stream::StreamSettings;
use crate::workflow::SessionWorkflow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<SessionWorkflow>,
    pub config: Arc<Config>,
    /// Cancelled on shutdown; long-running responses watch a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(workflow: Arc<SessionWorkflow>, config: Arc<Config>) -> Self {
        Self {
            workflow,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            chunk_size: self.config.design_chunk_size,
            delay: self.config.design_chunk_delay,
        }
    }
}
