//! services/api/src/web/design_stream.rs
//!
//! Produces the teaching-design stream: a `pending` frame, the design text in
//! fixed-size character slices, then `finish`. A missing session ends the
//! stream with an `error` frame instead.
//!
//! The stream stops producing as soon as it is dropped (client disconnect) or
//! the shutdown token is cancelled.

use crate::web::protocol::DesignFrame;
use crate::workflow::{SessionWorkflow, WorkflowError};
use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

const LOADING_MESSAGE: &str = "loading teaching design";
const FINISHED_MESSAGE: &str = "transfer complete";

/// Pacing of the design stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub chunk_size: usize,
    pub delay: Duration,
}

/// Splits `text` into slices of at most `size` characters.
pub fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|slice| slice.iter().collect())
        .collect()
}

pub fn design_stream(
    workflow: Arc<SessionWorkflow>,
    session_id: Uuid,
    settings: StreamSettings,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        yield Ok(DesignFrame::pending(LOADING_MESSAGE).encode());

        let design = match workflow.get_design(session_id).await {
            Ok(design) => design,
            Err(WorkflowError::SessionNotFound(_)) => {
                warn!(%session_id, "Design requested for a missing session");
                yield Ok(DesignFrame::error("session not found").encode());
                return;
            }
            Err(e) => {
                warn!(%session_id, error = %e, "Failed to load teaching design");
                yield Ok(DesignFrame::error(format!("failed to load teaching design: {}", e)).encode());
                return;
            }
        };

        let chunks = chunk_chars(&design, settings.chunk_size);
        info!(%session_id, chunks = chunks.len(), "Streaming teaching design");
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!(%session_id, "Design stream cancelled by shutdown");
                        return;
                    }
                    _ = tokio::time::sleep(settings.delay) => {}
                }
            }
            yield Ok(DesignFrame::streaming(chunk).encode());
        }

        yield Ok(DesignFrame::finish(FINISHED_MESSAGE).encode());
    }
}
