//! services/api/src/web/respond.rs
//!
//! Turns a workflow outcome into either an envelope or a hard fault. Which one
//! a missing session becomes is decided by the operation's not-found policy.

use crate::error::ApiError;
use crate::web::envelope::Envelope;
use crate::workflow::{WorkflowError, WorkflowResult};
use axum::Json;
use lesson_deck_core::policy::{NotFoundPolicy, Operation};
use serde::Serialize;
use tracing::{error, warn};

pub const SESSION_NOT_FOUND: &str = "session not found";
pub const CONCURRENT_MODIFICATION: &str = "session was modified concurrently";

pub type EnvelopeResult = Result<Json<Envelope>, ApiError>;

pub fn respond<T: Serialize>(
    op: Operation,
    success_message: &str,
    outcome: WorkflowResult<T>,
) -> EnvelopeResult {
    match outcome {
        Ok(data) => match serde_json::to_value(data) {
            Ok(value) => Ok(Json(Envelope::success(success_message, value))),
            Err(e) => {
                error!(?op, error = %e, "Failed to serialize response data");
                Ok(Json(Envelope::error(op.failure_message(), Some(e.to_string()))))
            }
        },
        Err(e) => reject(op, e),
    }
}

pub fn reject(op: Operation, err: WorkflowError) -> EnvelopeResult {
    match err {
        WorkflowError::SessionNotFound(session_id) => {
            warn!(?op, %session_id, "Session not found");
            match op.not_found_policy() {
                NotFoundPolicy::HardFault => Err(ApiError::NotFound(SESSION_NOT_FOUND.to_string())),
                NotFoundPolicy::Envelope => Ok(Json(Envelope::error(SESSION_NOT_FOUND, None))),
            }
        }
        WorkflowError::Invalid(msg) => {
            warn!(?op, reason = %msg, "Invalid request");
            Err(ApiError::Validation(msg))
        }
        WorkflowError::Rejected(msg) => {
            warn!(?op, reason = %msg, "Request rejected");
            Ok(Json(Envelope::error(msg, None)))
        }
        WorkflowError::Conflict => {
            warn!(?op, "Stale session version");
            Ok(Json(Envelope::error(CONCURRENT_MODIFICATION, None)))
        }
        WorkflowError::Port(e) => {
            error!(?op, error = %e, "Operation failed");
            Ok(Json(Envelope::error(op.failure_message(), Some(e.to_string()))))
        }
    }
}
