//! services/api/src/web/envelope.rs
//!
//! The uniform `{code, message, data}` wrapper every non-streaming operation
//! answers with.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub const CODE_SUCCESS: i32 = 0;
pub const CODE_ERROR: i32 = 1;

/// Result envelope. `code` is 0 on success and 1 on a business error.
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope {
    pub code: i32,
    pub message: String,
    #[schema(value_type = Object, nullable = true)]
    pub data: Value,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: CODE_SUCCESS,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>, data: Option<String>) -> Self {
        Self {
            code: CODE_ERROR,
            message: message.into(),
            data: data.map(Value::String).unwrap_or(Value::Null),
        }
    }
}
