//! services/api/src/web/protocol.rs
//!
//! Defines the frames of the teaching-design stream. Each frame is one JSON
//! object followed by a blank line.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Marks where a frame sits in the stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Always the first frame.
    Pending,
    /// Carries one slice of the design text.
    Streaming,
    /// The design has been sent in full.
    Finish,
    /// The stream ends without the design.
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DesignFrame {
    #[serde(rename = "type")]
    pub kind: FrameType,
    pub chunk: Option<String>,
    pub msg: Option<String>,
}

impl DesignFrame {
    pub fn pending(msg: impl Into<String>) -> Self {
        Self {
            kind: FrameType::Pending,
            chunk: None,
            msg: Some(msg.into()),
        }
    }

    pub fn streaming(chunk: String) -> Self {
        Self {
            kind: FrameType::Streaming,
            chunk: Some(chunk),
            msg: None,
        }
    }

    pub fn finish(msg: impl Into<String>) -> Self {
        Self {
            kind: FrameType::Finish,
            chunk: Some(String::new()),
            msg: Some(msg.into()),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            kind: FrameType::Error,
            chunk: None,
            msg: Some(msg.into()),
        }
    }

    /// The frame as it goes on the wire.
    pub fn encode(&self) -> Bytes {
        match serde_json::to_string(self) {
            Ok(json) => Bytes::from(format!("{}\n\n", json)),
            Err(_) => Bytes::from_static(b"{\"type\":\"error\",\"chunk\":null,\"msg\":\"frame encoding failed\"}\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_json_followed_by_a_blank_line() {
        let wire = DesignFrame::streaming("二次函数".to_string()).encode();
        assert_eq!(
            wire,
            Bytes::from("{\"type\":\"streaming\",\"chunk\":\"二次函数\",\"msg\":null}\n\n")
        );
        let finish = String::from_utf8(DesignFrame::finish("done").encode().to_vec()).unwrap();
        assert!(finish.starts_with("{\"type\":\"finish\",\"chunk\":\"\""));
    }
}
