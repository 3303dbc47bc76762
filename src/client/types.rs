//! Authentication and error payloads of the REST API.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login body (`POST auth`).
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session token for the odds stream.
    pub token: Uuid,
}

/// Structured error body returned with any non-200 response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Venue error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any other members.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ErrorResponse {
    /// Wrap a body that was not valid JSON.
    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(body.into()),
            details: serde_json::Map::new(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(msg)) => write!(f, "{}: {}", code, msg),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(msg)) => write!(f, "{}", msg),
            (None, None) if self.details.is_empty() => write!(f, "no error details"),
            (None, None) => write!(f, "{}", serde_json::Value::Object(self.details.clone())),
        }
    }
}
