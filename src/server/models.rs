//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The natural-language question or instruction.
    pub query: String,
}

/// Successful answer to `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The natural-language answer.
    pub result: String,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure detail.
    pub detail: String,
}

impl ErrorResponse {
    #[inline]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
