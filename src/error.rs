//! Error types for the financial analysis agent

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Startup
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // Tool + Provider Errors
    // =============================

    #[error("Market data error: {0}")]
    MarketDataError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Reasoning Loop Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Max iterations exceeded: {0}")]
    MaxIterationsExceeded(usize),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Any failure that reaches the gateway is reported as an opaque 500.
impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": "Internal Server Error" })),
        )
            .into_response()
    }
}
